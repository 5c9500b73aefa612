use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::SearchConfig;
use crate::error::ValidationErrors;
use crate::workflows::bookings::{Booking, OutOfServicePeriod};
use crate::workflows::estate::{
    haversine_miles, DateRange, PremisesId, PremisesInventory, ServiceName,
};
use crate::workflows::repository::{BookingRepository, EstateRepository, RepositoryError};

use super::domain::{
    ApprovedPremisesBed, ApprovedPremisesSearch, BedSearchRequest, BedSearchResults, ResultCounts,
    TemporaryAccommodationBed, TemporaryAccommodationPremises, TemporaryAccommodationSearch,
};
use super::filters::{available_beds, blocked_beds, booking_overlaps, premises_qualifies};

/// Finds beds free for a whole date range in either service's estate.
pub struct BedSearchService<R> {
    repository: Arc<R>,
    config: SearchConfig,
}

impl<R> BedSearchService<R>
where
    R: EstateRepository + BookingRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: SearchConfig) -> Self {
        Self { repository, config }
    }

    pub fn search(&self, request: BedSearchRequest) -> Result<BedSearchResults, BedSearchError> {
        match request {
            BedSearchRequest::ApprovedPremises(search) => self.search_approved_premises(search),
            BedSearchRequest::TemporaryAccommodation(search) => {
                self.search_temporary_accommodation(search)
            }
        }
    }

    /// Beds within range of a postcode district, nearest first.
    pub fn search_approved_premises(
        &self,
        search: ApprovedPremisesSearch,
    ) -> Result<BedSearchResults, BedSearchError> {
        let mut errors = ValidationErrors::new();
        if search.postcode_district.trim().is_empty() {
            errors.add("$.postcodeDistrict", "empty");
        }
        let max_distance = search
            .max_distance_miles
            .unwrap_or(self.config.max_distance_miles);
        if !(max_distance.is_finite() && max_distance > 0.0) {
            errors.add("$.maxDistanceMiles", "mustBePositive");
        }
        let range = search_range(search.start_date, search.duration_days, &mut errors);
        errors.into_result()?;
        let range = range.ok_or_else(duration_error)?;

        let district = self
            .repository
            .postcode_district(&search.postcode_district)?
            .ok_or_else(|| {
                BedSearchError::UnknownPostcodeDistrict(search.postcode_district.trim().to_string())
            })?;

        let estate = self.repository.inventory(ServiceName::ApprovedPremises)?;
        let (bookings, out_of_service) = self.occupancy(&estate, &range)?;
        let blocked = blocked_beds(&range, &bookings, &out_of_service, &HashMap::new());
        let required = &search.required_characteristics;

        let mut results = Vec::new();
        for inventory in &estate {
            let premises = &inventory.premises;
            if !premises_qualifies(premises, required) {
                continue;
            }
            let Some(location) = premises.location else {
                debug!(premises_id = %premises.id, "premises has no coordinates; skipped");
                continue;
            };
            let distance_miles = haversine_miles(district.location, location);
            if distance_miles > max_distance {
                continue;
            }
            for (room, bed) in available_beds(inventory, required, &range, &blocked) {
                results.push(ApprovedPremisesBed {
                    distance_miles,
                    premises: premises.into(),
                    room: room.into(),
                    bed: bed.into(),
                });
            }
        }

        results.sort_by(|a, b| {
            a.distance_miles
                .total_cmp(&b.distance_miles)
                .then_with(|| a.premises.name.cmp(&b.premises.name))
                .then_with(|| a.room.name.cmp(&b.room.name))
                .then_with(|| a.bed.name.cmp(&b.bed.name))
        });

        let counts = ResultCounts {
            results_premises_count: distinct(results.iter().map(|r| r.premises.id.0.as_str())),
            results_room_count: distinct(results.iter().map(|r| r.room.id.0.as_str())),
            results_bed_count: results.len(),
        };
        info!(
            service = ServiceName::ApprovedPremises.label(),
            postcode_district = %district.outcode,
            max_distance,
            beds = counts.results_bed_count,
            "bed search completed"
        );
        Ok(BedSearchResults::ApprovedPremises { counts, results })
    }

    /// Free beds in the requested delivery units, grouped by premises.
    pub fn search_temporary_accommodation(
        &self,
        search: TemporaryAccommodationSearch,
    ) -> Result<BedSearchResults, BedSearchError> {
        let mut errors = ValidationErrors::new();
        let units: Vec<String> = search
            .probation_delivery_units
            .iter()
            .map(|unit| unit.trim().to_lowercase())
            .filter(|unit| !unit.is_empty())
            .collect();
        if units.is_empty() {
            errors.add("$.probationDeliveryUnits", "empty");
        }
        let range = search_range(search.start_date, search.duration_days, &mut errors);
        errors.into_result()?;
        let range = range.ok_or_else(duration_error)?;

        let estate: Vec<PremisesInventory> = self
            .repository
            .inventory(ServiceName::TemporaryAccommodation)?
            .into_iter()
            .filter(|inventory| {
                let unit = inventory.premises.probation_delivery_unit.to_lowercase();
                units.contains(&unit)
            })
            .collect();
        let (bookings, out_of_service) = self.occupancy(&estate, &range)?;
        let turnaround: HashMap<PremisesId, u32> = estate
            .iter()
            .map(|inventory| (inventory.premises.id.clone(), inventory.premises.turnaround_days))
            .collect();
        let blocked = blocked_beds(&range, &bookings, &out_of_service, &turnaround);
        let required = &search.required_characteristics;

        let mut results = Vec::new();
        for inventory in &estate {
            if !premises_qualifies(&inventory.premises, required) {
                continue;
            }
            let mut beds: Vec<TemporaryAccommodationBed> =
                available_beds(inventory, required, &range, &blocked)
                    .into_iter()
                    .map(|(room, bed)| TemporaryAccommodationBed {
                        room: room.into(),
                        bed: bed.into(),
                    })
                    .collect();
            if beds.is_empty() {
                continue;
            }
            beds.sort_by(|a, b| {
                a.room
                    .name
                    .cmp(&b.room.name)
                    .then_with(|| a.bed.name.cmp(&b.bed.name))
            });
            results.push(TemporaryAccommodationPremises {
                premises: (&inventory.premises).into(),
                beds,
                overlaps: booking_overlaps(inventory, &range, &bookings),
            });
        }

        results.sort_by(|a, b| {
            a.premises
                .name
                .cmp(&b.premises.name)
                .then_with(|| a.premises.id.cmp(&b.premises.id))
        });

        let counts = ResultCounts {
            results_premises_count: results.len(),
            results_room_count: distinct(
                results
                    .iter()
                    .flat_map(|group| group.beds.iter().map(|bed| bed.room.id.0.as_str())),
            ),
            results_bed_count: results.iter().map(|group| group.beds.len()).sum(),
        };
        info!(
            service = ServiceName::TemporaryAccommodation.label(),
            units = units.len(),
            premises = counts.results_premises_count,
            beds = counts.results_bed_count,
            "bed search completed"
        );
        Ok(BedSearchResults::TemporaryAccommodation { counts, results })
    }

    /// Bookings and out-of-service periods that could touch `range`, with enough lead-in to
    /// catch turnaround days of bookings departing before it.
    fn occupancy(
        &self,
        estate: &[PremisesInventory],
        range: &DateRange,
    ) -> Result<(Vec<Booking>, Vec<OutOfServicePeriod>), RepositoryError> {
        let lead_in = estate
            .iter()
            .map(|inventory| inventory.premises.turnaround_days)
            .max()
            .unwrap_or(0);
        let bookings = self
            .repository
            .bookings_overlapping(range.starting_earlier_by(lead_in))?;
        let out_of_service = self.repository.out_of_service_overlapping(*range)?;
        Ok((bookings, out_of_service))
    }
}

fn search_range(
    start_date: NaiveDate,
    duration_days: i64,
    errors: &mut ValidationErrors,
) -> Option<DateRange> {
    if duration_days < 1 {
        errors.add("$.durationDays", "mustBePositive");
        return None;
    }
    let range = u32::try_from(duration_days)
        .ok()
        .and_then(|days| DateRange::from_duration(start_date, days));
    if range.is_none() {
        errors.add("$.durationDays", "tooLarge");
    }
    range
}

fn duration_error() -> BedSearchError {
    let mut errors = ValidationErrors::new();
    errors.add("$.durationDays", "mustBePositive");
    BedSearchError::Validation(errors)
}

fn distinct<'a>(ids: impl Iterator<Item = &'a str>) -> usize {
    ids.collect::<BTreeSet<_>>().len()
}

/// Error raised by bed searches.
#[derive(Debug, thiserror::Error)]
pub enum BedSearchError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("no postcode district {0} could be found")]
    UnknownPostcodeDistrict(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
