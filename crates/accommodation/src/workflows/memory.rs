//! In-process store backing the service binary and the test suites.
//!
//! All state sits behind one mutex, so every trait method observes and writes a consistent
//! snapshot. Conflict checks and the compare-and-set on updates run under that same lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;

use super::applications::domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationTree, Assessment, AssessmentId,
    EntityRef, PlacementApplication, PlacementApplicationId, PlacementRequest,
    PlacementRequestId,
};
use super::bookings::{Booking, BookingId, OutOfServiceId, OutOfServicePeriod};
use super::estate::{
    normalize_outcode, BedId, DateRange, PostcodeDistrict, PremisesId, PremisesInventory,
    ServiceName,
};
use super::repository::{
    ApplicationRepository, BookingRepository, EstateRepository, RepositoryError,
};

#[derive(Debug, Default)]
struct StoreState {
    premises: BTreeMap<PremisesId, PremisesInventory>,
    districts: HashMap<String, PostcodeDistrict>,
    bookings: BTreeMap<BookingId, Booking>,
    out_of_service: BTreeMap<OutOfServiceId, OutOfServicePeriod>,
    applications: BTreeMap<ApplicationId, Application>,
    assessments: BTreeMap<AssessmentId, Assessment>,
    placement_applications: BTreeMap<PlacementApplicationId, PlacementApplication>,
    placement_requests: BTreeMap<PlacementRequestId, PlacementRequest>,
}

impl StoreState {
    fn booking_clash(&self, bed_id: &BedId, range: &DateRange, except: Option<&BookingId>) -> bool {
        self.bookings.values().any(|booking| {
            &booking.bed_id == bed_id
                && booking.blocks_bed()
                && Some(&booking.id) != except
                && booking.range().overlaps(range)
        })
    }

    fn out_of_service_clash(
        &self,
        bed_id: &BedId,
        range: &DateRange,
        except: Option<&OutOfServiceId>,
    ) -> bool {
        self.out_of_service.values().any(|period| {
            &period.bed_id == bed_id
                && !period.is_cancelled()
                && Some(&period.id) != except
                && period.range().overlaps(range)
        })
    }

    /// A placement request takes at most one live booking and none once withdrawn.
    fn placement_request_closed(&self, id: &PlacementRequestId) -> bool {
        self.placement_requests
            .get(id)
            .is_some_and(PlacementRequest::is_withdrawn)
            || self.bookings.values().any(|booking| {
                booking.placement_request_id.as_ref() == Some(id) && !booking.is_cancelled()
            })
    }

    fn tree(&self, id: &ApplicationId) -> Option<ApplicationTree> {
        let application = self.applications.get(id)?.clone();
        let mut tree = ApplicationTree::new(application);

        tree.assessments = self
            .assessments
            .values()
            .filter(|assessment| &assessment.application_id == id)
            .cloned()
            .collect();
        tree.placement_applications = self
            .placement_applications
            .values()
            .filter(|placement| &placement.application_id == id)
            .cloned()
            .collect();
        tree.placement_requests = self
            .placement_requests
            .values()
            .filter(|request| &request.application_id == id)
            .cloned()
            .collect();
        tree.bookings = self
            .bookings
            .values()
            .filter(|booking| {
                booking.application_id.as_ref() == Some(id)
                    || booking.placement_request_id.as_ref().is_some_and(|request| {
                        tree.placement_requests.iter().any(|r| &r.id == request)
                    })
            })
            .cloned()
            .collect();

        Some(tree)
    }
}

/// Thread-safe in-memory implementation of every repository trait.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }
}

impl EstateRepository for InMemoryStore {
    fn inventory(&self, service: ServiceName) -> Result<Vec<PremisesInventory>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .premises
            .values()
            .filter(|inventory| inventory.premises.service == service)
            .cloned()
            .collect())
    }

    fn premises(&self, id: &PremisesId) -> Result<Option<PremisesInventory>, RepositoryError> {
        Ok(self.state()?.premises.get(id).cloned())
    }

    fn postcode_district(
        &self,
        outcode: &str,
    ) -> Result<Option<PostcodeDistrict>, RepositoryError> {
        let key = normalize_outcode(outcode);
        Ok(self.state()?.districts.get(&key).cloned())
    }

    fn upsert_premises(&self, inventory: PremisesInventory) -> Result<(), RepositoryError> {
        self.state()?
            .premises
            .insert(inventory.premises.id.clone(), inventory);
        Ok(())
    }

    fn upsert_postcode_district(&self, district: PostcodeDistrict) -> Result<(), RepositoryError> {
        self.state()?
            .districts
            .insert(normalize_outcode(&district.outcode), district);
        Ok(())
    }
}

impl BookingRepository for InMemoryStore {
    fn insert_booking(&self, booking: Booking) -> Result<Booking, RepositoryError> {
        let mut state = self.state()?;
        if state.bookings.contains_key(&booking.id) {
            return Err(RepositoryError::Conflict);
        }
        if let Some(request) = &booking.placement_request_id {
            if state.placement_request_closed(request) {
                return Err(RepositoryError::Stale);
            }
        }
        let range = booking.range();
        if state.booking_clash(&booking.bed_id, &range, None)
            || state.out_of_service_clash(&booking.bed_id, &range, None)
        {
            return Err(RepositoryError::Conflict);
        }
        state.bookings.insert(booking.id.clone(), booking.clone());
        Ok(booking)
    }

    /// Re-checks overlaps when the dates move, since an arrival may extend a stay.
    fn update_booking(&self, current: &Booking, updated: Booking) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let Some(existing) = state.bookings.get(&current.id) else {
            return Err(RepositoryError::NotFound);
        };
        if existing != current || updated.id != current.id {
            return Err(RepositoryError::Stale);
        }
        let range = updated.range();
        if updated.blocks_bed()
            && existing.range() != range
            && (state.booking_clash(&updated.bed_id, &range, Some(&updated.id))
                || state.out_of_service_clash(&updated.bed_id, &range, None))
        {
            return Err(RepositoryError::Conflict);
        }
        state.bookings.insert(updated.id.clone(), updated);
        Ok(())
    }

    fn fetch_booking(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        Ok(self.state()?.bookings.get(id).cloned())
    }

    fn bookings_for_premises(&self, premises: &PremisesId) -> Result<Vec<Booking>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .bookings
            .values()
            .filter(|booking| &booking.premises_id == premises)
            .cloned()
            .collect())
    }

    fn bookings_overlapping(&self, range: DateRange) -> Result<Vec<Booking>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .bookings
            .values()
            .filter(|booking| booking.range().overlaps(&range))
            .cloned()
            .collect())
    }

    fn insert_out_of_service(
        &self,
        period: OutOfServicePeriod,
    ) -> Result<OutOfServicePeriod, RepositoryError> {
        let mut state = self.state()?;
        if state.out_of_service.contains_key(&period.id) {
            return Err(RepositoryError::Conflict);
        }
        let range = period.range();
        if state.booking_clash(&period.bed_id, &range, None)
            || state.out_of_service_clash(&period.bed_id, &range, None)
        {
            return Err(RepositoryError::Conflict);
        }
        state.out_of_service.insert(period.id.clone(), period.clone());
        Ok(period)
    }

    fn update_out_of_service(&self, period: OutOfServicePeriod) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if !state.out_of_service.contains_key(&period.id) {
            return Err(RepositoryError::NotFound);
        }
        state.out_of_service.insert(period.id.clone(), period);
        Ok(())
    }

    fn fetch_out_of_service(
        &self,
        id: &OutOfServiceId,
    ) -> Result<Option<OutOfServicePeriod>, RepositoryError> {
        Ok(self.state()?.out_of_service.get(id).cloned())
    }

    fn out_of_service_overlapping(
        &self,
        range: DateRange,
    ) -> Result<Vec<OutOfServicePeriod>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .out_of_service
            .values()
            .filter(|period| period.range().overlaps(&range))
            .cloned()
            .collect())
    }
}

impl ApplicationRepository for InMemoryStore {
    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut state = self.state()?;
        if state.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        state
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn mark_submitted(
        &self,
        id: &ApplicationId,
        submitted_on: NaiveDate,
    ) -> Result<Application, RepositoryError> {
        let mut state = self.state()?;
        let application = state
            .applications
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        if application.status != ApplicationStatus::InProgress {
            return Err(RepositoryError::Conflict);
        }
        application.status = ApplicationStatus::Submitted;
        application.submitted_on = Some(submitted_on);
        Ok(application.clone())
    }

    fn application_tree(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationTree>, RepositoryError> {
        Ok(self.state()?.tree(id))
    }

    fn save_tree(
        &self,
        snapshot: &ApplicationTree,
        updated: ApplicationTree,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let Some(stored) = state.tree(&snapshot.application.id) else {
            return Err(RepositoryError::NotFound);
        };
        if &stored != snapshot || updated.application.id != snapshot.application.id {
            return Err(RepositoryError::Stale);
        }

        let ApplicationTree {
            application,
            assessments,
            placement_applications,
            placement_requests,
            bookings,
        } = updated;
        state.applications.insert(application.id.clone(), application);
        for assessment in assessments {
            state.assessments.insert(assessment.id.clone(), assessment);
        }
        for placement in placement_applications {
            state
                .placement_applications
                .insert(placement.id.clone(), placement);
        }
        for request in placement_requests {
            state.placement_requests.insert(request.id.clone(), request);
        }
        for booking in bookings {
            state.bookings.insert(booking.id.clone(), booking);
        }
        Ok(())
    }

    fn owning_application(
        &self,
        entity: &EntityRef,
    ) -> Result<Option<ApplicationId>, RepositoryError> {
        let state = self.state()?;
        let owner = match entity {
            EntityRef::Application(id) => state.applications.get(id).map(|a| a.id.clone()),
            EntityRef::Assessment(id) => {
                state.assessments.get(id).map(|a| a.application_id.clone())
            }
            EntityRef::PlacementApplication(id) => state
                .placement_applications
                .get(id)
                .map(|p| p.application_id.clone()),
            EntityRef::PlacementRequest(id) => state
                .placement_requests
                .get(id)
                .map(|p| p.application_id.clone()),
            EntityRef::Booking(id) => state.bookings.get(id).and_then(|booking| {
                booking.application_id.clone().or_else(|| {
                    booking
                        .placement_request_id
                        .as_ref()
                        .and_then(|request| state.placement_requests.get(request))
                        .map(|request| request.application_id.clone())
                })
            }),
        };
        Ok(owner)
    }
}
