use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::SearchConfig;
use crate::error::ValidationErrors;
use crate::workflows::estate::{BedId, DateRange, PremisesId, PremisesInventory};
use crate::workflows::repository::{BookingRepository, EstateRepository, RepositoryError};

use super::domain::{
    Arrival, ArrivalRequest, Booking, BookingId, BookingLinks, Cancellation, CancellationRequest,
    NewBooking, NewOutOfServicePeriod, NonArrival, NonArrivalRequest, OutOfServiceId,
    OutOfServicePeriod,
};

static BOOKING_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static OUT_OF_SERVICE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_booking_id() -> BookingId {
    let id = BOOKING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BookingId(format!("booking-{id:06}"))
}

fn next_out_of_service_id() -> OutOfServiceId {
    let id = OUT_OF_SERVICE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    OutOfServiceId(format!("oos-{id:06}"))
}

/// Service owning booking and out-of-service lifecycles for a premises.
pub struct BookingService<R> {
    repository: Arc<R>,
    config: SearchConfig,
}

impl<R> BookingService<R>
where
    R: EstateRepository + BookingRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: SearchConfig) -> Self {
        Self { repository, config }
    }

    pub fn default_page_size(&self) -> u32 {
        self.config.default_page_size
    }

    /// Book a bed, rejecting the request if anything already holds the bed for those dates.
    pub fn create_booking(
        &self,
        premises_id: &PremisesId,
        request: NewBooking,
        links: BookingLinks,
        today: NaiveDate,
    ) -> Result<Booking, BookingError> {
        let mut errors = ValidationErrors::new();
        if request.crn.trim().is_empty() {
            errors.add("$.crn", "empty");
        }
        let range = DateRange::new(request.arrival_date, request.departure_date);
        if range.is_err() {
            errors.add("$.departureDate", "beforeBookingArrivalDate");
        }

        let inventory = self.inventory(premises_id)?;
        if !inventory.premises.is_active() {
            return Err(BookingError::InvalidState(format!(
                "premises {premises_id} is archived and cannot take bookings"
            )));
        }
        match inventory.locate_bed(&request.bed_id) {
            None => errors.add("$.bedId", "doesNotExist"),
            Some((_, bed)) if !bed.in_service_on(request.arrival_date) => {
                errors.add("$.arrivalDate", "afterBedEndDate")
            }
            Some(_) => {}
        }
        errors.into_result()?;
        let range = range.map_err(|_| {
            let mut errors = ValidationErrors::new();
            errors.add("$.departureDate", "beforeBookingArrivalDate");
            BookingError::Validation(errors)
        })?;

        self.ensure_bed_free(&request.bed_id, range)?;

        let booking = Booking {
            id: next_booking_id(),
            crn: request.crn.trim().to_string(),
            premises_id: premises_id.clone(),
            bed_id: request.bed_id,
            arrival_date: range.start(),
            departure_date: range.end(),
            application_id: links.application_id,
            placement_request_id: links.placement_request_id,
            created_on: today,
            arrival: None,
            non_arrival: None,
            cancellation: None,
        };

        let bed_id = booking.bed_id.clone();
        let stored = self
            .repository
            .insert_booking(booking)
            .map_err(|err| raced_for_bed(err, bed_id))?;

        info!(
            booking_id = %stored.id,
            %premises_id,
            bed_id = %stored.bed_id,
            arrival = %stored.arrival_date,
            departure = %stored.departure_date,
            "booking created"
        );
        Ok(stored)
    }

    /// Bookings for a premises ordered by arrival date.
    pub fn bookings_for_premises(
        &self,
        premises_id: &PremisesId,
    ) -> Result<Vec<Booking>, BookingError> {
        self.inventory(premises_id)?;
        let mut bookings = self.repository.bookings_for_premises(premises_id)?;
        bookings.sort_by(|a, b| {
            a.arrival_date
                .cmp(&b.arrival_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(bookings)
    }

    pub fn booking(
        &self,
        premises_id: &PremisesId,
        booking_id: &BookingId,
    ) -> Result<Booking, BookingError> {
        self.repository
            .fetch_booking(booking_id)?
            .filter(|booking| &booking.premises_id == premises_id)
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.clone()))
    }

    pub fn record_arrival(
        &self,
        premises_id: &PremisesId,
        booking_id: &BookingId,
        request: ArrivalRequest,
    ) -> Result<Booking, BookingError> {
        let current = self.booking(premises_id, booking_id)?;
        ensure_awaiting_arrival(&current)?;
        if request.expected_departure_date <= request.arrival_date {
            let mut errors = ValidationErrors::new();
            errors.add("$.expectedDepartureDate", "beforeBookingArrivalDate");
            return Err(errors.into());
        }

        let mut booking = current.clone();
        booking.arrival_date = request.arrival_date;
        booking.departure_date = request.expected_departure_date;
        booking.arrival = Some(Arrival {
            arrival_date: request.arrival_date,
            expected_departure_date: request.expected_departure_date,
            notes: request.notes,
        });
        let booking = self.replace_booking(&current, booking)?;

        info!(
            %booking_id,
            arrival = %request.arrival_date,
            status = booking.status().label(),
            "arrival recorded"
        );
        Ok(booking)
    }

    pub fn record_non_arrival(
        &self,
        premises_id: &PremisesId,
        booking_id: &BookingId,
        request: NonArrivalRequest,
    ) -> Result<Booking, BookingError> {
        let current = self.booking(premises_id, booking_id)?;
        ensure_awaiting_arrival(&current)?;
        if request.reason.trim().is_empty() {
            let mut errors = ValidationErrors::new();
            errors.add("$.reason", "empty");
            return Err(errors.into());
        }

        let mut booking = current.clone();
        booking.non_arrival = Some(NonArrival {
            date: request.date,
            reason: request.reason,
            notes: request.notes,
        });
        let booking = self.replace_booking(&current, booking)?;

        info!(%booking_id, status = booking.status().label(), "non-arrival recorded");
        Ok(booking)
    }

    /// Cancel a booking. Cancelling twice returns the original cancellation unchanged.
    /// Reasons reserved for withdrawal cascades are rejected.
    pub fn cancel_booking(
        &self,
        premises_id: &PremisesId,
        booking_id: &BookingId,
        request: CancellationRequest,
    ) -> Result<Booking, BookingError> {
        if request.reason.is_cascaded() {
            let mut errors = ValidationErrors::new();
            errors.add("$.reason", "notAllowed");
            return Err(errors.into());
        }

        let current = self.booking(premises_id, booking_id)?;
        if current.has_arrival() {
            return Err(BookingError::InvalidState(format!(
                "booking {booking_id} has an arrival recorded and cannot be cancelled"
            )));
        }
        if current.is_cancelled() {
            return Ok(current);
        }

        let mut booking = current.clone();
        booking.cancellation = Some(Cancellation {
            date: request.date,
            reason: request.reason,
            notes: request.notes,
        });
        let booking = self.replace_booking(&current, booking)?;

        info!(
            %booking_id,
            reason = ?request.reason,
            status = booking.status().label(),
            "booking cancelled"
        );
        Ok(booking)
    }

    pub fn create_out_of_service(
        &self,
        premises_id: &PremisesId,
        request: NewOutOfServicePeriod,
    ) -> Result<OutOfServicePeriod, BookingError> {
        let mut errors = ValidationErrors::new();
        let range = DateRange::new(request.start_date, request.end_date);
        if range.is_err() {
            errors.add("$.endDate", "beforeStartDate");
        }
        if request.reason.trim().is_empty() {
            errors.add("$.reason", "empty");
        }

        let inventory = self.inventory(premises_id)?;
        if inventory.locate_bed(&request.bed_id).is_none() {
            errors.add("$.bedId", "doesNotExist");
        }
        errors.into_result()?;
        let range = range.map_err(|_| {
            let mut errors = ValidationErrors::new();
            errors.add("$.endDate", "beforeStartDate");
            BookingError::Validation(errors)
        })?;

        self.ensure_bed_free(&request.bed_id, range)?;

        let period = OutOfServicePeriod {
            id: next_out_of_service_id(),
            premises_id: premises_id.clone(),
            bed_id: request.bed_id,
            start_date: range.start(),
            end_date: range.end(),
            reason: request.reason,
            notes: request.notes,
            cancelled_on: None,
        };

        let bed_id = period.bed_id.clone();
        let stored = self
            .repository
            .insert_out_of_service(period)
            .map_err(|err| raced_for_bed(err, bed_id))?;

        info!(
            out_of_service_id = %stored.id,
            %premises_id,
            bed_id = %stored.bed_id,
            "bed taken out of service"
        );
        Ok(stored)
    }

    pub fn cancel_out_of_service(
        &self,
        premises_id: &PremisesId,
        id: &OutOfServiceId,
        cancelled_on: NaiveDate,
    ) -> Result<OutOfServicePeriod, BookingError> {
        let mut period = self
            .repository
            .fetch_out_of_service(id)?
            .filter(|period| &period.premises_id == premises_id)
            .ok_or_else(|| BookingError::OutOfServiceNotFound(id.clone()))?;
        if period.is_cancelled() {
            return Ok(period);
        }

        period.cancelled_on = Some(cancelled_on);
        self.repository.update_out_of_service(period.clone())?;

        info!(out_of_service_id = %id, "out-of-service period cancelled");
        Ok(period)
    }

    /// Writes `updated` only if the stored booking still matches what the caller checked.
    fn replace_booking(
        &self,
        current: &Booking,
        updated: Booking,
    ) -> Result<Booking, BookingError> {
        match self.repository.update_booking(current, updated.clone()) {
            Ok(()) => Ok(updated),
            Err(RepositoryError::Stale) => {
                warn!(booking_id = %current.id, "booking changed by a concurrent writer");
                Err(BookingError::InvalidState(format!(
                    "booking {} changed while being updated; reload and try again",
                    current.id
                )))
            }
            Err(err) => Err(raced_for_bed(err, updated.bed_id)),
        }
    }

    fn inventory(&self, premises_id: &PremisesId) -> Result<PremisesInventory, BookingError> {
        self.repository
            .premises(premises_id)?
            .ok_or_else(|| BookingError::PremisesNotFound(premises_id.clone()))
    }

    fn ensure_bed_free(
        &self,
        bed_id: &BedId,
        range: DateRange,
    ) -> Result<(), BookingError> {
        let clash = self
            .repository
            .bookings_overlapping(range)?
            .into_iter()
            .find(|booking| {
                &booking.bed_id == bed_id
                    && booking.blocks_bed()
                    && booking.range().overlaps(&range)
            });
        if let Some(booking) = clash {
            warn!(%bed_id, conflicting = %booking.id, "bed already booked");
            return Err(BookingError::Conflict {
                bed_id: bed_id.clone(),
                description: format!(
                    "booking {} from {} to {}",
                    booking.id, booking.arrival_date, booking.departure_date
                ),
            });
        }

        let lost = self
            .repository
            .out_of_service_overlapping(range)?
            .into_iter()
            .find(|period| {
                &period.bed_id == bed_id && !period.is_cancelled() && period.range().overlaps(&range)
            });
        if let Some(period) = lost {
            warn!(%bed_id, conflicting = %period.id, "bed out of service");
            return Err(BookingError::Conflict {
                bed_id: bed_id.clone(),
                description: format!(
                    "out-of-service period {} from {} to {}",
                    period.id, period.start_date, period.end_date
                ),
            });
        }

        Ok(())
    }
}

fn ensure_awaiting_arrival(booking: &Booking) -> Result<(), BookingError> {
    let booking_id = &booking.id;
    if booking.is_cancelled() {
        return Err(BookingError::InvalidState(format!(
            "booking {booking_id} is cancelled"
        )));
    }
    if booking.has_arrival() {
        return Err(BookingError::InvalidState(format!(
            "an arrival is already recorded for booking {booking_id}"
        )));
    }
    if booking.non_arrival.is_some() {
        return Err(BookingError::InvalidState(format!(
            "a non-arrival is already recorded for booking {booking_id}"
        )));
    }
    Ok(())
}

/// The store re-checks overlaps under its own lock; a conflict there means another writer won.
fn raced_for_bed(err: RepositoryError, bed_id: BedId) -> BookingError {
    match err {
        RepositoryError::Conflict => {
            warn!(%bed_id, "bed claimed by a concurrent writer");
            BookingError::Conflict {
                bed_id,
                description: "a concurrent write for the same dates".to_string(),
            }
        }
        RepositoryError::Stale => BookingError::InvalidState(
            "the placement request has already been booked or withdrawn".to_string(),
        ),
        other => BookingError::Repository(other),
    }
}

/// Error raised by the booking service.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("no premises with an id of {0} could be found")]
    PremisesNotFound(PremisesId),
    #[error("no booking with an id of {0} could be found")]
    BookingNotFound(BookingId),
    #[error("no out-of-service period with an id of {0} could be found")]
    OutOfServiceNotFound(OutOfServiceId),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    InvalidState(String),
    #[error("bed {bed_id} is unavailable: conflicts with {description}")]
    Conflict { bed_id: BedId, description: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
