//! Storage abstractions so services can be exercised against any backing store.
//!
//! Every method is a single unit of work: an implementation must apply a write completely or
//! not at all.

use chrono::NaiveDate;

use super::applications::domain::{Application, ApplicationId, ApplicationTree, EntityRef};
use super::bookings::{Booking, BookingId, OutOfServiceId, OutOfServicePeriod};
use super::estate::{DateRange, PostcodeDistrict, PremisesId, PremisesInventory, ServiceName};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record conflicts with existing state")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record changed since it was read")]
    Stale,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Premises, rooms, beds, and postcode district centroids.
pub trait EstateRepository: Send + Sync {
    fn inventory(&self, service: ServiceName) -> Result<Vec<PremisesInventory>, RepositoryError>;
    fn premises(&self, id: &PremisesId) -> Result<Option<PremisesInventory>, RepositoryError>;
    fn postcode_district(&self, outcode: &str)
        -> Result<Option<PostcodeDistrict>, RepositoryError>;
    fn upsert_premises(&self, inventory: PremisesInventory) -> Result<(), RepositoryError>;
    fn upsert_postcode_district(&self, district: PostcodeDistrict) -> Result<(), RepositoryError>;
}

/// Bookings and out-of-service periods.
pub trait BookingRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when a non-cancelled booking or out-of-service
    /// period on the same bed overlaps the new booking, and with [`RepositoryError::Stale`] when
    /// its placement request is already booked or has been withdrawn.
    fn insert_booking(&self, booking: Booking) -> Result<Booking, RepositoryError>;
    /// Replaces `current` with `updated`. Fails with [`RepositoryError::Stale`] when the stored
    /// booking no longer equals `current`.
    fn update_booking(&self, current: &Booking, updated: Booking) -> Result<(), RepositoryError>;
    fn fetch_booking(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError>;
    fn bookings_for_premises(&self, premises: &PremisesId) -> Result<Vec<Booking>, RepositoryError>;
    fn bookings_overlapping(&self, range: DateRange) -> Result<Vec<Booking>, RepositoryError>;
    /// Fails with [`RepositoryError::Conflict`] when a non-cancelled booking on the same bed
    /// overlaps the period.
    fn insert_out_of_service(
        &self,
        period: OutOfServicePeriod,
    ) -> Result<OutOfServicePeriod, RepositoryError>;
    fn update_out_of_service(&self, period: OutOfServicePeriod) -> Result<(), RepositoryError>;
    fn fetch_out_of_service(
        &self,
        id: &OutOfServiceId,
    ) -> Result<Option<OutOfServicePeriod>, RepositoryError>;
    fn out_of_service_overlapping(
        &self,
        range: DateRange,
    ) -> Result<Vec<OutOfServicePeriod>, RepositoryError>;
}

/// Applications and their dependent entities.
pub trait ApplicationRepository: Send + Sync {
    fn insert_application(&self, application: Application)
        -> Result<Application, RepositoryError>;
    /// Moves an in-progress application to submitted. Fails with
    /// [`RepositoryError::Conflict`] if the application has already left `in_progress`.
    fn mark_submitted(
        &self,
        id: &ApplicationId,
        submitted_on: NaiveDate,
    ) -> Result<Application, RepositoryError>;
    fn application_tree(&self, id: &ApplicationId)
        -> Result<Option<ApplicationTree>, RepositoryError>;
    /// Writes every node of `updated`, bookings included, atomically. Fails with
    /// [`RepositoryError::Stale`] unless the stored tree still equals `snapshot`.
    fn save_tree(
        &self,
        snapshot: &ApplicationTree,
        updated: ApplicationTree,
    ) -> Result<(), RepositoryError>;
    fn owning_application(&self, entity: &EntityRef)
        -> Result<Option<ApplicationId>, RepositoryError>;
}
