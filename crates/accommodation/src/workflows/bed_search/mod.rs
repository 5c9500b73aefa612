//! Bed availability search across the Approved Premises and Temporary Accommodation estates.
//!
//! A bed is available when its premises is active, it is still in service on the start date,
//! every required characteristic is present, and no live booking or out-of-service period
//! overlaps the half-open search range.

pub mod domain;
mod filters;
pub mod router;
pub mod service;

pub use domain::{
    ApprovedPremisesBed, ApprovedPremisesSearch, BedMatch, BedSearchRequest, BedSearchResults,
    BookingOverlap, PremisesMatch, RequiredCharacteristics, ResultCounts, RoomMatch,
    TemporaryAccommodationBed, TemporaryAccommodationPremises, TemporaryAccommodationSearch,
};
pub use router::bed_search_router;
pub use service::{BedSearchError, BedSearchService};
