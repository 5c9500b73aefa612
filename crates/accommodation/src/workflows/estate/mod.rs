//! Premises, rooms, and beds, plus the date and distance arithmetic searches rely on.

pub mod calendar;
pub mod distance;
pub mod domain;
pub mod import;
pub mod router;
pub mod service;

pub use calendar::{DateRange, InvalidDateRange};
pub use distance::haversine_miles;
pub use domain::{
    normalize_outcode, Bed, BedId, Coordinates, PostcodeDistrict, Premises, PremisesId,
    PremisesInventory, PremisesStatus, PremisesSummary, Room, RoomId, RoomInventory, ServiceName,
};
pub use import::{EstateImporter, ImportError, PostcodeDistrictImporter};
pub use router::premises_router;
pub use service::EstateService;
