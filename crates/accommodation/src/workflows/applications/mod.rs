//! Applications and the entities that hang off them: assessments, placement applications,
//! placement requests, and their bookings.

pub mod cascade;
pub mod domain;
pub mod router;
pub mod service;

pub use cascade::{CascadeError, SkipReason, SkippedEntity, WithdrawalOutcome};
pub use domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationTree, Assessment, AssessmentId,
    EntityRef, NewApplication, NewPlacementApplication, PlacementApplication,
    PlacementApplicationDecisionRequest, PlacementApplicationId, PlacementDates, PlacementRequest,
    PlacementRequestId, WithdrawableRef, WithdrawalReason, WithdrawalRequest,
};
pub use router::application_router;
pub use service::{ApplicationService, ApplicationServiceError, PlacementBooking, Withdrawable};
