use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::workflows::bookings::{Booking, BookingId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementApplicationId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementRequestId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why an entity was withdrawn. The `Related*` reasons are only ever assigned by the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalReason {
    ChangeInCircumstances,
    DuplicateApplication,
    DeathOfApplicant,
    AlternativeProvisionIdentified,
    BookedInError,
    NoCapacity,
    Other,
    RelatedApplicationWithdrawn,
    RelatedPlacementApplicationWithdrawn,
    RelatedPlacementRequestWithdrawn,
}

impl WithdrawalReason {
    pub const fn is_cascaded(self) -> bool {
        matches!(
            self,
            WithdrawalReason::RelatedApplicationWithdrawn
                | WithdrawalReason::RelatedPlacementApplicationWithdrawn
                | WithdrawalReason::RelatedPlacementRequestWithdrawn
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub reason: WithdrawalReason,
    pub withdrawn_on: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    InProgress,
    Submitted,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::InProgress => "in_progress",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub crn: String,
    pub status: ApplicationStatus,
    pub created_on: NaiveDate,
    pub submitted_on: Option<NaiveDate>,
    pub withdrawal: Option<Withdrawal>,
}

impl Application {
    pub fn is_withdrawn(&self) -> bool {
        self.status == ApplicationStatus::Withdrawn
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentDecision {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: AssessmentId,
    pub application_id: ApplicationId,
    pub allocated_on: NaiveDate,
    pub decision: Option<AssessmentDecision>,
    pub reallocated_on: Option<NaiveDate>,
    pub withdrawn: bool,
}

impl Assessment {
    /// Still awaiting a decision from the currently allocated assessor.
    pub fn is_pending(&self) -> bool {
        self.decision.is_none() && self.reallocated_on.is_none() && !self.withdrawn
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementApplicationDecision {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementApplication {
    pub id: PlacementApplicationId,
    pub application_id: ApplicationId,
    pub created_on: NaiveDate,
    pub decision: Option<PlacementApplicationDecision>,
    pub withdrawal: Option<Withdrawal>,
}

impl PlacementApplication {
    pub fn is_withdrawn(&self) -> bool {
        self.withdrawal.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRequest {
    pub id: PlacementRequestId,
    pub application_id: ApplicationId,
    /// Absent for the initial request raised when the assessment was accepted.
    pub placement_application_id: Option<PlacementApplicationId>,
    pub expected_arrival: NaiveDate,
    pub duration_days: u32,
    pub created_on: NaiveDate,
    pub withdrawal: Option<Withdrawal>,
}

impl PlacementRequest {
    pub fn is_withdrawn(&self) -> bool {
        self.withdrawal.is_some()
    }
}

/// An application with every dependent entity, loaded and saved as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationTree {
    pub application: Application,
    pub assessments: Vec<Assessment>,
    pub placement_applications: Vec<PlacementApplication>,
    pub placement_requests: Vec<PlacementRequest>,
    pub bookings: Vec<Booking>,
}

impl ApplicationTree {
    pub fn new(application: Application) -> Self {
        Self {
            application,
            assessments: Vec::new(),
            placement_applications: Vec::new(),
            placement_requests: Vec::new(),
            bookings: Vec::new(),
        }
    }

    pub fn accepted_assessment(&self) -> Option<&Assessment> {
        self.assessments
            .iter()
            .find(|assessment| assessment.decision == Some(AssessmentDecision::Accepted))
    }

    pub fn active_booking_for(&self, request: &PlacementRequestId) -> Option<&Booking> {
        self.bookings.iter().find(|booking| {
            booking.placement_request_id.as_ref() == Some(request) && !booking.is_cancelled()
        })
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        match entity {
            EntityRef::Application(id) => &self.application.id == id,
            EntityRef::Assessment(id) => self.assessments.iter().any(|a| &a.id == id),
            EntityRef::PlacementApplication(id) => {
                self.placement_applications.iter().any(|p| &p.id == id)
            }
            EntityRef::PlacementRequest(id) => self.placement_requests.iter().any(|p| &p.id == id),
            EntityRef::Booking(id) => self.bookings.iter().any(|b| &b.id == id),
        }
    }
}

/// Any node of an application tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Application(ApplicationId),
    Assessment(AssessmentId),
    PlacementApplication(PlacementApplicationId),
    PlacementRequest(PlacementRequestId),
    Booking(BookingId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Application(id) => write!(f, "application {}", id.0),
            EntityRef::Assessment(id) => write!(f, "assessment {}", id.0),
            EntityRef::PlacementApplication(id) => write!(f, "placement application {}", id.0),
            EntityRef::PlacementRequest(id) => write!(f, "placement request {}", id.0),
            EntityRef::Booking(id) => write!(f, "booking {}", id.0),
        }
    }
}

/// Nodes a caller may withdraw directly. Assessments are only withdrawn through their application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum WithdrawableRef {
    Application(ApplicationId),
    PlacementApplication(PlacementApplicationId),
    PlacementRequest(PlacementRequestId),
    Booking(BookingId),
}

impl From<WithdrawableRef> for EntityRef {
    fn from(value: WithdrawableRef) -> Self {
        match value {
            WithdrawableRef::Application(id) => EntityRef::Application(id),
            WithdrawableRef::PlacementApplication(id) => EntityRef::PlacementApplication(id),
            WithdrawableRef::PlacementRequest(id) => EntityRef::PlacementRequest(id),
            WithdrawableRef::Booking(id) => EntityRef::Booking(id),
        }
    }
}

/// Caller supplied withdrawal details.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub reason: WithdrawalReason,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Dates for a placement, used when a placement request is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementDates {
    pub expected_arrival: NaiveDate,
    pub duration_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    pub crn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlacementApplication {
    pub application_id: ApplicationId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PlacementApplicationDecisionRequest {
    Accepted {
        #[serde(rename = "placementDates")]
        placement_dates: PlacementDates,
    },
    Rejected,
}
