use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::SearchConfig;
use crate::error::ValidationErrors;
use crate::workflows::bookings::{Booking, BookingError, BookingLinks, BookingService, NewBooking};
use crate::workflows::estate::{BedId, DateRange, PremisesId};
use crate::workflows::repository::{
    ApplicationRepository, BookingRepository, EstateRepository, RepositoryError,
};

use super::cascade::{self, CascadeError, WithdrawalOutcome};
use super::domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationTree, Assessment,
    AssessmentDecision, AssessmentId, EntityRef, NewApplication, NewPlacementApplication,
    PlacementApplication, PlacementApplicationDecision, PlacementApplicationDecisionRequest,
    PlacementApplicationId, PlacementDates, PlacementRequest, PlacementRequestId,
    WithdrawableRef, WithdrawalRequest,
};

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static ASSESSMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static PLACEMENT_APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static PLACEMENT_REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_id(sequence: &AtomicU64, prefix: &str) -> String {
    let id = sequence.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}

/// Bed chosen for a placement request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementBooking {
    pub premises_id: PremisesId,
    pub bed_id: BedId,
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
}

/// A node the caller may still withdraw, with the dates it covers where it has any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawable {
    #[serde(flatten)]
    pub entity: WithdrawableRef,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Application lifecycle: submission, assessment, placement, and withdrawal.
pub struct ApplicationService<R> {
    repository: Arc<R>,
    bookings: BookingService<R>,
}

impl<R> ApplicationService<R>
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: SearchConfig) -> Self {
        let bookings = BookingService::new(Arc::clone(&repository), config);
        Self {
            repository,
            bookings,
        }
    }

    pub fn create_application(
        &self,
        request: NewApplication,
        today: NaiveDate,
    ) -> Result<Application, ApplicationServiceError> {
        let crn = request.crn.trim();
        if crn.is_empty() {
            let mut errors = ValidationErrors::new();
            errors.add("$.crn", "empty");
            return Err(errors.into());
        }

        let application = Application {
            id: ApplicationId(next_id(&APPLICATION_SEQUENCE, "application")),
            crn: crn.to_string(),
            status: ApplicationStatus::InProgress,
            created_on: today,
            submitted_on: None,
            withdrawal: None,
        };
        let stored = self.repository.insert_application(application)?;
        info!(application_id = %stored.id, "application created");
        Ok(stored)
    }

    pub fn tree(&self, id: &ApplicationId) -> Result<ApplicationTree, ApplicationServiceError> {
        self.repository
            .application_tree(id)?
            .ok_or_else(|| ApplicationServiceError::NotFound(EntityRef::Application(id.clone())))
    }

    /// Submit an in-progress application and allocate its first assessment. Only one of several
    /// concurrent submissions succeeds.
    pub fn submit(
        &self,
        id: &ApplicationId,
        today: NaiveDate,
    ) -> Result<ApplicationTree, ApplicationServiceError> {
        match self.repository.mark_submitted(id, today) {
            Ok(_) => {}
            Err(RepositoryError::NotFound) => {
                return Err(ApplicationServiceError::NotFound(EntityRef::Application(
                    id.clone(),
                )))
            }
            Err(RepositoryError::Conflict) => {
                warn!(application_id = %id, "duplicate submission rejected");
                return Err(ApplicationServiceError::AlreadySubmitted(id.clone()));
            }
            Err(other) => return Err(other.into()),
        }

        let snapshot = self.tree(id)?;
        let mut tree = snapshot.clone();
        tree.assessments.push(new_assessment(id, today));
        self.save(&snapshot, tree.clone())?;
        info!(
            application_id = %id,
            status = tree.application.status.label(),
            "application submitted"
        );
        Ok(tree)
    }

    /// Accept the pending assessment and raise the initial placement request.
    pub fn accept_assessment(
        &self,
        id: &AssessmentId,
        dates: PlacementDates,
        today: NaiveDate,
    ) -> Result<ApplicationTree, ApplicationServiceError> {
        validate_dates(&dates, "$.durationDays")?;
        let (snapshot, index) = self.pending_assessment(id)?;
        let mut tree = snapshot.clone();
        tree.assessments[index].decision = Some(AssessmentDecision::Accepted);
        tree.placement_requests.push(PlacementRequest {
            id: PlacementRequestId(next_id(&PLACEMENT_REQUEST_SEQUENCE, "placement-request")),
            application_id: tree.application.id.clone(),
            placement_application_id: None,
            expected_arrival: dates.expected_arrival,
            duration_days: dates.duration_days,
            created_on: today,
            withdrawal: None,
        });
        self.save(&snapshot, tree.clone())?;
        info!(assessment_id = %id.0, "assessment accepted");
        Ok(tree)
    }

    pub fn reject_assessment(
        &self,
        id: &AssessmentId,
    ) -> Result<ApplicationTree, ApplicationServiceError> {
        let (snapshot, index) = self.pending_assessment(id)?;
        let mut tree = snapshot.clone();
        tree.assessments[index].decision = Some(AssessmentDecision::Rejected);
        self.save(&snapshot, tree.clone())?;
        info!(assessment_id = %id.0, "assessment rejected");
        Ok(tree)
    }

    /// Hand the assessment to a new assessor. The old one is kept, marked reallocated.
    pub fn reallocate_assessment(
        &self,
        id: &AssessmentId,
        today: NaiveDate,
    ) -> Result<ApplicationTree, ApplicationServiceError> {
        let (snapshot, index) = self.pending_assessment(id)?;
        let mut tree = snapshot.clone();
        tree.assessments[index].reallocated_on = Some(today);
        let replacement = new_assessment(&tree.application.id, today);
        let replacement_id = replacement.id.clone();
        tree.assessments.push(replacement);
        self.save(&snapshot, tree.clone())?;
        info!(assessment_id = %id.0, replacement = %replacement_id.0, "assessment reallocated");
        Ok(tree)
    }

    pub fn create_placement_application(
        &self,
        request: NewPlacementApplication,
        today: NaiveDate,
    ) -> Result<PlacementApplication, ApplicationServiceError> {
        let snapshot = self.tree(&request.application_id)?;
        ensure_live(&snapshot)?;
        if snapshot.accepted_assessment().is_none() {
            return Err(ApplicationServiceError::InvalidState(format!(
                "application {} has no accepted assessment",
                snapshot.application.id
            )));
        }
        let mut tree = snapshot.clone();

        let placement = PlacementApplication {
            id: PlacementApplicationId(next_id(
                &PLACEMENT_APPLICATION_SEQUENCE,
                "placement-application",
            )),
            application_id: tree.application.id.clone(),
            created_on: today,
            decision: None,
            withdrawal: None,
        };
        tree.placement_applications.push(placement.clone());
        self.save(&snapshot, tree)?;
        info!(placement_application_id = %placement.id.0, "placement application created");
        Ok(placement)
    }

    /// Record a decision; acceptance raises a placement request for the requested dates.
    pub fn decide_placement_application(
        &self,
        id: &PlacementApplicationId,
        decision: PlacementApplicationDecisionRequest,
        today: NaiveDate,
    ) -> Result<ApplicationTree, ApplicationServiceError> {
        let entity = EntityRef::PlacementApplication(id.clone());
        let snapshot = self.owning_tree(&entity)?;
        ensure_live(&snapshot)?;
        let mut tree = snapshot.clone();
        let application_id = tree.application.id.clone();
        let placement = tree
            .placement_applications
            .iter_mut()
            .find(|placement| &placement.id == id)
            .ok_or_else(|| ApplicationServiceError::NotFound(entity.clone()))?;
        if placement.is_withdrawn() || placement.decision.is_some() {
            return Err(ApplicationServiceError::InvalidState(format!(
                "placement application {} has already been decided or withdrawn",
                id.0
            )));
        }

        match decision {
            PlacementApplicationDecisionRequest::Accepted { placement_dates } => {
                validate_dates(&placement_dates, "$.placementDates.durationDays")?;
                placement.decision = Some(PlacementApplicationDecision::Accepted);
                tree.placement_requests.push(PlacementRequest {
                    id: PlacementRequestId(next_id(
                        &PLACEMENT_REQUEST_SEQUENCE,
                        "placement-request",
                    )),
                    application_id,
                    placement_application_id: Some(id.clone()),
                    expected_arrival: placement_dates.expected_arrival,
                    duration_days: placement_dates.duration_days,
                    created_on: today,
                    withdrawal: None,
                });
            }
            PlacementApplicationDecisionRequest::Rejected => {
                placement.decision = Some(PlacementApplicationDecision::Rejected);
            }
        }

        self.save(&snapshot, tree.clone())?;
        info!(placement_application_id = %id.0, "placement application decided");
        Ok(tree)
    }

    /// Book a bed against a placement request that has no live booking yet.
    pub fn book_placement_request(
        &self,
        id: &PlacementRequestId,
        request: PlacementBooking,
        today: NaiveDate,
    ) -> Result<Booking, ApplicationServiceError> {
        let entity = EntityRef::PlacementRequest(id.clone());
        let tree = self.owning_tree(&entity)?;
        ensure_live(&tree)?;
        let placement_request = tree
            .placement_requests
            .iter()
            .find(|placement| &placement.id == id)
            .ok_or_else(|| ApplicationServiceError::NotFound(entity.clone()))?;
        if placement_request.is_withdrawn() {
            return Err(ApplicationServiceError::InvalidState(format!(
                "placement request {} has been withdrawn",
                id.0
            )));
        }
        if let Some(existing) = tree.active_booking_for(id) {
            return Err(ApplicationServiceError::InvalidState(format!(
                "placement request {} is already booked as {}",
                id.0, existing.id
            )));
        }

        let booking = self.bookings.create_booking(
            &request.premises_id,
            NewBooking {
                crn: tree.application.crn.clone(),
                bed_id: request.bed_id,
                arrival_date: request.arrival_date,
                departure_date: request.departure_date,
            },
            BookingLinks {
                application_id: Some(tree.application.id.clone()),
                placement_request_id: Some(id.clone()),
            },
            today,
        )?;
        info!(placement_request_id = %id.0, booking_id = %booking.id, "placement request booked");
        Ok(booking)
    }

    /// Everything under the application a caller could still withdraw.
    pub fn withdrawables(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<Withdrawable>, ApplicationServiceError> {
        let tree = self.tree(id)?;
        let mut withdrawables = Vec::new();

        if !tree.application.is_withdrawn() {
            withdrawables.push(Withdrawable {
                entity: WithdrawableRef::Application(tree.application.id.clone()),
                start_date: None,
                end_date: None,
            });
        }
        for placement in tree.placement_applications.iter().filter(|p| !p.is_withdrawn()) {
            withdrawables.push(Withdrawable {
                entity: WithdrawableRef::PlacementApplication(placement.id.clone()),
                start_date: None,
                end_date: None,
            });
        }
        for request in tree.placement_requests.iter().filter(|r| !r.is_withdrawn()) {
            let end = DateRange::from_duration(request.expected_arrival, request.duration_days)
                .map(|range| range.end());
            withdrawables.push(Withdrawable {
                entity: WithdrawableRef::PlacementRequest(request.id.clone()),
                start_date: Some(request.expected_arrival),
                end_date: end,
            });
        }
        for booking in tree
            .bookings
            .iter()
            .filter(|b| !b.is_cancelled() && !b.has_arrival())
        {
            withdrawables.push(Withdrawable {
                entity: WithdrawableRef::Booking(booking.id.clone()),
                start_date: Some(booking.arrival_date),
                end_date: Some(booking.departure_date),
            });
        }

        Ok(withdrawables)
    }

    /// Withdraw a node and cascade to its descendants, committing the whole tree at once.
    pub fn withdraw(
        &self,
        target: WithdrawableRef,
        request: WithdrawalRequest,
        today: NaiveDate,
    ) -> Result<WithdrawalOutcome, ApplicationServiceError> {
        if request.reason.is_cascaded() {
            let mut errors = ValidationErrors::new();
            errors.add("$.reason", "notAllowed");
            return Err(errors.into());
        }

        let entity = EntityRef::from(target.clone());
        let snapshot = self.owning_tree(&entity)?;
        let mut tree = snapshot.clone();
        let outcome = cascade::withdraw(&mut tree, &target, request.reason, today, request.notes)?;
        let application_status = tree.application.status;

        if outcome.changed() {
            self.save(&snapshot, tree)?;
        }

        info!(
            root = %outcome.root,
            withdrawn = outcome.withdrawn.len(),
            skipped = outcome.skipped.len(),
            application_status = application_status.label(),
            "withdrawal applied"
        );
        Ok(outcome)
    }

    /// Commits `updated` unless another writer touched the tree since `snapshot` was read.
    fn save(
        &self,
        snapshot: &ApplicationTree,
        updated: ApplicationTree,
    ) -> Result<(), ApplicationServiceError> {
        match self.repository.save_tree(snapshot, updated) {
            Ok(()) => Ok(()),
            Err(RepositoryError::Stale) => {
                let application_id = &snapshot.application.id;
                warn!(%application_id, "application changed by a concurrent writer");
                Err(ApplicationServiceError::InvalidState(format!(
                    "application {application_id} changed while being updated; reload and try again"
                )))
            }
            Err(other) => Err(other.into()),
        }
    }

    fn owning_tree(&self, entity: &EntityRef) -> Result<ApplicationTree, ApplicationServiceError> {
        let application_id = self
            .repository
            .owning_application(entity)?
            .ok_or_else(|| ApplicationServiceError::NotFound(entity.clone()))?;
        self.tree(&application_id)
    }

    fn pending_assessment(
        &self,
        id: &AssessmentId,
    ) -> Result<(ApplicationTree, usize), ApplicationServiceError> {
        let entity = EntityRef::Assessment(id.clone());
        let tree = self.owning_tree(&entity)?;
        ensure_live(&tree)?;
        let index = tree
            .assessments
            .iter()
            .position(|assessment| &assessment.id == id)
            .ok_or_else(|| ApplicationServiceError::NotFound(entity))?;
        if !tree.assessments[index].is_pending() {
            return Err(ApplicationServiceError::InvalidState(format!(
                "assessment {} is no longer pending",
                id.0
            )));
        }
        Ok((tree, index))
    }
}

fn new_assessment(application_id: &ApplicationId, today: NaiveDate) -> Assessment {
    Assessment {
        id: AssessmentId(next_id(&ASSESSMENT_SEQUENCE, "assessment")),
        application_id: application_id.clone(),
        allocated_on: today,
        decision: None,
        reallocated_on: None,
        withdrawn: false,
    }
}

fn ensure_live(tree: &ApplicationTree) -> Result<(), ApplicationServiceError> {
    if tree.application.is_withdrawn() {
        return Err(ApplicationServiceError::InvalidState(format!(
            "application {} has been withdrawn",
            tree.application.id
        )));
    }
    Ok(())
}

fn validate_dates(dates: &PlacementDates, duration_path: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if dates.duration_days == 0 {
        errors.add(duration_path, "mustBePositive");
    }
    errors.into_result()
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("no {0} could be found")]
    NotFound(EntityRef),
    #[error("application {0} has already been submitted or withdrawn")]
    AlreadySubmitted(ApplicationId),
    #[error("{0}")]
    InvalidState(String),
    #[error(transparent)]
    Cascade(#[from] CascadeError),
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
