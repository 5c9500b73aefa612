use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;

use crate::error::ApiProblem;
use crate::workflows::bookings::BookingId;
use crate::workflows::repository::{ApplicationRepository, BookingRepository, EstateRepository};

use super::cascade::CascadeError;
use super::domain::{
    ApplicationId, AssessmentId, NewApplication, NewPlacementApplication,
    PlacementApplicationDecisionRequest, PlacementApplicationId, PlacementDates,
    PlacementRequestId, WithdrawableRef, WithdrawalRequest,
};
use super::service::{ApplicationService, ApplicationServiceError, PlacementBooking};

/// Router exposing applications, assessments, placements, and withdrawal.
pub fn application_router<R>(service: Arc<ApplicationService<R>>) -> Router
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    Router::new()
        .route("/api/v1/applications", post(create_handler::<R>))
        .route(
            "/api/v1/applications/:application_id",
            get(show_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id/submission",
            post(submit_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id/withdrawables",
            get(withdrawables_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id/withdrawal",
            post(withdraw_application_handler::<R>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/acceptance",
            post(accept_assessment_handler::<R>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/rejection",
            post(reject_assessment_handler::<R>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/reallocation",
            post(reallocate_assessment_handler::<R>),
        )
        .route(
            "/api/v1/placement-applications",
            post(create_placement_application_handler::<R>),
        )
        .route(
            "/api/v1/placement-applications/:placement_application_id/decision",
            post(decide_placement_application_handler::<R>),
        )
        .route(
            "/api/v1/placement-applications/:placement_application_id/withdrawal",
            post(withdraw_placement_application_handler::<R>),
        )
        .route(
            "/api/v1/placement-requests/:placement_request_id/booking",
            post(book_placement_request_handler::<R>),
        )
        .route(
            "/api/v1/placement-requests/:placement_request_id/withdrawal",
            post(withdraw_placement_request_handler::<R>),
        )
        .route(
            "/api/v1/bookings/:booking_id/withdrawal",
            post(withdraw_booking_handler::<R>),
        )
        .with_state(service)
}

impl From<ApplicationServiceError> for ApiProblem {
    fn from(error: ApplicationServiceError) -> Self {
        match error {
            ApplicationServiceError::Validation(errors) => ApiProblem::validation(errors),
            ApplicationServiceError::NotFound(_) => ApiProblem::not_found(error.to_string()),
            ApplicationServiceError::AlreadySubmitted(_)
            | ApplicationServiceError::InvalidState(_) => ApiProblem::bad_request(error.to_string()),
            ApplicationServiceError::Cascade(CascadeError::ArrivalRecorded(_)) => {
                ApiProblem::bad_request(error.to_string())
            }
            ApplicationServiceError::Cascade(CascadeError::NotInTree(_)) => {
                ApiProblem::not_found(error.to_string())
            }
            ApplicationServiceError::Booking(err) => err.into(),
            ApplicationServiceError::Repository(err) => err.into(),
        }
    }
}

fn today() -> chrono::NaiveDate {
    Local::now().date_naive()
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<ApplicationService<R>>>,
    Json(request): Json<NewApplication>,
) -> Result<Response, ApiProblem>
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    let application = service.create_application(request, today())?;
    Ok((StatusCode::CREATED, Json(application)).into_response())
}

pub(crate) async fn show_handler<R>(
    State(service): State<Arc<ApplicationService<R>>>,
    Path(application_id): Path<String>,
) -> Result<Response, ApiProblem>
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    let tree = service.tree(&ApplicationId(application_id))?;
    Ok(Json(tree).into_response())
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<ApplicationService<R>>>,
    Path(application_id): Path<String>,
) -> Result<Response, ApiProblem>
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    let tree = service.submit(&ApplicationId(application_id), today())?;
    Ok(Json(tree).into_response())
}

pub(crate) async fn withdrawables_handler<R>(
    State(service): State<Arc<ApplicationService<R>>>,
    Path(application_id): Path<String>,
) -> Result<Response, ApiProblem>
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    let withdrawables = service.withdrawables(&ApplicationId(application_id))?;
    Ok(Json(withdrawables).into_response())
}

fn withdraw<R>(
    service: &ApplicationService<R>,
    target: WithdrawableRef,
    request: WithdrawalRequest,
) -> Result<Response, ApiProblem>
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    let outcome = service.withdraw(target, request, today())?;
    Ok(Json(outcome).into_response())
}

pub(crate) async fn withdraw_application_handler<R>(
    State(service): State<Arc<ApplicationService<R>>>,
    Path(application_id): Path<String>,
    Json(request): Json<WithdrawalRequest>,
) -> Result<Response, ApiProblem>
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    let target = WithdrawableRef::Application(ApplicationId(application_id));
    withdraw(&service, target, request)
}

pub(crate) async fn accept_assessment_handler<R>(
    State(service): State<Arc<ApplicationService<R>>>,
    Path(assessment_id): Path<String>,
    Json(dates): Json<PlacementDates>,
) -> Result<Response, ApiProblem>
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    let tree = service.accept_assessment(&AssessmentId(assessment_id), dates, today())?;
    Ok(Json(tree).into_response())
}

pub(crate) async fn reject_assessment_handler<R>(
    State(service): State<Arc<ApplicationService<R>>>,
    Path(assessment_id): Path<String>,
) -> Result<Response, ApiProblem>
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    let tree = service.reject_assessment(&AssessmentId(assessment_id))?;
    Ok(Json(tree).into_response())
}

pub(crate) async fn reallocate_assessment_handler<R>(
    State(service): State<Arc<ApplicationService<R>>>,
    Path(assessment_id): Path<String>,
) -> Result<Response, ApiProblem>
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    let tree = service.reallocate_assessment(&AssessmentId(assessment_id), today())?;
    Ok(Json(tree).into_response())
}

pub(crate) async fn create_placement_application_handler<R>(
    State(service): State<Arc<ApplicationService<R>>>,
    Json(request): Json<NewPlacementApplication>,
) -> Result<Response, ApiProblem>
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    let placement = service.create_placement_application(request, today())?;
    Ok((StatusCode::CREATED, Json(placement)).into_response())
}

pub(crate) async fn decide_placement_application_handler<R>(
    State(service): State<Arc<ApplicationService<R>>>,
    Path(placement_application_id): Path<String>,
    Json(decision): Json<PlacementApplicationDecisionRequest>,
) -> Result<Response, ApiProblem>
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    let tree = service.decide_placement_application(
        &PlacementApplicationId(placement_application_id),
        decision,
        today(),
    )?;
    Ok(Json(tree).into_response())
}

pub(crate) async fn withdraw_placement_application_handler<R>(
    State(service): State<Arc<ApplicationService<R>>>,
    Path(placement_application_id): Path<String>,
    Json(request): Json<WithdrawalRequest>,
) -> Result<Response, ApiProblem>
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    let target =
        WithdrawableRef::PlacementApplication(PlacementApplicationId(placement_application_id));
    withdraw(&service, target, request)
}

pub(crate) async fn book_placement_request_handler<R>(
    State(service): State<Arc<ApplicationService<R>>>,
    Path(placement_request_id): Path<String>,
    Json(request): Json<PlacementBooking>,
) -> Result<Response, ApiProblem>
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    let booking = service.book_placement_request(
        &PlacementRequestId(placement_request_id),
        request,
        today(),
    )?;
    Ok((StatusCode::CREATED, Json(booking.view())).into_response())
}

pub(crate) async fn withdraw_placement_request_handler<R>(
    State(service): State<Arc<ApplicationService<R>>>,
    Path(placement_request_id): Path<String>,
    Json(request): Json<WithdrawalRequest>,
) -> Result<Response, ApiProblem>
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    let target = WithdrawableRef::PlacementRequest(PlacementRequestId(placement_request_id));
    withdraw(&service, target, request)
}

pub(crate) async fn withdraw_booking_handler<R>(
    State(service): State<Arc<ApplicationService<R>>>,
    Path(booking_id): Path<String>,
    Json(request): Json<WithdrawalRequest>,
) -> Result<Response, ApiProblem>
where
    R: ApplicationRepository + EstateRepository + BookingRepository + 'static,
{
    let target = WithdrawableRef::Booking(BookingId(booking_id));
    withdraw(&service, target, request)
}
