use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;

use crate::error::ApiProblem;
use crate::pagination::{paginate, PageCriteria};
use crate::workflows::estate::PremisesId;
use crate::workflows::repository::{BookingRepository, EstateRepository};

use super::domain::{
    ArrivalRequest, BookingId, BookingLinks, CancellationRequest, NewBooking,
    NewOutOfServicePeriod, NonArrivalRequest, OutOfServiceId,
};
use super::service::{BookingError, BookingService};

/// Router exposing premises bookings and out-of-service beds.
pub fn booking_router<R>(service: Arc<BookingService<R>>) -> Router
where
    R: EstateRepository + BookingRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/premises/:premises_id/bookings",
            get(list_handler::<R>).post(create_handler::<R>),
        )
        .route(
            "/api/v1/premises/:premises_id/bookings/:booking_id",
            get(show_handler::<R>),
        )
        .route(
            "/api/v1/premises/:premises_id/bookings/:booking_id/arrivals",
            post(arrival_handler::<R>),
        )
        .route(
            "/api/v1/premises/:premises_id/bookings/:booking_id/non-arrivals",
            post(non_arrival_handler::<R>),
        )
        .route(
            "/api/v1/premises/:premises_id/bookings/:booking_id/cancellations",
            post(cancellation_handler::<R>),
        )
        .route(
            "/api/v1/premises/:premises_id/out-of-service-beds",
            post(out_of_service_handler::<R>),
        )
        .route(
            "/api/v1/premises/:premises_id/out-of-service-beds/:out_of_service_id/cancellations",
            post(out_of_service_cancellation_handler::<R>),
        )
        .with_state(service)
}

impl From<BookingError> for ApiProblem {
    fn from(error: BookingError) -> Self {
        match error {
            BookingError::Validation(errors) => ApiProblem::validation(errors),
            BookingError::PremisesNotFound(_)
            | BookingError::BookingNotFound(_)
            | BookingError::OutOfServiceNotFound(_) => ApiProblem::not_found(error.to_string()),
            BookingError::InvalidState(detail) => ApiProblem::bad_request(detail),
            BookingError::Conflict { .. } => ApiProblem::conflict(error.to_string()),
            BookingError::Repository(err) => err.into(),
        }
    }
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<BookingService<R>>>,
    Path(premises_id): Path<String>,
    Query(criteria): Query<PageCriteria>,
) -> Result<Response, ApiProblem>
where
    R: EstateRepository + BookingRepository + 'static,
{
    let bookings = service
        .bookings_for_premises(&PremisesId(premises_id))?
        .iter()
        .map(|booking| booking.view())
        .collect();
    Ok(paginate(bookings, criteria, service.default_page_size()).into_response())
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<BookingService<R>>>,
    Path(premises_id): Path<String>,
    Json(request): Json<NewBooking>,
) -> Result<Response, ApiProblem>
where
    R: EstateRepository + BookingRepository + 'static,
{
    let today = Local::now().date_naive();
    let booking = service.create_booking(
        &PremisesId(premises_id),
        request,
        BookingLinks::default(),
        today,
    )?;
    Ok((StatusCode::CREATED, Json(booking.view())).into_response())
}

pub(crate) async fn show_handler<R>(
    State(service): State<Arc<BookingService<R>>>,
    Path((premises_id, booking_id)): Path<(String, String)>,
) -> Result<Response, ApiProblem>
where
    R: EstateRepository + BookingRepository + 'static,
{
    let booking = service.booking(&PremisesId(premises_id), &BookingId(booking_id))?;
    Ok(Json(booking.view()).into_response())
}

pub(crate) async fn arrival_handler<R>(
    State(service): State<Arc<BookingService<R>>>,
    Path((premises_id, booking_id)): Path<(String, String)>,
    Json(request): Json<ArrivalRequest>,
) -> Result<Response, ApiProblem>
where
    R: EstateRepository + BookingRepository + 'static,
{
    let booking =
        service.record_arrival(&PremisesId(premises_id), &BookingId(booking_id), request)?;
    Ok(Json(booking.view()).into_response())
}

pub(crate) async fn non_arrival_handler<R>(
    State(service): State<Arc<BookingService<R>>>,
    Path((premises_id, booking_id)): Path<(String, String)>,
    Json(request): Json<NonArrivalRequest>,
) -> Result<Response, ApiProblem>
where
    R: EstateRepository + BookingRepository + 'static,
{
    let booking =
        service.record_non_arrival(&PremisesId(premises_id), &BookingId(booking_id), request)?;
    Ok(Json(booking.view()).into_response())
}

pub(crate) async fn cancellation_handler<R>(
    State(service): State<Arc<BookingService<R>>>,
    Path((premises_id, booking_id)): Path<(String, String)>,
    Json(request): Json<CancellationRequest>,
) -> Result<Response, ApiProblem>
where
    R: EstateRepository + BookingRepository + 'static,
{
    let booking =
        service.cancel_booking(&PremisesId(premises_id), &BookingId(booking_id), request)?;
    Ok(Json(booking.view()).into_response())
}

pub(crate) async fn out_of_service_handler<R>(
    State(service): State<Arc<BookingService<R>>>,
    Path(premises_id): Path<String>,
    Json(request): Json<NewOutOfServicePeriod>,
) -> Result<Response, ApiProblem>
where
    R: EstateRepository + BookingRepository + 'static,
{
    let period = service.create_out_of_service(&PremisesId(premises_id), request)?;
    Ok((StatusCode::CREATED, Json(period)).into_response())
}

pub(crate) async fn out_of_service_cancellation_handler<R>(
    State(service): State<Arc<BookingService<R>>>,
    Path((premises_id, out_of_service_id)): Path<(String, String)>,
) -> Result<Response, ApiProblem>
where
    R: EstateRepository + BookingRepository + 'static,
{
    let today = Local::now().date_naive();
    let period = service.cancel_out_of_service(
        &PremisesId(premises_id),
        &OutOfServiceId(out_of_service_id),
        today,
    )?;
    Ok(Json(period).into_response())
}
