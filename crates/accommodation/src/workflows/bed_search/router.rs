use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};

use crate::error::ApiProblem;
use crate::workflows::repository::{BookingRepository, EstateRepository};

use super::domain::{BedSearchRequest, BedSearchResults};
use super::service::{BedSearchError, BedSearchService};

/// Router exposing the bed availability search.
pub fn bed_search_router<R>(service: Arc<BedSearchService<R>>) -> Router
where
    R: EstateRepository + BookingRepository + 'static,
{
    Router::new()
        .route("/api/v1/beds/search", post(search_handler::<R>))
        .with_state(service)
}

impl From<BedSearchError> for ApiProblem {
    fn from(error: BedSearchError) -> Self {
        match error {
            BedSearchError::Validation(errors) => ApiProblem::validation(errors),
            BedSearchError::UnknownPostcodeDistrict(_) => ApiProblem::not_found(error.to_string()),
            BedSearchError::Repository(err) => err.into(),
        }
    }
}

pub(crate) async fn search_handler<R>(
    State(service): State<Arc<BedSearchService<R>>>,
    Json(request): Json<BedSearchRequest>,
) -> Result<Json<BedSearchResults>, ApiProblem>
where
    R: EstateRepository + BookingRepository + 'static,
{
    Ok(Json(service.search(request)?))
}
