use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::ApiProblem;
use crate::pagination::{paginate, PageCriteria};
use crate::workflows::repository::{EstateRepository, RepositoryError};

use super::domain::{PremisesId, ServiceName};
use super::service::EstateService;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PremisesQuery {
    service: Option<ServiceName>,
    page: Option<u32>,
    per_page: Option<u32>,
}

/// Router exposing premises listings.
pub fn premises_router<R>(service: Arc<EstateService<R>>) -> Router
where
    R: EstateRepository + 'static,
{
    Router::new()
        .route("/api/v1/premises", get(list_handler::<R>))
        .route("/api/v1/premises/:premises_id", get(show_handler::<R>))
        .with_state(service)
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<EstateService<R>>>,
    Query(query): Query<PremisesQuery>,
) -> Result<Response, ApiProblem>
where
    R: EstateRepository + 'static,
{
    let premises = service.list_premises(query.service)?;
    let criteria = PageCriteria {
        page: query.page,
        per_page: query.per_page,
    };
    Ok(paginate(premises, criteria, service.default_page_size()).into_response())
}

pub(crate) async fn show_handler<R>(
    State(service): State<Arc<EstateService<R>>>,
    Path(premises_id): Path<String>,
) -> Result<Response, ApiProblem>
where
    R: EstateRepository + 'static,
{
    let id = PremisesId(premises_id);
    match service.premises(&id) {
        Ok(summary) => Ok(Json(summary).into_response()),
        Err(RepositoryError::NotFound) => Err(ApiProblem::not_found(format!(
            "No premises with an id of {id} could be found"
        ))),
        Err(other) => Err(other.into()),
    }
}
