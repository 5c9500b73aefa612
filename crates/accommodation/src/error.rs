use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::bed_search::BedSearchError;
use crate::workflows::estate::import::ImportError;
use crate::workflows::repository::RepositoryError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Import(ImportError),
    Repository(RepositoryError),
    Search(BedSearchError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Import(err) => write!(f, "estate import error: {}", err),
            AppError::Repository(err) => write!(f, "repository error: {}", err),
            AppError::Search(err) => write!(f, "search rejected: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Repository(err) => Some(err),
            AppError::Search(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Import(_) | AppError::Search(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ImportError> for AppError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value)
    }
}

impl From<BedSearchError> for AppError {
    fn from(value: BedSearchError) -> Self {
        Self::Search(value)
    }
}

/// A single rejected request field, addressed by JSON path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidParam {
    pub property_name: String,
    pub error_type: String,
}

/// Accumulates field-level validation failures before a request is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    params: Vec<InvalidParam>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, property_name: &str, error_type: &str) {
        self.params.push(InvalidParam {
            property_name: property_name.to_string(),
            error_type: error_type.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn params(&self) -> &[InvalidParam] {
        &self.params
    }

    pub fn has(&self, property_name: &str, error_type: &str) -> bool {
        self.params
            .iter()
            .any(|param| param.property_name == property_name && param.error_type == error_type)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self
            .params
            .iter()
            .map(|param| format!("{} ({})", param.property_name, param.error_type))
            .collect();
        write!(f, "invalid request parameters: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Problem response body returned by every API route on failure.
#[derive(Debug, Clone, Serialize)]
pub struct ApiProblem {
    #[serde(skip)]
    status: StatusCode,
    #[serde(rename = "status")]
    status_code: u16,
    title: &'static str,
    detail: String,
    #[serde(rename = "invalid-params", skip_serializing_if = "Vec::is_empty")]
    invalid_params: Vec<InvalidParam>,
}

impl ApiProblem {
    fn new(status: StatusCode, title: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            status_code: status.as_u16(),
            title,
            detail: detail.into(),
            invalid_params: Vec::new(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Bad Request", detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found", detail)
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "Conflict", detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            detail,
        )
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        let mut problem = Self::bad_request("There is a problem with your request");
        problem.invalid_params = errors.params;
        problem
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ValidationErrors> for ApiProblem {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation(errors)
    }
}

impl From<RepositoryError> for ApiProblem {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound => Self::not_found(error.to_string()),
            RepositoryError::Conflict => Self::conflict(error.to_string()),
            RepositoryError::Stale => Self::bad_request(error.to_string()),
            RepositoryError::Unavailable(_) => {
                tracing::error!(%error, "repository failure");
                Self::internal(error.to_string())
            }
        }
    }
}

impl IntoResponse for ApiProblem {
    fn into_response(self) -> Response {
        let status = self.status;
        (
            status,
            [(header::CONTENT_TYPE, "application/problem+json")],
            Json(self),
        )
            .into_response()
    }
}
