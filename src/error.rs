use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::workflow::WorkflowError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// An automation run is already in flight.
    #[error("automation already running")]
    Busy,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<WorkflowError> for ServiceError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Validation(message) => ServiceError::InvalidInput(message),
            WorkflowError::NotFound(message) => ServiceError::NotFound(message),
            WorkflowError::Precondition(message) => ServiceError::InvalidState(message),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {err}"))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Busy => AppError::Conflict("automation already running".into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_errors_map_to_http_statuses() {
        let cases = [
            (WorkflowError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (WorkflowError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (WorkflowError::Precondition("early".into()), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            let response = AppError::from(ServiceError::from(err)).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn busy_is_a_conflict() {
        let response = AppError::from(ServiceError::Busy).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
