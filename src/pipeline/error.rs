//! Pipeline failure taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Why a stage refused to let a request continue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Malformed or missing signed-request parameters.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Token absent where required, invalid, or expired.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Anything else. The detail is logged, never sent to the caller.
    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::Authentication(_) => StatusCode::UNAUTHORIZED,
            PipelineError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            PipelineError::Validation(msg) => msg.clone(),
            PipelineError::Authentication(_) => "Unauthorized".to_string(),
            PipelineError::Unexpected(detail) => {
                tracing::error!(error = %detail, "Request failed unexpectedly");
                "Internal server error".to_string()
            }
        };
        (status, body).into_response()
    }
}
