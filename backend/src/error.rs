//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use crate::agent::InvokeError;
use crate::pipeline::PipelineError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// All errors that can occur in the application are represented by this enum.
/// Each variant implements automatic conversion to HTTP responses via `IntoResponse`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Error raised by the pipeline (input validation, stage failure, ...)
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Request body is malformed or missing fields
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The final document has not been produced yet
    #[error("Final document is not available yet")]
    DocumentNotReady,

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Pipeline(err) => match err {
                PipelineError::EmptyInput | PipelineError::InvalidInput(_) => {
                    StatusCode::BAD_REQUEST
                }
                PipelineError::RunInProgress => StatusCode::CONFLICT,
                PipelineError::Abandoned => StatusCode::GONE,
                PipelineError::Stage { source, .. } => match source {
                    InvokeError::Connection(_) | InvokeError::Upstream { .. } => {
                        StatusCode::BAD_GATEWAY
                    }
                    InvokeError::InvalidRequest(_) => StatusCode::INTERNAL_SERVER_ERROR,
                },
                PipelineError::OutOfOrder(_) | PipelineError::Transition(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::DocumentNotReady => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
