//! API error types and JSON error response formatting.
//!
//! Every error response carries a single `detail` field, matching the body
//! shape the chat client expects.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use manifest_chart::ChartError;
use manifest_core::{DatasetError, ErrorDetail};
use thiserror::Error;

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 422 Unprocessable Entity - body missing or not a valid query.
    UnprocessableEntity(String),
    /// 500 Internal Server Error - visualization or agent failure.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorDetail { detail })).into_response()
    }
}

/// Anything that can go wrong while producing the fixed histogram.
#[derive(Debug, Error)]
pub enum VisualizationError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error("render task failed: {0}")]
    Task(String),
}
