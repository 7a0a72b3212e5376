//! Error types for the HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::PenguinError;

#[derive(Error, Debug)]
pub enum ServerError {
    /// Malformed request body: missing field, wrong type, value outside the
    /// closed enum set. Resolved at the boundary; never reaches the core.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PenguinError> for ServerError {
    fn from(err: PenguinError) -> Self {
        // Artifact and prediction failures are all internal from the
        // caller's point of view; the cause is logged, not exposed.
        ServerError::Internal(err.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Prediction failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Prediction failed due to internal error.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
