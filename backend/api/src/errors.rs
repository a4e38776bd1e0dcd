//! Application-wide error types and their HTTP mapping.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Corrupt record: {0}")]
    Data(String),

    #[error("{0}")]
    Validation(#[from] cascade_core::CoreError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("owner token or PIN mismatch")]
    Unauthorized,

    #[error("the pot is closed")]
    PotClosed,

    #[error("the pot's end date has passed")]
    PotEnded,

    #[error("the cycle is already closed")]
    CycleAlreadyClosed,
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::PotClosed | ApiError::PotEnded | ApiError::CycleAlreadyClosed => {
                StatusCode::CONFLICT
            }
            ApiError::Database(_)
            | ApiError::Migrate(_)
            | ApiError::Json(_)
            | ApiError::Config(_)
            | ApiError::Data(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("{self}");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
