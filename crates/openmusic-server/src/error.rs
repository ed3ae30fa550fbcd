use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use openmusic_storage::StorageError;
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use thiserror::Error;

use crate::validator::ValidationError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Payload did not match the expected shape
    #[error("{0}")]
    Validation(String),
    /// A write that should have produced a row did not, or a token is unusable
    #[error("{0}")]
    Invariant(String),
    #[error("{0}")]
    Authentication(String),
    /// Caller is known but may not touch the resource
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Invariant(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Database(_) | Self::Storage(_) | Self::Token(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Map a unique-constraint violation to an invariant failure with `message`,
    /// keeping every other database error as is.
    pub fn on_unique_violation(err: DbErr, message: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::Invariant(message.to_string()),
            _ => Self::Database(err),
        }
    }

    /// Map a foreign-key violation to a not-found failure with `message`.
    pub fn on_foreign_key_violation(err: DbErr, message: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => Self::NotFound(message.to_string()),
            _ => Self::Database(err),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value.0)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            return (
                status,
                Json(json!({
                    "status": "error",
                    "message": "internal server error",
                })),
            )
                .into_response();
        }

        (
            status,
            Json(json!({
                "status": "fail",
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}
