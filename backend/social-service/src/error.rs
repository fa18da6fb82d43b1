/// Error types for social-service
///
/// Every failure is scoped to the request that caused it and rendered as
/// `{"detail": "..."}`; validation failures add an `errors` map.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use agora_common::{FieldErrors, PaginationError};
use thiserror::Error;

use crate::permissions::Denial;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication credentials were not provided.")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate state change (e.g. liking twice)
    #[error("{0}")]
    Conflict(String),

    /// Actor and target are the same principal
    #[error("{0}")]
    SelfReference(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid input.")]
    Validation(FieldErrors),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found."))
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(FieldErrors::single(field, message))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_)
            | AppError::SelfReference(_)
            | AppError::BadRequest(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            AppError::Validation(errors) => serde_json::json!({
                "detail": self.to_string(),
                "errors": errors,
            }),
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                serde_json::json!({ "detail": "A server error occurred." })
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                serde_json::json!({ "detail": "A server error occurred." })
            }
            _ => serde_json::json!({ "detail": self.to_string() }),
        };

        let mut builder = HttpResponse::build(status);
        if status == StatusCode::UNAUTHORIZED {
            builder.insert_header(("WWW-Authenticate", "Bearer"));
        }
        builder.json(body)
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => AppError::Unauthenticated,
            Denial::NotOwner => AppError::Forbidden(
                "You do not have permission to perform this action.".to_string(),
            ),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.into())
    }
}

impl From<PaginationError> for AppError {
    fn from(err: PaginationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{err:#}"))
    }
}
