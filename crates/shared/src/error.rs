//! Application-wide error types.
//!
//! Domain crates keep their own error enums and convert into `AppError`
//! at the presentation boundary, so every failure lands in exactly one
//! HTTP-equivalent category.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication failed or no tenant could be resolved.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Access denied (cross-tenant access included).
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict (invalid transition, duplicate code, exhausted retries).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Resource existed but is no longer usable (expired or revoked share).
    #[error("Gone: {0}")]
    Gone(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::Gone(_) => 410,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Gone(_) => "GONE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true for errors that should not leak details to clients.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Internal(_))
    }
}
