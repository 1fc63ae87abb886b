//! JSON error responses.
//!
//! Every handler error becomes `{ "error": <code>, "message": <text> }`
//! with the status of its category. Domain errors keep their own codes
//! (`INVALID_TRANSITION`, `SHARE_EXPIRED`, ...) rather than the coarse
//! `AppError` ones.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use tessera_core::code::CodeError;
use tessera_core::lifecycle::LifecycleError;
use tessera_core::share::ShareError;
use tessera_core::tenant::TenantError;
use tessera_db::{CodeGenError, EngineError, ShareServiceError, StoreError};
use tessera_shared::AppError;

/// An error ready to be rendered as a response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Builds an error from a numeric status, a code, and a message.
    pub fn new(status: u16, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code,
            message: message.into(),
        }
    }

    /// A 400 for malformed input.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(400, "VALIDATION_ERROR", message)
    }

    /// A 404 for a missing resource.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, "NOT_FOUND", message)
    }

    /// Returns the response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = if self.status.is_server_error() {
            error!(status = %self.status, code = self.code, error = %self.message, "request failed");
            "An internal error occurred".to_string()
        } else {
            self.message
        };

        (
            self.status,
            Json(json!({ "error": self.code, "message": message })),
        )
            .into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::new(err.status_code(), err.error_code(), err.to_string())
    }
}

macro_rules! domain_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ApiError {
                fn from(err: $ty) -> Self {
                    Self::new(err.status_code(), err.error_code(), err.to_string())
                }
            }
        )*
    };
}

domain_error!(
    TenantError,
    LifecycleError,
    CodeError,
    ShareError,
    StoreError,
    CodeGenError,
    EngineError,
    ShareServiceError,
);
