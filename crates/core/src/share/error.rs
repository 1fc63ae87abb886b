//! Share link error types.

use thiserror::Error;

use tessera_shared::AppError;

use crate::lifecycle::DocumentKind;
use crate::share::types::Permission;

/// Errors that can occur while issuing or using a share link.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShareError {
    /// The token does not exist, or not in this tenant.
    #[error("Share link not found")]
    NotFound,

    /// The token was revoked.
    #[error("Share link has been revoked")]
    Revoked,

    /// The token's lifetime elapsed.
    #[error("Share link has expired")]
    Expired,

    /// No permissions were requested.
    #[error("At least one permission is required")]
    EmptyPermissions,

    /// A permission name is not recognized.
    #[error("Unknown permission '{0}'")]
    UnknownPermission(String),

    /// Requested lifetime is outside the allowed range.
    #[error("Share lifetime must be between 1 and {max} days, got {requested}")]
    InvalidTtl {
        /// Requested days.
        requested: u32,
        /// Longest allowed lifetime.
        max: u32,
    },

    /// Links without expiry are disabled.
    #[error("Share links without expiry are not allowed")]
    NoExpiryNotAllowed,

    /// Recipient e-mail is not plausible.
    #[error("Invalid recipient e-mail '{0}'")]
    InvalidRecipient(String),

    /// The token lacks a permission.
    #[error("Share link does not grant '{0}'")]
    PermissionDenied(Permission),

    /// Decisions through a share are not defined for this kind.
    #[error("Decisions are not supported for {0} documents")]
    DecisionNotSupported(DocumentKind),
}

impl ShareError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Revoked | Self::Expired => 410,
            Self::EmptyPermissions
            | Self::UnknownPermission(_)
            | Self::InvalidTtl { .. }
            | Self::NoExpiryNotAllowed
            | Self::InvalidRecipient(_)
            | Self::DecisionNotSupported(_) => 400,
            Self::PermissionDenied(_) => 403,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound => "SHARE_NOT_FOUND",
            Self::Revoked => "SHARE_REVOKED",
            Self::Expired => "SHARE_EXPIRED",
            Self::EmptyPermissions => "EMPTY_PERMISSIONS",
            Self::UnknownPermission(_) => "UNKNOWN_PERMISSION",
            Self::InvalidTtl { .. } => "INVALID_TTL",
            Self::NoExpiryNotAllowed => "NO_EXPIRY_NOT_ALLOWED",
            Self::InvalidRecipient(_) => "INVALID_RECIPIENT",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::DecisionNotSupported(_) => "DECISION_NOT_SUPPORTED",
        }
    }
}

impl From<ShareError> for AppError {
    fn from(err: ShareError) -> Self {
        let message = err.to_string();
        match err.status_code() {
            404 => Self::NotFound(message),
            410 => Self::Gone(message),
            403 => Self::Forbidden(message),
            _ => Self::Validation(message),
        }
    }
}
