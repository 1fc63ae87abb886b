//! Lifecycle error types.

use thiserror::Error;

use tessera_shared::AppError;

use crate::lifecycle::types::DocumentKind;

/// Errors that can occur while validating a status change.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// The target status is not reachable from the current one.
    #[error("Invalid {kind} status transition from {from} to {to}")]
    InvalidTransition {
        /// Document kind.
        kind: DocumentKind,
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// A status string is not part of the kind's status set.
    #[error("Unknown {kind} status '{status}'")]
    UnknownStatus {
        /// Document kind.
        kind: DocumentKind,
        /// The rejected value.
        status: String,
    },

    /// A document kind string is not recognized.
    #[error("Unknown document kind '{0}'")]
    UnknownKind(String),

    /// A status of one kind was applied to a document of another kind.
    #[error("Status of kind {found} cannot apply to a {expected} document")]
    KindMismatch {
        /// Kind of the document.
        expected: DocumentKind,
        /// Kind of the supplied status.
        found: DocumentKind,
    },

    /// Transition comment exceeds the stored limit.
    #[error("Comment exceeds {max} characters")]
    CommentTooLong {
        /// Maximum accepted length.
        max: usize,
    },

    /// A transition table failed its startup check.
    #[error("Invalid transition table: {0}")]
    InvalidTable(String),
}

impl LifecycleError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidTransition { .. } => 409,
            Self::UnknownStatus { .. }
            | Self::UnknownKind(_)
            | Self::KindMismatch { .. }
            | Self::CommentTooLong { .. } => 400,
            Self::InvalidTable(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::UnknownStatus { .. } => "UNKNOWN_STATUS",
            Self::UnknownKind(_) => "UNKNOWN_KIND",
            Self::KindMismatch { .. } => "KIND_MISMATCH",
            Self::CommentTooLong { .. } => "COMMENT_TOO_LONG",
            Self::InvalidTable(_) => "INVALID_TRANSITION_TABLE",
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        let message = err.to_string();
        match err.status_code() {
            409 => Self::Conflict(message),
            400 => Self::Validation(message),
            _ => Self::Internal(message),
        }
    }
}
