//! Tenant resolution error types.

use thiserror::Error;
use uuid::Uuid;

use tessera_shared::AppError;

/// Errors that can occur while resolving the tenant of a unit of work.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TenantError {
    /// Neither an actor nor an explicit tenant was available.
    #[error("No tenant could be resolved for this operation")]
    NoTenant,

    /// The nil UUID is not a tenant.
    #[error("Tenant id must not be nil")]
    NilTenant,

    /// The actor's tenant and the explicitly requested tenant differ.
    #[error("Actor belongs to tenant {actor} but tenant {explicit} was requested")]
    Ambiguous {
        /// Tenant carried by the authenticated actor.
        actor: Uuid,
        /// Tenant requested explicitly.
        explicit: Uuid,
    },

    /// A write carried a tenant id other than the resolved one.
    #[error("Tenant mismatch: expected {expected}, got {found}")]
    Mismatch {
        /// Resolved tenant.
        expected: Uuid,
        /// Tenant found in the payload or row.
        found: Uuid,
    },
}

impl TenantError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NoTenant => 401,
            Self::NilTenant => 400,
            Self::Ambiguous { .. } | Self::Mismatch { .. } => 403,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NoTenant => "NO_TENANT",
            Self::NilTenant => "NIL_TENANT",
            Self::Ambiguous { .. } => "AMBIGUOUS_TENANT",
            Self::Mismatch { .. } => "TENANT_MISMATCH",
        }
    }
}

impl From<TenantError> for AppError {
    fn from(err: TenantError) -> Self {
        let message = err.to_string();
        match err {
            TenantError::NoTenant => Self::Unauthorized(message),
            TenantError::NilTenant => Self::Validation(message),
            TenantError::Ambiguous { .. } | TenantError::Mismatch { .. } => {
                Self::Forbidden(message)
            }
        }
    }
}
