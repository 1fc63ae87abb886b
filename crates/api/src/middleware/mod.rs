//! Request middleware and extractors.

pub mod auth;

pub use auth::{AuthUser, CurrentTenant, TENANT_HEADER, auth_middleware};
