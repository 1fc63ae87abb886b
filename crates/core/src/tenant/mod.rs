//! Tenant resolution.
//!
//! Every store and service call takes a [`Tenant`] by value. A `Tenant`
//! can only be built from a non-nil id, so "no tenant" never reaches the
//! persistence layer.

pub mod context;
pub mod error;

pub use context::{Tenant, TenantContext, TenantResolver, TenantSource};
pub use error::TenantError;
