//! Document lifecycle rules for Tessera.
//!
//! Each document kind owns a closed status set and a static transition
//! table. The database engine in `tessera-db` is the only writer of
//! document status; it asks [`LifecycleService`] whether a move is legal
//! before touching a row.
//!
//! # Modules
//!
//! - `status` - Per-kind status enums, transition tables, display metadata
//! - `types` - Document kinds, the cross-kind status union, actors
//! - `service` - Transition checks and table validation
//! - `bulk` - Outcome accounting for bulk transitions
//! - `error` - Lifecycle error types

pub mod bulk;
pub mod error;
pub mod service;
pub mod status;
pub mod types;

#[cfg(test)]
mod service_props;

pub use bulk::{BulkFailure, BulkOptions, BulkOutcome};
pub use error::LifecycleError;
pub use service::LifecycleService;
pub use status::{BudgetStatus, InvoiceStatus, LifecycleStatus, ServiceStatus, StatusMeta};
pub use types::{Actor, DocumentKind, DocumentStatus, TransitionRecord};
