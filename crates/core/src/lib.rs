//! Core domain logic for Tessera.
//!
//! This crate contains pure domain logic with ZERO web or database dependencies.
//! Persistence lives in `tessera-db`, which drives the rules defined here.
//!
//! # Modules
//!
//! - `tenant` - Tenant resolution for a unit of work
//! - `lifecycle` - Closed status sets and transition tables per document kind
//! - `code` - Human-readable document codes, scope keys, retry policy
//! - `share` - Share permissions, secrets, and access policy

pub mod code;
pub mod lifecycle;
pub mod share;
pub mod tenant;
