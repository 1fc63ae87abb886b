//! Shared types, errors, and configuration for Tessera.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for tenants, documents, and share tokens
//! - Pagination types for list endpoints
//! - The application-wide error taxonomy
//! - Configuration management
//! - JWT claims and token validation

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;


pub use auth::Claims;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
