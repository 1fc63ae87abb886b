//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - `TenantScopedStore`, the only path to tenant-owned rows
//! - Code generation, lifecycle, and share token services
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::{
    CodeGenError, CodeGenerator, DocumentFilter, DocumentRepository, EngineError, IssueShare,
    IssuedShare, LifecycleEngine, NewDocument, ShareServiceError, ShareStats, ShareTokenService,
    SharedAccess, StoreError, TenantOwned, TenantRepository, TenantScopedStore,
};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tessera_shared::config::DatabaseConfig;

/// Establishes a pooled connection using the configured pool sizes.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
