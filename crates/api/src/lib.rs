//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Document, lifecycle, and share routes for authenticated tenants
//! - Public share routes for anonymous recipients
//! - JWT authentication and tenant resolution middleware
//! - Uniform `{ "error", "message" }` error responses

pub mod error;
pub mod middleware;
pub mod routes;

use std::iter::once;
use std::sync::Arc;

use axum::Router;
use axum::http::header::AUTHORIZATION;
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;

use tessera_core::code::RetryPolicy;
use tessera_core::tenant::{TenantError, TenantResolver};
use tessera_db::{CodeGenerator, DocumentRepository, LifecycleEngine, ShareTokenService};
use tessera_shared::{AppConfig, JwtConfig, JwtService};

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: DatabaseConnection,
    /// Document creation and lookup.
    pub documents: DocumentRepository,
    /// Status transitions and duplication.
    pub engine: LifecycleEngine,
    /// Share link issuing and validation.
    pub shares: ShareTokenService,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Resolves the tenant of each request.
    pub tenants: Arc<TenantResolver>,
    /// Cancelled when the server shuts down.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wires the services from configuration.
    ///
    /// # Errors
    ///
    /// Returns `TenantError::NilTenant` if the configured public tenant is nil.
    pub fn new(db: DatabaseConnection, config: &AppConfig) -> Result<Self, TenantError> {
        let codes = CodeGenerator::new(db.clone(), &config.codegen);
        let engine = LifecycleEngine::new(db.clone(), codes.clone());
        let documents = DocumentRepository::new(db.clone(), codes);
        let shares = ShareTokenService::new(
            db.clone(),
            engine.clone(),
            &config.share,
            RetryPolicy::from_config(&config.codegen),
        );
        let jwt_service = JwtService::new(JwtConfig {
            secret: config.jwt.secret.clone(),
            access_token_expires_minutes: i64::try_from(config.jwt.access_token_expiry_secs / 60)
                .unwrap_or(i64::MAX),
        });

        Ok(Self {
            db,
            documents,
            engine,
            shares,
            jwt_service: Arc::new(jwt_service),
            tenants: Arc::new(TenantResolver::new(config.tenancy.public_tenant_id)?),
            shutdown: CancellationToken::new(),
        })
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetSensitiveRequestHeadersLayer::new(once(AUTHORIZATION)))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
