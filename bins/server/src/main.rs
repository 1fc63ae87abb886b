//! Tessera API Server
//!
//! Main entry point for the Tessera document service.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tessera_api::{AppState, create_router};
use tessera_core::lifecycle::LifecycleService;
use tessera_db::connect_with;
use tessera_shared::AppConfig;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tessera=debug,tower_http=debug".into());
    let json = std::env::var("TESSERA_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let config = AppConfig::load().context("failed to load configuration")?;

    LifecycleService::validate_tables().context("transition tables are inconsistent")?;

    let db = connect_with(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let state = AppState::new(db, &config)?;
    if state.tenants.has_public_tenant() {
        info!("Public tenant configured");
    }
    let shutdown = state.shutdown.clone();
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await?;

    info!("Server stopped");
    Ok(())
}
