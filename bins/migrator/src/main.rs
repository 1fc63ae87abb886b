//! Database migration runner for Tessera.
//!
//! Reads `DATABASE_URL` (or `.env`). Usage:
//!   migrator up      - Apply pending migrations
//!   migrator down    - Roll back the last migration
//!   migrator status  - Show applied and pending migrations
//!   migrator fresh   - Drop everything and re-apply

use sea_orm_migration::prelude::*;
use tessera_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The CLI installs its own tracing subscriber.
    cli::run_cli(Migrator).await;
}
