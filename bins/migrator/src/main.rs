//! Database migration runner for Stillhouse.
//!
//! Usage:
//!   migrator up      - Apply the compliance schema
//!   migrator down    - Roll back the last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop every table and re-apply
//!
//! The connection string comes from `DATABASE_URL`, optionally via `.env`.

use sea_orm_migration::prelude::*;
use stillhouse_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The migrator CLI installs its own tracing subscriber.
    cli::run_cli(Migrator).await;
}
