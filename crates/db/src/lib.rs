//! Database layer with `SeaORM` entities and the PostgreSQL compliance store.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - [`PgComplianceStore`], the production implementation of the core store traits
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod store;

pub use store::{PgComplianceStore, PgUnitOfWork};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use stillhouse_shared::config::DatabaseConfig;

/// Establishes a connection pool sized from configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    tracing::info!(
        max_connections = config.max_connections,
        "Database connection pool ready"
    );
    Ok(db)
}
