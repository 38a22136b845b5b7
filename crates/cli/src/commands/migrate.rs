//! Database migration command.
//!
//! Migrations live in `crates/api/migrations` and are embedded at compile
//! time, so the CLI binary can be shipped alone.
//!
//! # Environment Variables
//!
//! - `VENDORA_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection
//!   string

use sqlx::PgPool;
use thiserror::Error;

use super::MissingEnvVar;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending migrations.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = super::database_url()?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
