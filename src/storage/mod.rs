//! # Storage and Persistence
//!
//! PostgreSQL connectivity and the embedded schema for the database
//! secret backend.

pub mod pool;

pub use crate::config::DatabaseConfig;
pub use pool::{create_pool, DbPool};

use crate::errors::{Result, SecretManagementError};

/// Apply the embedded migrations under `migrations/`
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        tracing::error!(error = %e, "Database migration failed");
        SecretManagementError::from(e)
    })?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| SecretManagementError::backend("database connectivity check", e))?;
    Ok(())
}
