//! # Storage and Persistence
//!
//! SQLite connectivity, embedded migrations, and the account repository.

pub mod migrations;
pub mod pool;
pub mod repositories;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use crate::config::DatabaseConfig;

pub use migrations::{
    get_migration_version, list_applied_migrations, run_migrations, validate_migrations,
    MigrationInfo,
};
pub use pool::{create_pool, DbPool};
pub use repositories::{AccountRepository, SqlxAccountRepository};

use crate::errors::{Error, Result};

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| Error::database(e, "Database connectivity check failed"))?;

    Ok(())
}
