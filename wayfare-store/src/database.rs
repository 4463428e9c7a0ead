use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;
use wayfare_core::repository::RepoError;

use crate::app_config::DatabaseConfig;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// ============================================================================
// Row helpers shared by the repositories
// ============================================================================

/// Parses a TEXT column holding one of the lowercase enum names.
pub(crate) fn decode<T: FromStr<Err = String>>(text: &str) -> Result<T, RepoError> {
    text.parse().map_err(|e: String| RepoError::Backend(e.into()))
}

/// Insert/update failures: a dangling foreign key means the caller pointed at something missing.
pub(crate) fn write_error(err: sqlx::Error, label: &str) -> RepoError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepoError::Duplicate(label.to_string());
        }
        if db.is_foreign_key_violation() {
            return RepoError::Invalid(format!("{} references a record that does not exist", label));
        }
    }
    RepoError::backend(err)
}

/// Delete failures: a foreign key violation means other rows still point at the record.
pub(crate) fn delete_error(err: sqlx::Error, label: &str) -> RepoError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            return RepoError::InUse(label.to_string());
        }
    }
    RepoError::backend(err)
}
