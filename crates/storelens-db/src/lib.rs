use std::{sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};
use storelens_core::{AppConfig, ValidationError};
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/storelens-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    /// The durable backend could not be reached (connect failure, pool
    /// timeout, or I/O). Not retried internally.
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
    #[error("product {0:?} already exists")]
    AlreadyExists(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Sqlx(sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("in-memory catalog lock poisoned")]
    Poisoned,
}

impl DbError {
    /// Returns `true` when the failure is a transient backend outage the
    /// caller may retry.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DbError::Unavailable(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => DbError::Unavailable(err),
            other => DbError::Sqlx(other),
        }
    }
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // The _sqlx_migrations table may not exist yet on a fresh database; treat
    // absence as zero applied.
    let applied_before: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let applied_after: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Build the catalog store selected by configuration.
///
/// With `DATABASE_URL` set this connects to Postgres and applies pending
/// migrations; otherwise it returns an empty in-memory store. The choice is
/// made once, here, and the store is handed to its dependents explicitly.
///
/// # Errors
///
/// Returns [`DbError::Unavailable`] if Postgres cannot be reached, or
/// [`DbError::Migration`] if migrations fail.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn CatalogStore>, DbError> {
    match config.database_url.as_deref() {
        Some(url) => {
            let pool = connect_pool(url, PoolConfig::from_app_config(config)).await?;
            let applied = run_migrations(&pool).await?;
            tracing::info!(applied, "connected to postgres catalog store");
            Ok(Arc::new(PgCatalogStore::new(pool)))
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory catalog store");
            Ok(Arc::new(MemoryCatalogStore::new()))
        }
    }
}


pub mod aggregate;
pub mod analytics;
pub mod memory;
pub mod pg;
pub mod products;
pub mod store;

pub use aggregate::{Aggregator, CategoryPerformance, DailySales, DashboardMetrics};
pub use analytics::AnalyticsRow;
pub use memory::MemoryCatalogStore;
pub use pg::PgCatalogStore;
pub use products::ProductRow;
pub use store::{Backend, CatalogStore, UpsertOutcome};
