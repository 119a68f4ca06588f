use clap::Subcommand;
use serde_json::json;
use storelens_core::AppConfig;
use storelens_db::{DbError, PoolConfig};

use crate::output::print_json;

#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check that the configured store responds
    Ping,
    /// Apply pending migrations (requires DATABASE_URL)
    Migrate,
}

pub(crate) async fn run_db(config: &AppConfig, command: &DbCommands) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            let store = storelens_db::open_store(config).await?;
            store.ping().await?;
            print_json(&json!({ "backend": store.backend().to_string(), "ok": true }))
        }
        DbCommands::Migrate => {
            let url = config
                .database_url
                .as_deref()
                .ok_or(DbError::MissingDatabaseUrl)?;
            let pool = storelens_db::connect_pool(url, PoolConfig::from_app_config(config))
                .await
                .map_err(DbError::from)?;
            let applied = storelens_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations complete");
            print_json(&json!({ "applied": applied }))
        }
    }
}
