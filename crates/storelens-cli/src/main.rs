mod analytics;
mod db;
mod ingest;
mod metrics;
mod output;
mod products;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::analytics::AnalyticsCommands;
use crate::db::DbCommands;
use crate::ingest::IngestCommands;
use crate::metrics::MetricArgs;
use crate::products::ProductCommands;

#[derive(Debug, Parser)]
#[command(name = "storelens")]
#[command(about = "Catalog storage and analytics command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Load a CSV feed into the catalog
    Ingest {
        #[command(subcommand)]
        command: IngestCommands,
    },
    /// Query and edit products
    Products {
        #[command(subcommand)]
        command: ProductCommands,
    },
    /// Inspect recorded analytics
    Analytics {
        #[command(subcommand)]
        command: AnalyticsCommands,
    },
    /// Ranking views and roll-ups
    Metrics(MetricArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = storelens_core::load_app_config()?;

    // stdout carries JSON results; diagnostics go to stderr.
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = cli.command else {
        println!("storelens ready (backend: {})", backend_label(&config));
        return Ok(());
    };

    match command {
        Commands::Db { command } => db::run_db(&config, &command).await,
        Commands::Ingest { command } => {
            let store = storelens_db::open_store(&config).await?;
            ingest::run_ingest(&config, store, command).await
        }
        Commands::Products { command } => {
            let store = storelens_db::open_store(&config).await?;
            products::run_products(store.as_ref(), command).await
        }
        Commands::Analytics { command } => {
            let store = storelens_db::open_store(&config).await?;
            analytics::run_analytics(store.as_ref(), command).await
        }
        Commands::Metrics(args) => {
            let store = storelens_db::open_store(&config).await?;
            metrics::run_metrics(store, &args).await
        }
    }
}

fn backend_label(config: &storelens_core::AppConfig) -> &'static str {
    if config.is_persistent() {
        "postgres"
    } else {
        "memory"
    }
}

#[cfg(test)]
mod tests;
