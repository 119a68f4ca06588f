use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use storelens_core::AppConfig;
use storelens_db::{Backend, CatalogStore};
use storelens_ingest::{IngestError, IngestReport, Ingestor};

use crate::metrics::{self, MetricOptions, MetricView};
use crate::output::print_json;

#[derive(Debug, Subcommand)]
pub enum IngestCommands {
    /// Load a product CSV (`-` reads stdin)
    Products {
        path: PathBuf,
        /// Compute a metrics view over the store once the load commits
        #[arg(long, value_enum)]
        then: Option<MetricView>,
        #[command(flatten)]
        options: MetricOptions,
    },
    /// Load an analytics CSV (`-` reads stdin)
    Analytics {
        path: PathBuf,
        /// Compute a metrics view over the store once the load commits
        #[arg(long, value_enum)]
        then: Option<MetricView>,
        #[command(flatten)]
        options: MetricOptions,
    },
}

#[derive(Debug, Clone, Copy)]
enum Feed {
    Products,
    Analytics,
}

pub(crate) async fn run_ingest(
    config: &AppConfig,
    store: Arc<dyn CatalogStore>,
    command: IngestCommands,
) -> anyhow::Result<()> {
    let ingestor = Ingestor::from_app_config(Arc::clone(&store), config);
    let (feed, path, then, options) = match command {
        IngestCommands::Products {
            path,
            then,
            options,
        } => (Feed::Products, path, then, options),
        IngestCommands::Analytics {
            path,
            then,
            options,
        } => (Feed::Analytics, path, then, options),
    };

    let report = load(&ingestor, feed, &path)
        .await
        .with_context(|| format!("failed to ingest {}", path.display()))?;

    let mut out = json!({
        "backend": store.backend().to_string(),
        "ingest": report,
    });
    match then {
        Some(view) => {
            out["metrics"] = metrics::compute(store, view, &options).await?;
        }
        None if store.backend() == Backend::Memory => {
            tracing::warn!(
                "DATABASE_URL is not set: ingested rows are discarded on exit; \
                 pass --then <view> to query them in this run"
            );
        }
        None => {}
    }
    print_json(&out)
}

async fn load(ingestor: &Ingestor, feed: Feed, path: &Path) -> Result<IngestReport, IngestError> {
    let stdin = path == Path::new("-");
    match (feed, stdin) {
        (Feed::Products, true) => ingestor.ingest_report(tokio::io::stdin()).await,
        (Feed::Products, false) => ingestor.ingest_path(path).await,
        (Feed::Analytics, true) => ingestor.ingest_analytics(tokio::io::stdin()).await,
        (Feed::Analytics, false) => ingestor.ingest_analytics_path(path).await,
    }
}
