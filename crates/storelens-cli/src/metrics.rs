use std::sync::Arc;

use clap::{Args, ValueEnum};
use serde_json::Value;
use storelens_db::{Aggregator, CatalogStore};

use crate::output::{print_json, warn_if_volatile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricView {
    /// Store-wide totals and averages
    Dashboard,
    /// Highest event impact score
    Trending,
    /// Highest profit margin
    TopMargin,
    /// Lowest estimated demand
    Underperforming,
    /// Per-category roll-up
    Categories,
    /// Daily analytics roll-up
    SalesTrend,
}

#[derive(Debug, Clone, Args)]
pub struct MetricOptions {
    /// Number of products returned by ranking views
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
    /// Restrict the sales trend to one product
    #[arg(long)]
    pub product: Option<String>,
}

#[derive(Debug, Args)]
pub struct MetricArgs {
    #[arg(value_enum)]
    pub view: MetricView,
    #[command(flatten)]
    pub options: MetricOptions,
}

pub(crate) async fn compute(
    store: Arc<dyn CatalogStore>,
    view: MetricView,
    options: &MetricOptions,
) -> anyhow::Result<Value> {
    let aggregator = Aggregator::new(store);
    let value = match view {
        MetricView::Dashboard => serde_json::to_value(aggregator.dashboard().await?)?,
        MetricView::Trending => serde_json::to_value(aggregator.trending(options.limit).await?)?,
        MetricView::TopMargin => {
            serde_json::to_value(aggregator.top_margin(options.limit).await?)?
        }
        MetricView::Underperforming => {
            serde_json::to_value(aggregator.underperforming(options.limit).await?)?
        }
        MetricView::Categories => serde_json::to_value(aggregator.category_performance().await?)?,
        MetricView::SalesTrend => {
            serde_json::to_value(aggregator.daily_sales(options.product.as_deref()).await?)?
        }
    };
    Ok(value)
}

pub(crate) async fn run_metrics(
    store: Arc<dyn CatalogStore>,
    args: &MetricArgs,
) -> anyhow::Result<()> {
    warn_if_volatile(store.as_ref());
    print_json(&compute(store, args.view, &args.options).await?)
}
