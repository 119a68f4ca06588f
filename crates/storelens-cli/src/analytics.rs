use clap::Subcommand;
use storelens_db::CatalogStore;

use crate::output::{print_json, warn_if_volatile};

#[derive(Debug, Subcommand)]
pub enum AnalyticsCommands {
    /// List analytics records by date
    List {
        /// Only records for this product
        #[arg(long)]
        product: Option<String>,
    },
}

pub(crate) async fn run_analytics(
    store: &dyn CatalogStore,
    command: AnalyticsCommands,
) -> anyhow::Result<()> {
    warn_if_volatile(store);
    match command {
        AnalyticsCommands::List { product } => {
            let records = store.list_analytics(product.as_deref()).await?;
            print_json(&records)
        }
    }
}
