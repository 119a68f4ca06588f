use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use serde_json::{json, Map, Value};
use storelens_core::{validate_new, FieldMatch, ProductPatch, ProductQueryParams, RawRecord};
use storelens_db::CatalogStore;

use crate::output::{print_json, warn_if_volatile};

#[derive(Debug, Subcommand)]
pub enum ProductCommands {
    /// List products matching every supplied filter
    List(ListArgs),
    /// Case-insensitive substring search over title and category
    Search {
        query: String,
        #[arg(long)]
        limit: Option<String>,
        #[arg(long)]
        offset: Option<String>,
    },
    /// Fetch one product by id
    Get { id: String },
    /// Find the first product whose business key matches exactly
    ByField(FieldArgs),
    /// Count all products
    Count,
    /// Create a product from a JSON object (id generated when absent)
    Create { json: String },
    /// Apply a partial update given as a JSON object (`null` clears a field)
    Update { id: String, json: String },
}

#[derive(Debug, Default, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub min_price: Option<String>,
    #[arg(long)]
    pub max_price: Option<String>,
    #[arg(long)]
    pub min_rating: Option<String>,
    /// Products with analytics recorded at this location
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub limit: Option<String>,
    #[arg(long)]
    pub offset: Option<String>,
}

impl ListArgs {
    fn to_params(&self) -> ProductQueryParams {
        ProductQueryParams {
            limit: self.limit.clone(),
            offset: self.offset.clone(),
            category: self.category.clone(),
            min_price: self.min_price.clone(),
            max_price: self.max_price.clone(),
            min_rating: self.min_rating.clone(),
            location: self.location.clone(),
            q: None,
        }
    }
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct FieldArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub event: Option<String>,
}

impl FieldArgs {
    fn into_field_match(self) -> Option<FieldMatch> {
        match (self.title, self.category, self.event) {
            (Some(title), _, _) => Some(FieldMatch::Title(title)),
            (_, Some(category), _) => Some(FieldMatch::Category(category)),
            (_, _, Some(event)) => Some(FieldMatch::EventName(event)),
            _ => None,
        }
    }
}

pub(crate) async fn run_products(
    store: &dyn CatalogStore,
    command: ProductCommands,
) -> anyhow::Result<()> {
    warn_if_volatile(store);
    match command {
        ProductCommands::List(args) => {
            let query = args.to_params().parse()?;
            let products = store.list(&query.filter, query.page).await?;
            print_json(&products)
        }
        ProductCommands::Search {
            query,
            limit,
            offset,
        } => {
            let params = ProductQueryParams {
                limit,
                offset,
                ..ProductQueryParams::default()
            };
            let page = params.parse()?.page;
            let hits = store.search(&query).await?;
            print_json(&page.apply(hits))
        }
        ProductCommands::Get { id } => match store.get(&id).await? {
            Some(product) => print_json(&product),
            None => bail!("product {id:?} not found"),
        },
        ProductCommands::ByField(args) => {
            let Some(field) = args.into_field_match() else {
                bail!("one of --title, --category or --event is required");
            };
            match store.get_by_field(&field).await? {
                Some(product) => print_json(&product),
                None => bail!("no product with {} = {:?}", field.column(), field.value()),
            }
        }
        ProductCommands::Count => print_json(&json!({ "count": store.count().await? })),
        ProductCommands::Create { json } => {
            let raw = raw_record_from_json(&json)?;
            let product = store.create(validate_new(&raw)?).await?;
            print_json(&product)
        }
        ProductCommands::Update { id, json } => {
            let patch: ProductPatch =
                serde_json::from_str(&json).context("update must be a JSON object")?;
            if patch.is_empty() {
                bail!("update supplies no known fields");
            }
            match store.update(&id, &patch).await? {
                Some(product) => print_json(&product),
                None => bail!("product {id:?} not found"),
            }
        }
    }
}

/// Flattens a JSON object into the untyped form the validator expects.
fn raw_record_from_json(text: &str) -> anyhow::Result<RawRecord> {
    let object: Map<String, Value> =
        serde_json::from_str(text).context("product must be a JSON object")?;
    Ok(object
        .into_iter()
        .map(|(key, value)| (key, json_text(value)))
        .collect())
}

fn json_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_becomes_raw_record() {
        let body = json!({
            "title": "Widget",
            "category": "Tools",
            "price": 12.5,
            "rating": "4",
            "isPromoted": true,
            "costPrice": null,
        });
        let raw = raw_record_from_json(&body.to_string()).unwrap();

        let product = validate_new(&raw).unwrap();
        assert_eq!(product.title, "Widget");
        assert_eq!(product.price.to_string(), "12.5");
        assert!(product.is_promoted);
        assert!(product.cost_price.is_none());
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(raw_record_from_json("[1,2]").is_err());
        assert!(raw_record_from_json("not json").is_err());
    }

    #[test]
    fn list_args_flow_through_query_params() {
        let args = ListArgs {
            category: Some("Tools".to_string()),
            min_price: Some("5".to_string()),
            limit: Some("500".to_string()),
            ..ListArgs::default()
        };
        let query = args.to_params().parse().unwrap();
        assert_eq!(query.filter.category.as_deref(), Some("Tools"));
        assert_eq!(query.page.limit(), storelens_core::query::MAX_LIMIT);
    }
}
