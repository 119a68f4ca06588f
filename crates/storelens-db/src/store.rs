//! The catalog store contract shared by the Postgres and in-memory backends.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use storelens_core::{AnalyticsRecord, FieldMatch, Page, Product, ProductFilter, ProductPatch};

use crate::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Memory,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Postgres => write!(f, "postgres"),
            Backend::Memory => write!(f, "memory"),
        }
    }
}

/// Rows written by a batch upsert, split by whether the key was new.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub inserted: u64,
    pub updated: u64,
}

impl UpsertOutcome {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.inserted + self.updated
    }

    pub(crate) fn record(&mut self, inserted: bool) {
        if inserted {
            self.inserted += 1;
        } else {
            self.updated += 1;
        }
    }
}

/// Read/write/query contract for the product catalog.
///
/// Both backends behave identically:
///
/// - "not found" is `Ok(None)`, never an error;
/// - results come back in store-native order (ascending `product_id`,
///   compared bytewise);
/// - `create` refuses an existing identifier with [`DbError::AlreadyExists`];
/// - `upsert_batch` is one unit of work: either every row is written or none.
///
/// A backend outage surfaces as [`DbError::Unavailable`].
#[async_trait]
pub trait CatalogStore: Send + Sync + std::fmt::Debug {
    fn backend(&self) -> Backend;

    async fn get(&self, product_id: &str) -> Result<Option<Product>, DbError>;

    /// First product, in store-native order, whose business key matches.
    async fn get_by_field(&self, field: &FieldMatch) -> Result<Option<Product>, DbError>;

    async fn list(&self, filter: &ProductFilter, page: Page) -> Result<Vec<Product>, DbError>;

    /// Case-insensitive substring match against title or category.
    async fn search(&self, query: &str) -> Result<Vec<Product>, DbError>;

    /// Inserts a single product, generating an id when it is blank.
    async fn create(&self, product: Product) -> Result<Product, DbError>;

    /// Insert-or-update keyed by `product_id`. Duplicate ids within one
    /// batch collapse to the last occurrence.
    async fn upsert_batch(&self, products: Vec<Product>) -> Result<UpsertOutcome, DbError>;

    /// Merges the supplied patch fields. `Ok(None)` if the id is unknown.
    async fn update(
        &self,
        product_id: &str,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, DbError>;

    async fn count(&self) -> Result<u64, DbError>;

    /// Every product, in store-native order.
    async fn scan(&self) -> Result<Vec<Product>, DbError>;

    /// Insert-or-update analytics records keyed by record id.
    async fn record_analytics_batch(
        &self,
        records: Vec<AnalyticsRecord>,
    ) -> Result<UpsertOutcome, DbError>;

    async fn record_analytics(&self, record: AnalyticsRecord) -> Result<UpsertOutcome, DbError> {
        self.record_analytics_batch(vec![record]).await
    }

    /// Analytics records ordered by date, optionally for one product.
    async fn list_analytics(
        &self,
        product_id: Option<&str>,
    ) -> Result<Vec<AnalyticsRecord>, DbError>;

    async fn ping(&self) -> Result<(), DbError>;
}

/// Checks every product and collapses duplicate ids (last occurrence wins,
/// first-seen position kept). Runs before any write so a bad row leaves the
/// store untouched.
pub(crate) fn prepare_batch(products: Vec<Product>) -> Result<Vec<Product>, DbError> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(products.len());
    let mut batch: Vec<Product> = Vec::with_capacity(products.len());

    for product in products {
        let product = product.with_generated_id();
        product.check_invariants()?;
        if let Some(&idx) = positions.get(&product.product_id) {
            batch[idx] = product;
        } else {
            positions.insert(product.product_id.clone(), batch.len());
            batch.push(product);
        }
    }
    Ok(batch)
}

pub(crate) fn prepare_analytics(
    records: Vec<AnalyticsRecord>,
) -> Result<Vec<AnalyticsRecord>, DbError> {
    let mut positions = HashMap::with_capacity(records.len());
    let mut batch: Vec<AnalyticsRecord> = Vec::with_capacity(records.len());

    for record in records {
        record.check_invariants()?;
        if let Some(&idx) = positions.get(&record.id) {
            batch[idx] = record;
        } else {
            positions.insert(record.id, batch.len());
            batch.push(record);
        }
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn product(id: &str, price: i64) -> Product {
        Product::new(id, "Widget", "Tools", Decimal::from(price), Decimal::from(4))
    }

    #[test]
    fn prepare_batch_keeps_last_duplicate_in_first_position() {
        let batch = prepare_batch(vec![
            product("A1", 100),
            product("A2", 50),
            product("A1", 120),
        ])
        .unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].product_id, "A1");
        assert_eq!(batch[0].price, Decimal::from(120));
        assert_eq!(batch[1].product_id, "A2");
    }

    #[test]
    fn prepare_batch_rejects_invalid_rows() {
        let err = prepare_batch(vec![product("A1", 100), product("A2", -5)]).unwrap_err();
        assert!(matches!(err, DbError::Invalid(_)));
    }

    #[test]
    fn upsert_outcome_totals() {
        let mut outcome = UpsertOutcome::default();
        outcome.record(true);
        outcome.record(false);
        outcome.record(false);
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.updated, 2);
        assert_eq!(outcome.total(), 3);
    }

    #[test]
    fn backend_display() {
        assert_eq!(Backend::Postgres.to_string(), "postgres");
        assert_eq!(Backend::Memory.to_string(), "memory");
    }
}
