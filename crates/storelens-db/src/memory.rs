//! In-process catalog store.
//!
//! The catalog lives behind `RwLock<Arc<Catalog>>`. Readers clone the `Arc`
//! and release the lock immediately, so every read works on a consistent
//! snapshot and never holds up a writer for longer than a pointer copy.
//! Writers check against the current catalog under the write lock and only
//! then call `Arc::make_mut`, which copies the catalog while an older
//! snapshot is still alive. A rejected write therefore never copies. A batch
//! is applied inside one critical section, so no reader observes half of it.
//!
//! Nothing here survives process exit.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use storelens_core::{AnalyticsRecord, FieldMatch, Page, Product, ProductFilter, ProductPatch};
use uuid::Uuid;

use crate::store::{prepare_analytics, prepare_batch, Backend, CatalogStore, UpsertOutcome};
use crate::DbError;

#[derive(Debug, Clone, Default)]
struct Catalog {
    products: BTreeMap<String, Product>,
    analytics: BTreeMap<Uuid, AnalyticsRecord>,
}

impl Catalog {
    /// Locations seen in analytics, keyed by product id.
    fn locations_by_product(&self) -> BTreeMap<&str, BTreeSet<String>> {
        let mut map: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
        for record in self.analytics.values() {
            if let Some(location) = &record.location {
                map.entry(record.product_id.as_str())
                    .or_default()
                    .insert(location.clone());
            }
        }
        map
    }
}

#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    state: RwLock<Arc<Catalog>>,
}

impl MemoryCatalogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Result<Arc<Catalog>, DbError> {
        let guard = self.state.read().map_err(|_| DbError::Poisoned)?;
        Ok(Arc::clone(&guard))
    }

    /// Runs `f` against the live catalog inside the write lock. `f` reads
    /// through the `Arc` for its checks and calls `Arc::make_mut` only once it
    /// is going to mutate.
    fn write<T>(
        &self,
        f: impl FnOnce(&mut Arc<Catalog>) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let mut guard = self.state.write().map_err(|_| DbError::Poisoned)?;
        f(&mut guard)
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    fn backend(&self) -> Backend {
        Backend::Memory
    }

    async fn get(&self, product_id: &str) -> Result<Option<Product>, DbError> {
        Ok(self.snapshot()?.products.get(product_id).cloned())
    }

    async fn get_by_field(&self, field: &FieldMatch) -> Result<Option<Product>, DbError> {
        Ok(self
            .snapshot()?
            .products
            .values()
            .find(|p| field.matches(p))
            .cloned())
    }

    async fn list(&self, filter: &ProductFilter, page: Page) -> Result<Vec<Product>, DbError> {
        let catalog = self.snapshot()?;
        let locations = if filter.location.is_some() {
            catalog.locations_by_product()
        } else {
            BTreeMap::new()
        };

        let matching = catalog
            .products
            .values()
            .filter(|p| filter.matches(p, locations.get(p.product_id.as_str())))
            .cloned();
        Ok(page.apply(matching))
    }

    async fn search(&self, query: &str) -> Result<Vec<Product>, DbError> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .snapshot()?
            .products
            .values()
            .filter(|p| {
                p.title.to_lowercase().contains(&needle)
                    || p.category.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn create(&self, product: Product) -> Result<Product, DbError> {
        let product = product.with_generated_id();
        product.check_invariants()?;

        self.write(|catalog| {
            if catalog.products.contains_key(&product.product_id) {
                return Err(DbError::AlreadyExists(product.product_id.clone()));
            }
            Arc::make_mut(catalog)
                .products
                .insert(product.product_id.clone(), product.clone());
            Ok(())
        })?;

        tracing::debug!(product_id = %product.product_id, "created product");
        Ok(product)
    }

    async fn upsert_batch(&self, products: Vec<Product>) -> Result<UpsertOutcome, DbError> {
        let batch = prepare_batch(products)?;
        if batch.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let outcome = self.write(|catalog| {
            let catalog = Arc::make_mut(catalog);
            let mut outcome = UpsertOutcome::default();
            for product in batch {
                let previous = catalog.products.insert(product.product_id.clone(), product);
                outcome.record(previous.is_none());
            }
            Ok(outcome)
        })?;

        tracing::debug!(
            inserted = outcome.inserted,
            updated = outcome.updated,
            "upserted product batch"
        );
        Ok(outcome)
    }

    async fn update(
        &self,
        product_id: &str,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, DbError> {
        self.write(|catalog| {
            let Some(current) = catalog.products.get(product_id) else {
                return Ok(None);
            };
            let mut updated = current.clone();
            patch.apply(&mut updated);
            updated.check_invariants()?;

            Arc::make_mut(catalog)
                .products
                .insert(product_id.to_string(), updated.clone());
            Ok(Some(updated))
        })
    }

    async fn count(&self) -> Result<u64, DbError> {
        Ok(self.snapshot()?.products.len() as u64)
    }

    async fn scan(&self) -> Result<Vec<Product>, DbError> {
        Ok(self.snapshot()?.products.values().cloned().collect())
    }

    async fn record_analytics_batch(
        &self,
        records: Vec<AnalyticsRecord>,
    ) -> Result<UpsertOutcome, DbError> {
        let batch = prepare_analytics(records)?;
        if batch.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        self.write(|catalog| {
            let catalog = Arc::make_mut(catalog);
            let mut outcome = UpsertOutcome::default();
            for record in batch {
                let previous = catalog.analytics.insert(record.id, record);
                outcome.record(previous.is_none());
            }
            Ok(outcome)
        })
    }

    async fn list_analytics(
        &self,
        product_id: Option<&str>,
    ) -> Result<Vec<AnalyticsRecord>, DbError> {
        let catalog = self.snapshot()?;
        let mut records: Vec<AnalyticsRecord> = catalog
            .analytics
            .values()
            .filter(|r| product_id.is_none_or(|id| r.product_id == id))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            (a.date, &a.product_id, a.id).cmp(&(b.date, &b.product_id, b.id))
        });
        Ok(records)
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.snapshot().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn widget(id: &str) -> Product {
        Product::new(id, "Widget", "Tools", Decimal::from(10), Decimal::from(4))
    }

    #[tokio::test]
    async fn rejected_writes_keep_the_current_catalog() {
        let store = MemoryCatalogStore::new();
        store
            .upsert_batch(vec![widget("A1")])
            .await
            .expect("upsert failed");
        let before = store.snapshot().expect("snapshot failed");

        let missing = store
            .update("missing", &ProductPatch::default())
            .await
            .expect("update failed");
        assert!(missing.is_none());
        let duplicate = store.create(widget("A1")).await;
        assert!(matches!(duplicate, Err(DbError::AlreadyExists(_))));
        store.upsert_batch(Vec::new()).await.expect("upsert failed");

        let after = store.snapshot().expect("snapshot failed");
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn writes_leave_live_snapshots_untouched() {
        let store = MemoryCatalogStore::new();
        let empty = store.snapshot().expect("snapshot failed");

        store
            .upsert_batch(vec![widget("A1")])
            .await
            .expect("upsert failed");

        assert!(empty.products.is_empty());
        assert_eq!(store.snapshot().expect("snapshot failed").products.len(), 1);
    }
}
