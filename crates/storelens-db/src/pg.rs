//! Postgres-backed catalog store.

use async_trait::async_trait;
use sqlx::PgPool;
use storelens_core::{AnalyticsRecord, FieldMatch, Page, Product, ProductFilter, ProductPatch};

use crate::store::{prepare_analytics, prepare_batch, Backend, CatalogStore, UpsertOutcome};
use crate::{analytics, products, DbError};

#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    async fn get(&self, product_id: &str) -> Result<Option<Product>, DbError> {
        Ok(products::get_product(&self.pool, product_id)
            .await?
            .map(Product::from))
    }

    async fn get_by_field(&self, field: &FieldMatch) -> Result<Option<Product>, DbError> {
        Ok(products::get_product_by_field(&self.pool, field)
            .await?
            .map(Product::from))
    }

    async fn list(&self, filter: &ProductFilter, page: Page) -> Result<Vec<Product>, DbError> {
        let rows = products::list_products(&self.pool, filter, page).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn search(&self, query: &str) -> Result<Vec<Product>, DbError> {
        let rows = products::search_products(&self.pool, query).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn create(&self, product: Product) -> Result<Product, DbError> {
        let product = product.with_generated_id();
        product.check_invariants()?;
        products::insert_product(&self.pool, &product).await?;
        tracing::debug!(product_id = %product.product_id, "created product");
        Ok(product)
    }

    async fn upsert_batch(&self, rows: Vec<Product>) -> Result<UpsertOutcome, DbError> {
        let batch = prepare_batch(rows)?;
        if batch.is_empty() {
            return Ok(UpsertOutcome::default());
        }
        let outcome = products::upsert_products(&self.pool, &batch).await?;
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
        products::update_product(&self.pool, product_id, patch).await
    }

    async fn count(&self) -> Result<u64, DbError> {
        products::count_products(&self.pool).await
    }

    async fn scan(&self) -> Result<Vec<Product>, DbError> {
        let rows = products::scan_products(&self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn record_analytics_batch(
        &self,
        records: Vec<AnalyticsRecord>,
    ) -> Result<UpsertOutcome, DbError> {
        let batch = prepare_analytics(records)?;
        if batch.is_empty() {
            return Ok(UpsertOutcome::default());
        }
        analytics::upsert_analytics(&self.pool, &batch).await
    }

    async fn list_analytics(
        &self,
        product_id: Option<&str>,
    ) -> Result<Vec<AnalyticsRecord>, DbError> {
        let rows = analytics::list_analytics(&self.pool, product_id).await?;
        Ok(rows.into_iter().map(AnalyticsRecord::from).collect())
    }

    async fn ping(&self) -> Result<(), DbError> {
        crate::ping(&self.pool).await?;
        Ok(())
    }
}
