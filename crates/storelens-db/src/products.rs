//! Database operations for the `products` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use storelens_core::{FieldMatch, Page, Product, ProductFilter, ProductPatch};

use crate::store::UpsertOutcome;
use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub product_id: String,
    pub title: String,
    pub category: String,
    pub price: Decimal,
    pub rating: Decimal,
    pub review_count: i64,
    pub is_available: bool,
    pub competitor_price: Option<Decimal>,
    pub is_promoted: bool,
    pub estimated_demand: i64,
    pub cost_price: Option<Decimal>,
    pub profit_margin: Decimal,
    pub event_name: Option<String>,
    pub event_impact_score: Option<Decimal>,
    pub ad_spend: Option<Decimal>,
    pub market_share: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            product_id: row.product_id,
            title: row.title,
            category: row.category,
            price: row.price,
            rating: row.rating,
            review_count: row.review_count,
            is_available: row.is_available,
            competitor_price: row.competitor_price,
            is_promoted: row.is_promoted,
            estimated_demand: row.estimated_demand,
            cost_price: row.cost_price,
            profit_margin: row.profit_margin,
            event_name: row.event_name,
            event_impact_score: row.event_impact_score,
            ad_spend: row.ad_spend,
            market_share: row.market_share,
        }
    }
}

const PRODUCT_COLUMNS: &str = "product_id, title, category, price, rating, review_count, \
     is_available, competitor_price, is_promoted, estimated_demand, cost_price, \
     profit_margin, event_name, event_impact_score, ad_spend, market_share, \
     created_at, updated_at";

// Bytewise key order, independent of the database collation, so both
// backends agree on store-native order.
const NATIVE_ORDER: &str = "ORDER BY product_id COLLATE \"C\"";

/// Inserts a product unless the key exists. Returns `(xmax = 0)`, which is
/// `true` for a fresh insert; no row comes back on conflict.
const INSERT_PRODUCT: &str = "INSERT INTO products \
         (product_id, title, category, price, rating, review_count, is_available, \
          competitor_price, is_promoted, estimated_demand, cost_price, profit_margin, \
          event_name, event_impact_score, ad_spend, market_share) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
     ON CONFLICT (product_id) DO NOTHING \
     RETURNING (xmax = 0)";

/// Insert-or-update on `product_id`. Every mutable column is overwritten.
const UPSERT_PRODUCT: &str = "INSERT INTO products \
         (product_id, title, category, price, rating, review_count, is_available, \
          competitor_price, is_promoted, estimated_demand, cost_price, profit_margin, \
          event_name, event_impact_score, ad_spend, market_share) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
     ON CONFLICT (product_id) DO UPDATE SET \
         title              = EXCLUDED.title, \
         category           = EXCLUDED.category, \
         price              = EXCLUDED.price, \
         rating             = EXCLUDED.rating, \
         review_count       = EXCLUDED.review_count, \
         is_available       = EXCLUDED.is_available, \
         competitor_price   = EXCLUDED.competitor_price, \
         is_promoted        = EXCLUDED.is_promoted, \
         estimated_demand   = EXCLUDED.estimated_demand, \
         cost_price         = EXCLUDED.cost_price, \
         profit_margin      = EXCLUDED.profit_margin, \
         event_name         = EXCLUDED.event_name, \
         event_impact_score = EXCLUDED.event_impact_score, \
         ad_spend           = EXCLUDED.ad_spend, \
         market_share       = EXCLUDED.market_share, \
         updated_at         = NOW() \
     RETURNING (xmax = 0)";

async fn write_product<'e, E>(
    executor: E,
    sql: &'static str,
    product: &Product,
) -> Result<Option<bool>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar::<_, bool>(sql)
        .bind(&product.product_id)
        .bind(&product.title)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.rating)
        .bind(product.review_count)
        .bind(product.is_available)
        .bind(product.competitor_price)
        .bind(product.is_promoted)
        .bind(product.estimated_demand)
        .bind(product.cost_price)
        .bind(product.profit_margin)
        .bind(&product.event_name)
        .bind(product.event_impact_score)
        .bind(product.ad_spend)
        .bind(product.market_share)
        .fetch_optional(executor)
        .await
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Fetches one product by identifier.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn get_product(pool: &PgPool, product_id: &str) -> Result<Option<ProductRow>, DbError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1");
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(product_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Fetches the first product, in store-native order, matching a business key.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn get_product_by_field(
    pool: &PgPool,
    field: &FieldMatch,
) -> Result<Option<ProductRow>, DbError> {
    // `column()` is a closed set of static identifiers, never user input.
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE {} = $1 {NATIVE_ORDER} LIMIT 1",
        field.column()
    );
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(field.value())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Lists products matching `filter`, paginated after filtering.
///
/// The location predicate holds when the product has at least one analytics
/// record at that location.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn list_products(
    pool: &PgPool,
    filter: &ProductFilter,
    page: Page,
) -> Result<Vec<ProductRow>, DbError> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products p \
         WHERE ($1::TEXT IS NULL OR p.category = $1) \
           AND ($2::NUMERIC IS NULL OR p.price >= $2) \
           AND ($3::NUMERIC IS NULL OR p.price <= $3) \
           AND ($4::NUMERIC IS NULL OR p.rating >= $4) \
           AND ($5::TEXT IS NULL OR EXISTS ( \
                 SELECT 1 FROM analytics_records a \
                 WHERE a.product_id = p.product_id AND a.location = $5)) \
         {NATIVE_ORDER} \
         LIMIT $6 OFFSET $7"
    );
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(filter.category.as_deref())
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.min_rating)
        .bind(filter.location.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Case-insensitive substring search over title and category.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn search_products(pool: &PgPool, query: &str) -> Result<Vec<ProductRow>, DbError> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE title ILIKE $1 OR category ILIKE $1 \
         {NATIVE_ORDER}"
    );
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(contains_pattern(query))
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Returns every product in store-native order.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn scan_products(pool: &PgPool) -> Result<Vec<ProductRow>, DbError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products {NATIVE_ORDER}");
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn count_products(pool: &PgPool) -> Result<u64, DbError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Wraps `query` in `%…%` for `ILIKE`, escaping the pattern metacharacters
/// so user input only ever matches literally.
fn contains_pattern(query: &str) -> String {
    let query = query.trim();
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a new product.
///
/// # Errors
///
/// Returns [`DbError::AlreadyExists`] if the identifier is taken, or
/// [`DbError`] if the insert fails.
pub async fn insert_product(pool: &PgPool, product: &Product) -> Result<(), DbError> {
    match write_product(pool, INSERT_PRODUCT, product).await? {
        Some(_) => Ok(()),
        None => Err(DbError::AlreadyExists(product.product_id.clone())),
    }
}

/// Upserts a batch of products inside one transaction.
///
/// Conflicts on `product_id` overwrite every mutable column and bump
/// `updated_at`. If any statement fails the whole batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError`] if any statement or the commit fails.
pub async fn upsert_products(
    pool: &PgPool,
    products: &[Product],
) -> Result<UpsertOutcome, DbError> {
    let mut tx = pool.begin().await?;
    let mut outcome = UpsertOutcome::default();

    for product in products {
        let inserted = write_product(&mut *tx, UPSERT_PRODUCT, product)
            .await?
            .unwrap_or(false);
        outcome.record(inserted);
    }

    tx.commit().await?;
    Ok(outcome)
}

/// Applies a partial update under a row lock.
///
/// Returns `Ok(None)` if the product does not exist.
///
/// # Errors
///
/// Returns [`DbError::Invalid`] if the merged record breaks an invariant, or
/// [`DbError`] if a statement fails.
pub async fn update_product(
    pool: &PgPool,
    product_id: &str,
    patch: &ProductPatch,
) -> Result<Option<Product>, DbError> {
    let mut tx = pool.begin().await?;

    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1 FOR UPDATE");
    let Some(row) = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
    else {
        return Ok(None);
    };

    let mut product = Product::from(row);
    patch.apply(&mut product);
    product.check_invariants()?;

    write_product(&mut *tx, UPSERT_PRODUCT, &product).await?;
    tx.commit().await?;

    Ok(Some(product))
}
