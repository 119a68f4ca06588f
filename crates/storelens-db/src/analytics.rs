//! Database operations for `analytics_records`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use storelens_core::AnalyticsRecord;
use uuid::Uuid;

use crate::store::UpsertOutcome;
use crate::DbError;

/// A row from the `analytics_records` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalyticsRow {
    pub id: Uuid,
    pub product_id: String,
    pub date: NaiveDate,
    pub sales: i64,
    pub revenue: Decimal,
    pub views: i64,
    pub conversions: i64,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AnalyticsRow> for AnalyticsRecord {
    fn from(row: AnalyticsRow) -> Self {
        AnalyticsRecord {
            id: row.id,
            product_id: row.product_id,
            date: row.date,
            sales: row.sales,
            revenue: row.revenue,
            views: row.views,
            conversions: row.conversions,
            location: row.location,
        }
    }
}

/// Upserts analytics records by id inside one transaction.
///
/// # Errors
///
/// Returns [`DbError`] if any statement or the commit fails.
pub async fn upsert_analytics(
    pool: &PgPool,
    records: &[AnalyticsRecord],
) -> Result<UpsertOutcome, DbError> {
    let mut tx = pool.begin().await?;
    let mut outcome = UpsertOutcome::default();

    for record in records {
        let inserted: bool = sqlx::query_scalar(
            "INSERT INTO analytics_records \
                 (id, product_id, date, sales, revenue, views, conversions, location) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (id) DO UPDATE SET \
                 product_id  = EXCLUDED.product_id, \
                 date        = EXCLUDED.date, \
                 sales       = EXCLUDED.sales, \
                 revenue     = EXCLUDED.revenue, \
                 views       = EXCLUDED.views, \
                 conversions = EXCLUDED.conversions, \
                 location    = EXCLUDED.location, \
                 updated_at  = NOW() \
             RETURNING (xmax = 0)",
        )
        .bind(record.id)
        .bind(&record.product_id)
        .bind(record.date)
        .bind(record.sales)
        .bind(record.revenue)
        .bind(record.views)
        .bind(record.conversions)
        .bind(&record.location)
        .fetch_one(&mut *tx)
        .await?;
        outcome.record(inserted);
    }

    tx.commit().await?;
    Ok(outcome)
}

/// Lists analytics records ordered by date, optionally for one product.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn list_analytics(
    pool: &PgPool,
    product_id: Option<&str>,
) -> Result<Vec<AnalyticsRow>, DbError> {
    let rows = sqlx::query_as::<_, AnalyticsRow>(
        "SELECT id, product_id, date, sales, revenue, views, conversions, location, \
                created_at, updated_at \
         FROM analytics_records \
         WHERE ($1::TEXT IS NULL OR product_id = $1) \
         ORDER BY date, product_id COLLATE \"C\", id",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
