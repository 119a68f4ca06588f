//! Ranking views and roll-ups computed from a full store snapshot.
//!
//! The free functions are pure: same input slice, same output, including the
//! order of ties (every ranking is a stable sort over store-native order).
//! [`Aggregator`] wraps them with the store reads they need.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use storelens_core::{AnalyticsRecord, Product};

use crate::store::CatalogStore;
use crate::DbError;

/// Decimal places kept for averages.
const AVERAGE_DP: u32 = 2;
/// Decimal places kept for conversion rates.
const RATE_DP: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryPerformance {
    pub category: String,
    pub product_count: u64,
    /// Σ `estimated_demand`.
    pub sales: i64,
    /// Σ `estimated_demand × price`.
    pub revenue: Decimal,
    pub avg_profit_margin: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardMetrics {
    pub total_revenue: Decimal,
    pub total_products: u64,
    pub avg_profit_margin: Decimal,
    pub avg_rating: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub sales: i64,
    pub revenue: Decimal,
    pub views: i64,
    pub conversions: i64,
    /// `conversions / views`, or zero on a day without views.
    pub conversion_rate: Decimal,
}

/// Top `limit` products by `event_impact_score`, highest first. Products
/// without a score rank as zero.
#[must_use]
pub fn trending(products: &[Product], limit: usize) -> Vec<Product> {
    let mut ranked = products.to_vec();
    ranked.sort_by(|a, b| b.trend_score().cmp(&a.trend_score()));
    ranked.truncate(limit);
    ranked
}

/// Top `limit` products by `profit_margin`, highest first.
#[must_use]
pub fn top_margin(products: &[Product], limit: usize) -> Vec<Product> {
    let mut ranked = products.to_vec();
    ranked.sort_by(|a, b| b.profit_margin.cmp(&a.profit_margin));
    ranked.truncate(limit);
    ranked
}

/// Bottom `limit` products by `estimated_demand`, lowest first.
#[must_use]
pub fn underperforming(products: &[Product], limit: usize) -> Vec<Product> {
    let mut ranked = products.to_vec();
    ranked.sort_by_key(|p| p.estimated_demand);
    ranked.truncate(limit);
    ranked
}

/// Per-category roll-up, ordered by revenue (highest first) and then by
/// category name.
#[must_use]
pub fn category_performance(products: &[Product]) -> Vec<CategoryPerformance> {
    #[derive(Default)]
    struct Acc {
        count: u64,
        sales: i64,
        revenue: Decimal,
        margin_sum: Decimal,
    }

    let mut groups: BTreeMap<&str, Acc> = BTreeMap::new();
    for product in products {
        let acc = groups.entry(product.category.as_str()).or_default();
        acc.count += 1;
        acc.sales = acc.sales.saturating_add(product.estimated_demand);
        acc.revenue = acc.revenue.saturating_add(product.projected_revenue());
        acc.margin_sum = acc.margin_sum.saturating_add(product.profit_margin);
    }

    let mut rollup: Vec<CategoryPerformance> = groups
        .into_iter()
        .map(|(category, acc)| CategoryPerformance {
            category: category.to_string(),
            product_count: acc.count,
            sales: acc.sales,
            revenue: acc.revenue,
            avg_profit_margin: average(acc.margin_sum, acc.count),
        })
        .collect();
    rollup.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| a.category.cmp(&b.category))
    });
    rollup
}

/// Store-wide totals. `total_revenue` is the sum of recorded analytics
/// revenue when any analytics exist, and the demand projection otherwise.
#[must_use]
pub fn dashboard_metrics(products: &[Product], analytics: &[AnalyticsRecord]) -> DashboardMetrics {
    let total_revenue = if analytics.is_empty() {
        saturating_sum(products.iter().map(Product::projected_revenue))
    } else {
        saturating_sum(analytics.iter().map(|r| r.revenue))
    };
    let margin_sum = saturating_sum(products.iter().map(|p| p.profit_margin));
    let count = products.len() as u64;

    DashboardMetrics {
        total_revenue,
        total_products: count,
        avg_profit_margin: average(margin_sum, count),
        avg_rating: average(saturating_sum(products.iter().map(|p| p.rating)), count),
    }
}

/// Analytics rolled up per day, oldest first.
#[must_use]
pub fn daily_sales(records: &[AnalyticsRecord]) -> Vec<DailySales> {
    let mut days: BTreeMap<NaiveDate, DailySales> = BTreeMap::new();
    for record in records {
        let day = days.entry(record.date).or_insert_with(|| DailySales {
            date: record.date,
            sales: 0,
            revenue: Decimal::ZERO,
            views: 0,
            conversions: 0,
            conversion_rate: Decimal::ZERO,
        });
        day.sales = day.sales.saturating_add(record.sales);
        day.revenue = day.revenue.saturating_add(record.revenue);
        day.views = day.views.saturating_add(record.views);
        day.conversions = day.conversions.saturating_add(record.conversions);
    }

    days.into_values()
        .map(|mut day| {
            if day.views > 0 {
                day.conversion_rate = (Decimal::from(day.conversions) / Decimal::from(day.views))
                    .round_dp(RATE_DP);
            }
            day
        })
        .collect()
}

/// Sums without panicking; totals past the representable range stick at
/// [`Decimal::MAX`] (or [`Decimal::MIN`]).
fn saturating_sum(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    values
        .into_iter()
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

fn average(sum: Decimal, count: u64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    (sum / Decimal::from(count)).round_dp(AVERAGE_DP)
}

/// Runs the aggregation views against a live store.
#[derive(Debug, Clone)]
pub struct Aggregator {
    store: Arc<dyn CatalogStore>,
}

impl Aggregator {
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if the store scan fails.
    pub async fn trending(&self, limit: usize) -> Result<Vec<Product>, DbError> {
        Ok(trending(&self.store.scan().await?, limit))
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if the store scan fails.
    pub async fn top_margin(&self, limit: usize) -> Result<Vec<Product>, DbError> {
        Ok(top_margin(&self.store.scan().await?, limit))
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if the store scan fails.
    pub async fn underperforming(&self, limit: usize) -> Result<Vec<Product>, DbError> {
        Ok(underperforming(&self.store.scan().await?, limit))
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if the store scan fails.
    pub async fn category_performance(&self) -> Result<Vec<CategoryPerformance>, DbError> {
        Ok(category_performance(&self.store.scan().await?))
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if either store read fails.
    pub async fn dashboard(&self) -> Result<DashboardMetrics, DbError> {
        let products = self.store.scan().await?;
        let analytics = self.store.list_analytics(None).await?;
        Ok(dashboard_metrics(&products, &analytics))
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if the analytics read fails.
    pub async fn daily_sales(&self, product_id: Option<&str>) -> Result<Vec<DailySales>, DbError> {
        Ok(daily_sales(&self.store.list_analytics(product_id).await?))
    }
}
