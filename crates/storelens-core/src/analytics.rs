use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validate::ValidationError;

/// Namespace for deterministic analytics record ids.
const ANALYTICS_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2d3e_8a4b_4c5d_9e0f_a1b2_c3d4_e5f6);

/// One day of sales activity for a product at a location.
///
/// `product_id` is a soft reference: the product may not exist in the
/// catalog, and readers must tolerate that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub id: Uuid,
    pub product_id: String,
    pub date: NaiveDate,
    pub sales: i64,
    pub revenue: Decimal,
    pub views: i64,
    pub conversions: i64,
    pub location: Option<String>,
}

impl AnalyticsRecord {
    /// Stable id for a `(product, date, location)` triple.
    #[must_use]
    pub fn derive_id(product_id: &str, date: NaiveDate, location: Option<&str>) -> Uuid {
        let key = format!("{product_id}|{date}|{}", location.unwrap_or_default());
        Uuid::new_v5(&ANALYTICS_NAMESPACE, key.as_bytes())
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfRange`] for negative counters or
    /// revenue, and [`ValidationError::MissingField`] for a blank product id.
    pub fn check_invariants(&self) -> Result<(), ValidationError> {
        if self.product_id.trim().is_empty() {
            return Err(ValidationError::MissingField("product_id"));
        }
        for (field, value) in [
            ("sales", self.sales),
            ("views", self.views),
            ("conversions", self.conversions),
        ] {
            if value < 0 {
                return Err(ValidationError::OutOfRange {
                    field,
                    reason: format!("{value} is negative"),
                });
            }
        }
        if self.revenue < Decimal::ZERO {
            return Err(ValidationError::OutOfRange {
                field: "revenue",
                reason: format!("{} is negative", self.revenue),
            });
        }
        Ok(())
    }
}
