use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::validate::ValidationError;

/// Upper bound of the customer rating scale.
pub const MAX_RATING: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// A catalog product, as owned by the catalog store.
///
/// Money fields are exact decimals. `profit_margin` is a percentage
/// (`20` means 20%), while `market_share` is a fraction in `0..=1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique key, supplied by the feed or generated on create.
    pub product_id: String,
    pub title: String,
    /// Free-text classification; not a closed set.
    pub category: String,
    pub price: Decimal,
    /// Average customer rating on a 0–5 scale.
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
}

impl Product {
    /// Builds a product with the required attributes set and every other
    /// field at its default (`false`, `0`, or absent).
    #[must_use]
    pub fn new(
        product_id: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
        price: Decimal,
        rating: Decimal,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            title: title.into(),
            category: category.into(),
            price,
            rating,
            review_count: 0,
            is_available: false,
            competitor_price: None,
            is_promoted: false,
            estimated_demand: 0,
            cost_price: None,
            profit_margin: Decimal::ZERO,
            event_name: None,
            event_impact_score: None,
            ad_spend: None,
            market_share: None,
        }
    }

    /// Assigns a fresh UUID when `product_id` is blank.
    #[must_use]
    pub fn with_generated_id(mut self) -> Self {
        if self.product_id.trim().is_empty() {
            self.product_id = Uuid::new_v4().to_string();
        } else {
            self.product_id = self.product_id.trim().to_string();
        }
        self
    }

    /// Revenue implied by the demand estimate: `price × estimated_demand`,
    /// saturating at [`Decimal::MAX`].
    #[must_use]
    pub fn projected_revenue(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.estimated_demand))
    }

    /// Trend signal used by the trending ranking. Products without an event
    /// score rank as zero.
    #[must_use]
    pub fn trend_score(&self) -> Decimal {
        self.event_impact_score.unwrap_or(Decimal::ZERO)
    }

    /// Checks the record-level invariants of a typed product.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn check_invariants(&self) -> Result<(), ValidationError> {
        if self.product_id.trim().is_empty() {
            return Err(ValidationError::MissingField("product_id"));
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title"));
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::MissingField("category"));
        }

        non_negative("price", self.price)?;
        non_negative("profit_margin", self.profit_margin)?;
        if self.rating < Decimal::ZERO || self.rating > MAX_RATING {
            return Err(ValidationError::OutOfRange {
                field: "rating",
                reason: format!("{} is outside 0..=5", self.rating),
            });
        }
        if self.review_count < 0 {
            return Err(ValidationError::OutOfRange {
                field: "review_count",
                reason: format!("{} is negative", self.review_count),
            });
        }
        if self.estimated_demand < 0 {
            return Err(ValidationError::OutOfRange {
                field: "estimated_demand",
                reason: format!("{} is negative", self.estimated_demand),
            });
        }
        for (field, value) in [
            ("competitor_price", self.competitor_price),
            ("cost_price", self.cost_price),
            ("ad_spend", self.ad_spend),
        ] {
            if let Some(value) = value {
                non_negative(field, value)?;
            }
        }
        if let Some(share) = self.market_share {
            if share < Decimal::ZERO || share > Decimal::ONE {
                return Err(ValidationError::OutOfRange {
                    field: "market_share",
                    reason: format!("{share} is outside 0..=1"),
                });
            }
        }
        Ok(())
    }
}

fn non_negative(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value < Decimal::ZERO {
        return Err(ValidationError::OutOfRange {
            field,
            reason: format!("{value} is negative"),
        });
    }
    Ok(())
}

/// A partial update for [`Product`].
///
/// Absent fields are left untouched. For nullable attributes the outer
/// `Option` says whether the field was supplied and the inner one carries
/// the new value, so `Some(None)` clears it. In JSON, a missing key is
/// "untouched" and an explicit `null` is "clear".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub rating: Option<Decimal>,
    pub review_count: Option<i64>,
    pub is_available: Option<bool>,
    #[serde(deserialize_with = "supplied")]
    pub competitor_price: Option<Option<Decimal>>,
    pub is_promoted: Option<bool>,
    pub estimated_demand: Option<i64>,
    #[serde(deserialize_with = "supplied")]
    pub cost_price: Option<Option<Decimal>>,
    pub profit_margin: Option<Decimal>,
    #[serde(deserialize_with = "supplied")]
    pub event_name: Option<Option<String>>,
    #[serde(deserialize_with = "supplied")]
    pub event_impact_score: Option<Option<Decimal>>,
    #[serde(deserialize_with = "supplied")]
    pub ad_spend: Option<Option<Decimal>>,
    #[serde(deserialize_with = "supplied")]
    pub market_share: Option<Option<Decimal>>,
}

fn supplied<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ProductPatch {
    /// Returns `true` when no field is supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merges the supplied fields into `product`. The identifier is never
    /// touched.
    pub fn apply(&self, product: &mut Product) {
        fn set<T: Clone>(target: &mut T, value: Option<&T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut product.title, self.title.as_ref());
        set(&mut product.category, self.category.as_ref());
        set(&mut product.price, self.price.as_ref());
        set(&mut product.rating, self.rating.as_ref());
        set(&mut product.review_count, self.review_count.as_ref());
        set(&mut product.is_available, self.is_available.as_ref());
        set(&mut product.competitor_price, self.competitor_price.as_ref());
        set(&mut product.is_promoted, self.is_promoted.as_ref());
        set(&mut product.estimated_demand, self.estimated_demand.as_ref());
        set(&mut product.cost_price, self.cost_price.as_ref());
        set(&mut product.profit_margin, self.profit_margin.as_ref());
        set(&mut product.event_name, self.event_name.as_ref());
        set(
            &mut product.event_impact_score,
            self.event_impact_score.as_ref(),
        );
        set(&mut product.ad_spend, self.ad_spend.as_ref());
        set(&mut product.market_share, self.market_share.as_ref());
    }
}

/// Exact-match lookup on a business key other than the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMatch {
    Title(String),
    Category(String),
    EventName(String),
}

impl FieldMatch {
    /// Column name in the `products` table.
    #[must_use]
    pub fn column(&self) -> &'static str {
        match self {
            FieldMatch::Title(_) => "title",
            FieldMatch::Category(_) => "category",
            FieldMatch::EventName(_) => "event_name",
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            FieldMatch::Title(v) | FieldMatch::Category(v) | FieldMatch::EventName(v) => v,
        }
    }

    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            FieldMatch::Title(v) => product.title == *v,
            FieldMatch::Category(v) => product.category == *v,
            FieldMatch::EventName(v) => product.event_name.as_deref() == Some(v.as_str()),
        }
    }
}
