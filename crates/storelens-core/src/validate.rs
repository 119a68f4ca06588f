//! Record validation: coercion of untyped, name-keyed rows into typed
//! catalog records.
//!
//! Rows arrive from CSV feeds and API bodies with every value as text. Column
//! names are matched after normalization (trimmed, lower-cased, camelCase and
//! spaces folded to `snake_case`), and each field accepts a short list of
//! aliases. The literal `NULL` and the empty string are treated as absent.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::analytics::AnalyticsRecord;
use crate::products::Product;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not a valid number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("field `{field}` is not a valid boolean: {value:?}")]
    InvalidBoolean { field: &'static str, value: String },

    #[error("field `{field}` is not a valid date (expected YYYY-MM-DD): {value:?}")]
    InvalidDate { field: &'static str, value: String },

    #[error("field `{field}` is out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },

    #[error("invalid query parameter `{param}`: {reason}")]
    InvalidParam { param: &'static str, reason: String },
}

/// A raw, untyped row keyed by normalized column name.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record by zipping a header row with a data row. Extra values
    /// without a header are dropped; missing trailing values are absent.
    pub fn from_row<'a, H, V>(headers: H, values: V) -> Self
    where
        H: IntoIterator<Item = &'a str>,
        V: IntoIterator<Item = &'a str>,
    {
        let mut record = Self::new();
        for (header, value) in headers.into_iter().zip(values) {
            record.insert(header, value);
        }
        record
    }

    pub fn insert(&mut self, column: &str, value: impl Into<String>) {
        self.fields.insert(normalize_column(column), value.into());
    }

    /// Returns the first present, non-null value among `names`.
    #[must_use]
    pub fn get(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| {
            self.fields
                .get(*name)
                .map(|v| v.trim())
                .filter(|v| !is_null(v))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(k.as_ref(), v);
        }
        record
    }
}

fn is_null(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("null")
}

/// Folds a column header to `snake_case`: `"Profit Margin"`, `"profitMargin"`
/// and `"profit-margin"` all become `"profit_margin"`.
#[must_use]
pub fn normalize_column(column: &str) -> String {
    let column = column.trim().trim_start_matches('\u{feff}');
    let mut out = String::with_capacity(column.len() + 4);
    let mut prev_lower = false;
    for c in column.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else if c == ' ' || c == '-' || c == '_' {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

// Column aliases, canonical name first.
const PRODUCT_ID: &[&str] = &["product_id", "id"];
const TITLE: &[&str] = &["title", "name", "product_name"];
const CATEGORY: &[&str] = &["category"];
const PRICE: &[&str] = &["price"];
const RATING: &[&str] = &["rating"];
const REVIEW_COUNT: &[&str] = &["review_count", "reviews"];
const IS_AVAILABLE: &[&str] = &["is_available", "availability", "in_stock"];
const COMPETITOR_PRICE: &[&str] = &["competitor_price"];
const IS_PROMOTED: &[&str] = &["is_promoted", "promotion", "promo"];
const ESTIMATED_DEMAND: &[&str] = &["estimated_demand", "demand"];
const COST_PRICE: &[&str] = &["cost_price", "cost"];
const PROFIT_MARGIN: &[&str] = &["profit_margin", "margin"];
const EVENT_NAME: &[&str] = &["event_name", "event"];
const EVENT_IMPACT_SCORE: &[&str] = &["event_impact_score", "event_impact"];
const AD_SPEND: &[&str] = &["ad_spend"];
const MARKET_SHARE: &[&str] = &["market_share"];

const RECORD_ID: &[&str] = &["record_id", "analytics_id"];
const DATE: &[&str] = &["date"];
const SALES: &[&str] = &["sales"];
const REVENUE: &[&str] = &["revenue"];
const VIEWS: &[&str] = &["views"];
const CONVERSIONS: &[&str] = &["conversions"];
const LOCATION: &[&str] = &["location"];

/// Validates and coerces a raw row into a [`Product`].
///
/// # Errors
///
/// Returns [`ValidationError`] when a required field is absent, a value
/// cannot be coerced, or a record invariant is violated.
pub fn validate(raw: &RawRecord) -> Result<Product, ValidationError> {
    let product = Product {
        product_id: required_text(raw, PRODUCT_ID)?,
        title: required_text(raw, TITLE)?,
        category: required_text(raw, CATEGORY)?,
        price: required_decimal(raw, PRICE)?,
        rating: required_decimal(raw, RATING)?,
        review_count: optional_integer(raw, REVIEW_COUNT)?.unwrap_or(0),
        is_available: optional_bool(raw, IS_AVAILABLE)?,
        competitor_price: optional_decimal(raw, COMPETITOR_PRICE)?,
        is_promoted: optional_bool(raw, IS_PROMOTED)?,
        estimated_demand: optional_integer(raw, ESTIMATED_DEMAND)?.unwrap_or(0),
        cost_price: optional_decimal(raw, COST_PRICE)?,
        profit_margin: optional_decimal(raw, PROFIT_MARGIN)?.unwrap_or(Decimal::ZERO),
        event_name: raw.get(EVENT_NAME).map(str::to_string),
        event_impact_score: optional_decimal(raw, EVENT_IMPACT_SCORE)?,
        ad_spend: optional_decimal(raw, AD_SPEND)?,
        market_share: optional_decimal(raw, MARKET_SHARE)?,
    };
    product.check_invariants()?;
    Ok(product)
}

/// Like [`validate`], for a record that is about to be created: a missing
/// identifier is replaced with a fresh UUID instead of being rejected.
///
/// # Errors
///
/// As [`validate`].
pub fn validate_new(raw: &RawRecord) -> Result<Product, ValidationError> {
    if raw.get(PRODUCT_ID).is_some() {
        return validate(raw);
    }
    let mut raw = raw.clone();
    raw.insert(PRODUCT_ID[0], Uuid::new_v4().to_string());
    validate(&raw)
}

/// Validates and coerces a raw row into an [`AnalyticsRecord`].
///
/// Rows without an explicit `record_id` get a deterministic id derived from
/// product, date, and location, so re-ingesting the same feed replaces
/// records instead of duplicating them.
///
/// # Errors
///
/// Returns [`ValidationError`] when a required field is absent or invalid.
pub fn validate_analytics(raw: &RawRecord) -> Result<AnalyticsRecord, ValidationError> {
    let product_id = required_text(raw, PRODUCT_ID)?;
    let date = match raw.get(DATE) {
        Some(value) => {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
                ValidationError::InvalidDate {
                    field: DATE[0],
                    value: value.to_string(),
                }
            })?
        }
        None => return Err(ValidationError::MissingField(DATE[0])),
    };
    let location = raw.get(LOCATION).map(str::to_string);

    let id = match raw.get(RECORD_ID) {
        Some(value) => Uuid::parse_str(value).map_err(|_| ValidationError::OutOfRange {
            field: RECORD_ID[0],
            reason: format!("{value:?} is not a UUID"),
        })?,
        None => AnalyticsRecord::derive_id(&product_id, date, location.as_deref()),
    };

    let record = AnalyticsRecord {
        id,
        product_id,
        date,
        sales: optional_integer(raw, SALES)?.unwrap_or(0),
        revenue: optional_decimal(raw, REVENUE)?.unwrap_or(Decimal::ZERO),
        views: optional_integer(raw, VIEWS)?.unwrap_or(0),
        conversions: optional_integer(raw, CONVERSIONS)?.unwrap_or(0),
        location,
    };
    record.check_invariants()?;
    Ok(record)
}

fn required_text(raw: &RawRecord, names: &[&'static str]) -> Result<String, ValidationError> {
    raw.get(names)
        .map(str::to_string)
        .ok_or(ValidationError::MissingField(names[0]))
}

fn required_decimal(raw: &RawRecord, names: &[&'static str]) -> Result<Decimal, ValidationError> {
    optional_decimal(raw, names)?.ok_or(ValidationError::MissingField(names[0]))
}

fn optional_decimal(
    raw: &RawRecord,
    names: &[&'static str],
) -> Result<Option<Decimal>, ValidationError> {
    raw.get(names)
        .map(|value| {
            parse_decimal(value).ok_or_else(|| ValidationError::InvalidNumber {
                field: names[0],
                value: value.to_string(),
            })
        })
        .transpose()
}

fn optional_integer(
    raw: &RawRecord,
    names: &[&'static str],
) -> Result<Option<i64>, ValidationError> {
    raw.get(names)
        .map(|value| {
            parse_integer(value).ok_or_else(|| ValidationError::InvalidNumber {
                field: names[0],
                value: value.to_string(),
            })
        })
        .transpose()
}

fn optional_bool(raw: &RawRecord, names: &[&'static str]) -> Result<bool, ValidationError> {
    match raw.get(names) {
        None => Ok(false),
        Some(value) => parse_bool(value).ok_or_else(|| ValidationError::InvalidBoolean {
            field: names[0],
            value: value.to_string(),
        }),
    }
}

/// Parses a decimal, tolerating a leading `$`, thousands separators, and
/// scientific notation.
#[must_use]
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    let cleaned: String = value
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Parses an integer. Spreadsheet exports often write `12.0`, so decimals
/// with a zero fraction are accepted.
#[must_use]
pub fn parse_integer(value: &str) -> Option<i64> {
    if let Ok(n) = value.trim().parse::<i64>() {
        return Some(n);
    }
    let decimal = parse_decimal(value)?;
    if decimal.fract().is_zero() {
        decimal.to_i64()
    } else {
        None
    }
}

#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}
