//! Product listing filters, pagination, and wire-level query parameter
//! parsing.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::products::Product;
use crate::validate::{parse_decimal, parse_integer, ValidationError};

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

/// Predicates for product listings. Every supplied predicate must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Exact category match.
    pub category: Option<String>,
    /// Inclusive lower bound on price.
    pub min_price: Option<Decimal>,
    /// Inclusive upper bound on price.
    pub max_price: Option<Decimal>,
    /// Inclusive lower bound on rating.
    pub min_rating: Option<Decimal>,
    /// Product has at least one analytics record at this location.
    pub location: Option<String>,
}

impl ProductFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Tests `product` against every predicate. `locations` is the set of
    /// analytics locations recorded for the product, if any.
    #[must_use]
    pub fn matches(&self, product: &Product, locations: Option<&BTreeSet<String>>) -> bool {
        if let Some(category) = &self.category {
            if product.category != *category {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        if self.min_rating.is_some_and(|min| product.rating < min) {
            return false;
        }
        if let Some(location) = &self.location {
            return locations.is_some_and(|set| set.contains(location));
        }
        true
    }
}

/// Offset pagination. Applied after filtering. Only constructible through
/// [`Page::new`] or [`Page::default`], so `limit` is always in
/// `1..=MAX_LIMIT` and `offset` is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    limit: i64,
    offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    /// Builds a page, clamping `limit` to `1..=MAX_LIMIT` and `offset` to
    /// non-negative.
    #[must_use]
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
            offset: offset.max(0),
        }
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Slices an already-filtered, ordered sequence.
    #[must_use]
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(0);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

/// Product query parameters as they arrive on the wire: every value is an
/// optional string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQueryParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub min_rating: Option<String>,
    pub location: Option<String>,
    pub q: Option<String>,
}

/// Typed form of [`ProductQueryParams`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub page: Page,
    /// Free-text search term; when present, callers search instead of list.
    pub search: Option<String>,
}

impl ProductQueryParams {
    /// Parses and coerces the raw parameters.
    ///
    /// Blank values are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidParam`] for non-numeric bounds,
    /// negative offsets, or `minPrice > maxPrice`.
    pub fn parse(&self) -> Result<ProductQuery, ValidationError> {
        let limit = int_param("limit", self.limit.as_deref())?.unwrap_or(DEFAULT_LIMIT);
        let offset = int_param("offset", self.offset.as_deref())?.unwrap_or(0);
        if offset < 0 {
            return Err(ValidationError::InvalidParam {
                param: "offset",
                reason: "must be non-negative".to_string(),
            });
        }

        let filter = ProductFilter {
            category: text_param(self.category.as_deref()),
            min_price: decimal_param("minPrice", self.min_price.as_deref())?,
            max_price: decimal_param("maxPrice", self.max_price.as_deref())?,
            min_rating: decimal_param("minRating", self.min_rating.as_deref())?,
            location: text_param(self.location.as_deref()),
        };
        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
            if min > max {
                return Err(ValidationError::InvalidParam {
                    param: "minPrice",
                    reason: format!("{min} exceeds maxPrice {max}"),
                });
            }
        }

        Ok(ProductQuery {
            filter,
            page: Page::new(limit, offset),
            search: text_param(self.q.as_deref()),
        })
    }
}

fn text_param(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn int_param(param: &'static str, value: Option<&str>) -> Result<Option<i64>, ValidationError> {
    text_param(value)
        .map(|v| {
            parse_integer(&v).ok_or_else(|| ValidationError::InvalidParam {
                param,
                reason: format!("{v:?} is not an integer"),
            })
        })
        .transpose()
}

fn decimal_param(
    param: &'static str,
    value: Option<&str>,
) -> Result<Option<Decimal>, ValidationError> {
    text_param(value)
        .map(|v| {
            parse_decimal(&v).ok_or_else(|| ValidationError::InvalidParam {
                param,
                reason: format!("{v:?} is not a number"),
            })
        })
        .transpose()
}
