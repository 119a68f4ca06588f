pub mod analytics;
pub mod app_config;
pub mod config;
pub mod products;
pub mod query;
pub mod validate;

pub use analytics::AnalyticsRecord;
pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{FieldMatch, Product, ProductPatch};
pub use query::{Page, ProductFilter, ProductQuery, ProductQueryParams};
pub use validate::{validate, validate_analytics, validate_new, RawRecord, ValidationError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
