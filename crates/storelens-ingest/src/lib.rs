//! CSV ingestion for the storelens catalog.
//!
//! Reads a product or analytics feed from any async byte stream, validates
//! each row independently, and commits the valid rows to a
//! [`storelens_db::CatalogStore`] in a single batch upsert. Re-ingesting the
//! same feed leaves the store unchanged.

pub mod error;
pub mod pipeline;

mod reader;

pub use error::IngestError;
pub use pipeline::{IngestReport, Ingestor, DEFAULT_MAX_BYTES, DEFAULT_READ_TIMEOUT};
