//! CSV ingestion orchestration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use storelens_core::{validate, validate_analytics, AppConfig, RawRecord, ValidationError};
use storelens_db::CatalogStore;
use tokio::io::AsyncRead;

use crate::error::IngestError;
use crate::reader::read_bounded;

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_BYTES: usize = 64 * 1024 * 1024;

/// Summary of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Rows that passed validation, duplicates included.
    pub accepted: usize,
    /// Rows rejected by validation and skipped.
    pub rejected: usize,
    /// Distinct keys that were new to the store.
    pub inserted: u64,
    /// Distinct keys that already existed and were overwritten.
    pub updated: u64,
}

/// Streams CSV rows into a catalog store.
///
/// Every run validates row by row, logs and skips the rows that fail, and
/// commits the survivors with exactly one batch upsert after the stream
/// ends. A stream or framing error aborts the run with nothing committed.
#[derive(Debug, Clone)]
pub struct Ingestor {
    store: Arc<dyn CatalogStore>,
    read_timeout: Duration,
    max_bytes: usize,
}

impl Ingestor {
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    #[must_use]
    pub fn from_app_config(store: Arc<dyn CatalogStore>, config: &AppConfig) -> Self {
        Self::new(store)
            .with_read_timeout(Duration::from_secs(config.ingest_read_timeout_secs))
            .with_max_bytes(config.ingest_max_bytes)
    }

    /// Upper bound on how long a single read may wait for data.
    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Ingests a product CSV and returns the number of rows that passed
    /// validation.
    ///
    /// # Errors
    ///
    /// See [`Ingestor::ingest_report`].
    pub async fn ingest<R>(&self, reader: R) -> Result<usize, IngestError>
    where
        R: AsyncRead + Unpin,
    {
        Ok(self.ingest_report(reader).await?.accepted)
    }

    /// Ingests a product CSV and returns the full run summary.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Io`], [`IngestError::Timeout`],
    /// [`IngestError::TooLarge`] or [`IngestError::Csv`] if the stream cannot
    /// be read, and [`IngestError::Store`] if the final commit fails.
    pub async fn ingest_report<R>(&self, reader: R) -> Result<IngestReport, IngestError>
    where
        R: AsyncRead + Unpin,
    {
        let bytes = read_bounded(reader, self.read_timeout, self.max_bytes).await?;
        let parsed = parse_rows(&bytes, "product", validate)?;

        let accepted = parsed.valid.len();
        let outcome = self.store.upsert_batch(parsed.valid).await?;
        let report = IngestReport {
            accepted,
            rejected: parsed.rejected,
            inserted: outcome.inserted,
            updated: outcome.updated,
        };

        tracing::info!(
            backend = %self.store.backend(),
            accepted = report.accepted,
            rejected = report.rejected,
            inserted = report.inserted,
            updated = report.updated,
            "product ingestion complete"
        );
        Ok(report)
    }

    /// # Errors
    ///
    /// Returns [`IngestError::Io`] if the file cannot be opened, otherwise as
    /// [`Ingestor::ingest_report`].
    pub async fn ingest_path(&self, path: impl AsRef<Path>) -> Result<IngestReport, IngestError> {
        let file = tokio::fs::File::open(path.as_ref()).await?;
        self.ingest_report(file).await
    }

    /// Ingests an analytics CSV (`product_id`, `date`, `sales`, `revenue`,
    /// `views`, `conversions`, `location`).
    ///
    /// # Errors
    ///
    /// As [`Ingestor::ingest_report`].
    pub async fn ingest_analytics<R>(&self, reader: R) -> Result<IngestReport, IngestError>
    where
        R: AsyncRead + Unpin,
    {
        let bytes = read_bounded(reader, self.read_timeout, self.max_bytes).await?;
        let parsed = parse_rows(&bytes, "analytics", validate_analytics)?;

        let accepted = parsed.valid.len();
        let outcome = self.store.record_analytics_batch(parsed.valid).await?;
        let report = IngestReport {
            accepted,
            rejected: parsed.rejected,
            inserted: outcome.inserted,
            updated: outcome.updated,
        };

        tracing::info!(
            backend = %self.store.backend(),
            accepted = report.accepted,
            rejected = report.rejected,
            inserted = report.inserted,
            updated = report.updated,
            "analytics ingestion complete"
        );
        Ok(report)
    }

    /// # Errors
    ///
    /// As [`Ingestor::ingest_path`].
    pub async fn ingest_analytics_path(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<IngestReport, IngestError> {
        let file = tokio::fs::File::open(path.as_ref()).await?;
        self.ingest_analytics(file).await
    }
}

struct Parsed<T> {
    valid: Vec<T>,
    rejected: usize,
}

/// Parses header-named CSV rows and validates each one. Columns are matched
/// by name, so their order is irrelevant and unknown columns are ignored.
fn parse_rows<T>(
    bytes: &[u8],
    kind: &'static str,
    validate: impl Fn(&RawRecord) -> Result<T, ValidationError>,
) -> Result<Parsed<T>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut parsed = Parsed {
        valid: Vec::new(),
        rejected: 0,
    };
    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record)? {
        let raw = RawRecord::from_row(headers.iter(), record.iter());
        match validate(&raw) {
            Ok(row) => parsed.valid.push(row),
            Err(e) => {
                parsed.rejected += 1;
                tracing::warn!(
                    kind,
                    line = record.position().map_or(0, csv::Position::line),
                    row = %record.iter().collect::<Vec<_>>().join(","),
                    error = %e,
                    "rejected row"
                );
            }
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rows_skips_invalid_and_keeps_order() {
        let csv = "product_id,title,category,price,rating\n\
                   A1,Widget,Tools,100,4\n\
                   A2,Gadget,Tools,-1,4\n\
                   A3,Gizmo,Tools,5,3\n";
        let parsed = parse_rows(csv.as_bytes(), "product", validate).unwrap();

        let ids: Vec<&str> = parsed.valid.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(ids, ["A1", "A3"]);
        assert_eq!(parsed.rejected, 1);
    }

    #[test]
    fn parse_rows_matches_columns_by_name() {
        let csv = "Rating,Price,Category,Name,ID,unused\n4.5,20,Garden,Hose,H1,x\n";
        let parsed = parse_rows(csv.as_bytes(), "product", validate).unwrap();

        assert_eq!(parsed.valid.len(), 1);
        assert_eq!(parsed.valid[0].product_id, "H1");
        assert_eq!(parsed.valid[0].title, "Hose");
    }

    #[test]
    fn parse_rows_strips_byte_order_mark() {
        let csv = "\u{feff}product_id,title,category,price,rating\nA1,Widget,Tools,1,1\n";
        let parsed = parse_rows(csv.as_bytes(), "product", validate).unwrap();
        assert_eq!(parsed.valid.len(), 1);
    }

    #[test]
    fn parse_rows_tolerates_short_rows() {
        let csv = "product_id,title,category,price,rating,is_promoted\nA1,Widget,Tools,1,1\n";
        let parsed = parse_rows(csv.as_bytes(), "product", validate).unwrap();
        assert_eq!(parsed.valid.len(), 1);
        assert!(!parsed.valid[0].is_promoted);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let parsed = parse_rows(b"", "product", validate).unwrap();
        assert!(parsed.valid.is_empty());
        assert_eq!(parsed.rejected, 0);
    }

    #[test]
    fn invalid_utf8_is_a_framing_error() {
        let mut bytes = b"product_id,title,category,price,rating\nA1,".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b",Tools,1,1\n");
        assert!(parse_rows(&bytes, "product", validate).is_err());
    }
}
