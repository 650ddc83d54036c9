//! Record sink trait and output errors
//!
//! The storage collaborator sits behind [`RecordSink`]: sharding and
//! de-duplication happen there, never in the harvesting core.

use crate::record::CanonicalRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for canonical records
pub trait RecordSink {
    /// Accepts the records harvested from one portal
    ///
    /// # Arguments
    ///
    /// * `portal` - Name of the portal the records came from
    /// * `records` - Normalized records in portal order
    fn record_batch(&mut self, portal: &str, records: &[CanonicalRecord]) -> OutputResult<()>;

    /// Flushes everything accepted so far
    ///
    /// # Returns
    ///
    /// The number of records written
    fn finalize(&mut self) -> OutputResult<usize>;
}
