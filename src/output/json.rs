//! JSON file sink

use crate::output::traits::{OutputError, OutputResult, RecordSink};
use crate::record::CanonicalRecord;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes every accepted record to one JSON array file on `finalize`
///
/// Parent directories are created as needed. Records keep the order in
/// which batches arrived.
#[derive(Debug)]
pub struct JsonFileSink {
    path: PathBuf,
    records: Vec<CanonicalRecord>,
}

impl JsonFileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            records: Vec::new(),
        }
    }

    /// Records buffered but not yet written
    pub fn pending(&self) -> usize {
        self.records.len()
    }
}

impl RecordSink for JsonFileSink {
    fn record_batch(&mut self, portal: &str, records: &[CanonicalRecord]) -> OutputResult<()> {
        tracing::debug!("Buffering {} records from {}", records.len(), portal);
        self.records.extend_from_slice(records);
        Ok(())
    }

    fn finalize(&mut self) -> OutputResult<usize> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.records)?;
        fs::write(&self.path, json).map_err(|e| {
            OutputError::Write(format!("{}: {}", self.path.display(), e))
        })?;

        tracing::info!(
            "Wrote {} records to {}",
            self.records.len(),
            self.path.display()
        );
        Ok(self.records.len())
    }
}
