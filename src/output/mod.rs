//! Output module for harvested records
//!
//! This module handles:
//! - Handing canonical records to the storage collaborator
//! - Writing records as a JSON array
//! - Recording run statistics

mod json;
pub mod stats;
mod traits;

pub use json::JsonFileSink;
pub use stats::{print_summary, PortalOutcome, RunSummary};
pub use traits::{OutputError, OutputResult, RecordSink};
