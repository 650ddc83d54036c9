//! Run statistics
//!
//! Built from the fetch reports of one run and printed at the end of it.

use crate::portal::{FetchReport, FetchState};
use crate::record::CanonicalRecord;
use std::collections::HashMap;

/// Outcome of one portal within a run
#[derive(Debug, Clone)]
pub struct PortalOutcome {
    pub portal: String,
    pub state: FetchState,
    pub records: usize,
    pub pages: u32,
    pub rejected: usize,
    pub warnings: usize,
}

impl From<&FetchReport> for PortalOutcome {
    fn from(report: &FetchReport) -> Self {
        Self {
            portal: report.portal.clone(),
            state: report.state,
            records: report.records.len(),
            pages: report.pages,
            rejected: report.rejected,
            warnings: report.warning_count(),
        }
    }
}

/// Summary statistics for a harvesting run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub config_hash: String,
    pub portals: Vec<PortalOutcome>,

    /// Record counts by status label
    pub status_breakdown: HashMap<String, usize>,

    /// Records carrying a postcode
    pub with_postcode: usize,

    /// Records already carrying coordinates
    pub geocoded: usize,

    /// Records an enrichment step should look up by postcode
    pub awaiting_geocoding: usize,
}

impl RunSummary {
    pub fn new(config_hash: impl Into<String>) -> Self {
        Self {
            config_hash: config_hash.into(),
            ..Self::default()
        }
    }

    /// Adds one portal's report
    pub fn record(&mut self, report: &FetchReport) {
        self.portals.push(PortalOutcome::from(report));
        for record in &report.records {
            self.count_record(record);
        }
    }

    fn count_record(&mut self, record: &CanonicalRecord) {
        *self
            .status_breakdown
            .entry(record.status.as_str().to_string())
            .or_insert(0) += 1;
        if !record.postcode.is_empty() {
            self.with_postcode += 1;
        }
        if record.lat != 0.0 || record.lng != 0.0 {
            self.geocoded += 1;
        }
        if record.needs_geocoding() {
            self.awaiting_geocoding += 1;
        }
    }

    pub fn total_records(&self) -> usize {
        self.portals.iter().map(|p| p.records).sum()
    }

    pub fn failed_portals(&self) -> usize {
        self.portals
            .iter()
            .filter(|p| p.state == FetchState::Failed)
            .count()
    }

    /// Percentage of portals that completed
    pub fn success_rate(&self) -> f64 {
        if self.portals.is_empty() {
            return 0.0;
        }
        let done = self.portals.len() - self.failed_portals();
        (done as f64 / self.portals.len() as f64) * 100.0
    }
}

/// Prints the run summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Portals:");
    for outcome in &summary.portals {
        println!(
            "  {}: {} records, {} pages, {} ({} warnings, {} rejected)",
            outcome.portal,
            outcome.records,
            outcome.pages,
            outcome.state,
            outcome.warnings,
            outcome.rejected
        );
    }
    println!();

    if !summary.status_breakdown.is_empty() {
        println!("Records by Status:");
        let mut counts: Vec<_> = summary.status_breakdown.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (status, count) in counts {
            println!("  {}: {}", status, count);
        }
        println!();
    }

    let total = summary.total_records();
    println!("Total records: {}", total);
    println!("  With postcode: {}", summary.with_postcode);
    println!("  Awaiting geocoding: {}", summary.awaiting_geocoding);
    println!(
        "Portal success rate: {:.1}% ({} failed)",
        summary.success_rate(),
        summary.failed_portals()
    );
}
