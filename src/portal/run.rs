//! Per-fetch bookkeeping and the diagnostic channel

use crate::portal::state::FetchState;
use crate::normalize::Normalizer;
use crate::record::{CanonicalRecord, RawRecord};
use crate::PortalError;

/// Severity of a diagnostic event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticLevel {
    Info,
    Warn,
    Error,
}

/// One anomaly observed during a fetch
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
}

/// Outcome of one `PortalBackend::fetch` call
///
/// A failed fetch carries no records; the orchestrator treats it as
/// "zero records, continue".
#[derive(Debug, Clone)]
pub struct FetchReport {
    /// Portal name
    pub portal: String,

    /// Normalized records in server page order
    pub records: Vec<CanonicalRecord>,

    /// Terminal state, `Done` or `Failed`
    pub state: FetchState,

    /// Result pages parsed
    pub pages: u32,

    /// Raw records discarded by the normalizer
    pub rejected: usize,

    pub diagnostics: Vec<Diagnostic>,
}

impl FetchReport {
    pub fn is_failed(&self) -> bool {
        self.state == FetchState::Failed
    }

    /// Number of diagnostics at or above `Warn`
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.level != DiagnosticLevel::Info)
            .count()
    }
}

/// Mutable state of a single fetch, local to that call
#[derive(Debug)]
pub struct FetchRun {
    portal: String,
    state: FetchState,
    pages: u32,
    diagnostics: Vec<Diagnostic>,
}

impl FetchRun {
    pub fn new(portal: impl Into<String>) -> Self {
        Self {
            portal: portal.into(),
            state: FetchState::Init,
            pages: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Moves to `next`, logging any transition the state machine does not allow
    pub fn advance(&mut self, next: FetchState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                "[{}] Unexpected state transition {} -> {}",
                self.portal,
                self.state,
                next
            );
        }
        tracing::trace!("[{}] {} -> {}", self.portal, self.state, next);
        self.state = next;
    }

    /// Records one parsed result page
    pub fn page_parsed(&mut self, records: usize) {
        self.pages += 1;
        self.advance(FetchState::PageParsed);
        tracing::info!(
            "[{}] Parsed page {} ({} results)",
            self.portal,
            self.pages,
            records
        );
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("[{}] {}", self.portal, message);
        self.push(DiagnosticLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("[{}] {}", self.portal, message);
        self.push(DiagnosticLevel::Warn, message);
    }

    fn push(&mut self, level: DiagnosticLevel, message: String) {
        self.diagnostics.push(Diagnostic { level, message });
    }

    /// Ends the fetch as `Failed` with no records
    pub fn fail(mut self, error: &PortalError) -> FetchReport {
        let message = format!("Fetch failed in state {}: {}", self.state, error);
        tracing::error!("[{}] {}", self.portal, message);
        self.push(DiagnosticLevel::Error, message);
        self.state = FetchState::Failed;
        self.into_report(Vec::new(), 0)
    }

    /// Ends the fetch as `Done`, normalizing what was harvested
    pub fn finish(self, raws: Vec<RawRecord>) -> FetchReport {
        self.finish_with(raws, &Normalizer::new())
    }

    pub(crate) fn finish_with(mut self, raws: Vec<RawRecord>, normalizer: &Normalizer) -> FetchReport {
        let harvested = raws.len();
        let records = normalizer.normalize_all(raws);
        let rejected = harvested - records.len();
        if rejected > 0 {
            self.warn(format!("Discarded {} records without a reference", rejected));
        }

        self.advance(FetchState::Done);
        tracing::info!(
            "[{}] Fetch complete: {} records from {} pages",
            self.portal,
            records.len(),
            self.pages
        );
        self.into_report(records, rejected)
    }

    fn into_report(self, records: Vec<CanonicalRecord>, rejected: usize) -> FetchReport {
        FetchReport {
            portal: self.portal,
            records,
            state: self.state,
            pages: self.pages,
            rejected,
            diagnostics: self.diagnostics,
        }
    }
}
