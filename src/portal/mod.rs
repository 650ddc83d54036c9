//! Portal backends
//!
//! Each portal family implements [`PortalBackend`]. A backend holds only
//! immutable configuration plus its own rate limiter; all session state is
//! local to a single `fetch` call.

mod aspnet;
mod form_token;
mod pager;
mod rest_api;
mod run;
mod session;
mod state;
mod weekly;

pub use aspnet::AspNetBackend;
pub use form_token::FormTokenBackend;
pub use pager::{harvest, PageDigest};
pub use rest_api::RestApiBackend;
pub use run::{Diagnostic, DiagnosticLevel, FetchReport, FetchRun};
pub use session::{PortalContext, SessionState};
pub use state::FetchState;
pub use weekly::{run_weeks, select_weeks, Week};

use crate::config::{HttpConfig, PortalConfig, PortalKind};
use crate::fetch::RateLimiter;
use crate::record::CanonicalRecord;
use crate::ConfigError;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

/// Inclusive calendar date range
///
/// `end >= start` is assumed, not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days`-day window ending on `today`
    pub fn last_days(days: u32, today: NaiveDate) -> Self {
        Self {
            start: today - Duration::days(i64::from(days)),
            end: today,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Returns true if the 7-day week starting on `week_start` overlaps
    pub fn overlaps_week(&self, week_start: NaiveDate) -> bool {
        week_start <= self.end && week_start + Duration::days(6) >= self.start
    }
}

/// A portal family's retrieval protocol
#[async_trait]
pub trait PortalBackend: Send + Sync {
    /// Portal name used in logs and reports
    fn name(&self) -> &str;

    /// Retrieves and normalizes applications received within `range`
    ///
    /// Never fails: protocol errors end the fetch in [`FetchState::Failed`]
    /// with an empty record list and a diagnostic.
    async fn fetch(&self, range: &DateRange) -> FetchReport;

    /// Convenience entry point returning only the records
    async fn fetch_applications(&self, start: NaiveDate, end: NaiveDate) -> Vec<CanonicalRecord> {
        self.fetch(&DateRange::new(start, end)).await.records
    }
}

/// Builds the backend for one configured portal
///
/// # Arguments
///
/// * `portal` - The portal entry
/// * `http` - Shared HTTP identification and timeouts
///
/// # Returns
///
/// * `Ok(Box<dyn PortalBackend>)` - Backend with its own rate limiter
/// * `Err(ConfigError)` - The entry cannot be turned into a backend
pub fn build_backend(
    portal: &PortalConfig,
    http: &HttpConfig,
) -> Result<Box<dyn PortalBackend>, ConfigError> {
    let limits = portal.effective_rate_limit();
    let limiter = RateLimiter::new(limits.rate, limits.burst)?;

    let context = PortalContext::new(
        portal.name.clone(),
        &portal.base_url,
        http.clone(),
        portal.retry.to_policy(),
        limiter,
        portal.max_pages,
    )
    .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", portal.base_url, e)))?;

    let search_path = portal.search_path.clone();
    let backend: Box<dyn PortalBackend> = match portal.kind {
        PortalKind::FormToken => Box::new(FormTokenBackend::new(context, search_path)),
        PortalKind::Aspnet => Box::new(AspNetBackend::new(context, search_path)),
        PortalKind::RestApi => Box::new(RestApiBackend::new(context, portal.organisation_entity)),
    };

    tracing::debug!(
        "Built {} backend for {} (rate {}/s, burst {})",
        portal.kind.as_str(),
        portal.name,
        limits.rate,
        limits.burst
    );
    Ok(backend)
}
