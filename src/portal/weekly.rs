//! Week-based query cycles
//!
//! Some portals only search by "week commencing". The entry page carries a
//! selector whose option values encode week-start dates; one full query
//! cycle runs per week overlapping the requested range.

use crate::extract::FormSnapshot;
use crate::fetch::{FetchedPage, Fetcher, PortalRequest};
use crate::portal::pager::{harvest, PageDigest};
use crate::portal::run::FetchRun;
use crate::portal::state::FetchState;
use crate::portal::DateRange;
use crate::record::RawRecord;
use crate::{PortalError, PortalResult};
use chrono::NaiveDate;
use url::Url;

/// A selectable week
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Week {
    /// Option value to submit
    pub value: String,
    pub start: NaiveDate,
}

/// Returns the weeks of a form's week selector overlapping `range`
///
/// Selector order is kept and repeated values are dropped.
pub fn select_weeks(form: &FormSnapshot, range: &DateRange) -> PortalResult<(String, Vec<Week>)> {
    let selector = form.week_selector().ok_or(PortalError::MissingWeekSelector)?;

    let mut weeks: Vec<Week> = Vec::new();
    for (value, start) in selector.week_starts() {
        if range.overlaps_week(start) && !weeks.iter().any(|w| w.value == value) {
            weeks.push(Week { value, start });
        }
    }
    Ok((selector.name.clone(), weeks))
}

/// Runs one query cycle per week on top of an already loaded entry page
///
/// * `entry` - entry page URL, re-fetched for every week after the first
/// * `weeks` - weeks to query, in order
/// * `build` - builds the query request from an entry page and a week value
/// * `digest` - parses one result page
///
/// A week whose entry page, payload or query fails is skipped with a
/// diagnostic; the remaining weeks still run.
#[allow(clippy::too_many_arguments)]
pub async fn run_weeks<B, D>(
    fetcher: &Fetcher,
    run: &mut FetchRun,
    entry: &Url,
    first_page: FetchedPage,
    weeks: &[Week],
    max_pages: u32,
    build: B,
    digest: D,
) -> Vec<RawRecord>
where
    B: Fn(&FetchedPage, &Week) -> PortalResult<PortalRequest>,
    D: Fn(&FetchedPage) -> PageDigest,
{
    let mut records = Vec::new();
    let mut entry_page = Some(first_page);

    for week in weeks {
        let page = match entry_page.take() {
            Some(page) => page,
            None => match fetcher.execute(&PortalRequest::get(entry.clone())).await {
                Ok(page) => {
                    run.advance(FetchState::SessionEstablished);
                    page
                }
                Err(e) => {
                    run.warn(format!("Week {}: entry page failed: {}", week.start, e));
                    continue;
                }
            },
        };

        let request = match build(&page, week) {
            Ok(request) => request,
            Err(e) => {
                run.warn(format!("Week {}: {}", week.start, e));
                continue;
            }
        };

        let results = match fetcher.execute(&request).await {
            Ok(results) => results,
            Err(e) => {
                run.warn(format!("Week {}: query failed: {}", week.start, e));
                continue;
            }
        };
        run.advance(FetchState::QuerySubmitted);

        let week_records = harvest(fetcher, run, results, max_pages, &digest).await;
        tracing::debug!("Week {}: {} records", week.start, week_records.len());
        records.extend(week_records);
    }

    records
}
