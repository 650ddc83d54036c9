//! ASP.NET WebForms portal backend
//!
//! The whole conversation is carried in hidden `__VIEWSTATE` style fields
//! that must be re-harvested from every response and posted back. Searching
//! is done per "week commencing" option; paging is driven by
//! `__doPostBack(target, argument)` links on the results grid.

use crate::extract::{find_form_with_field, grid_rows, postback_link, FormSnapshot, Postback, RadioGroup};
use crate::fetch::{FetchedPage, Fetcher, PortalRequest};
use crate::portal::pager::{harvest, PageDigest};
use crate::portal::run::{FetchReport, FetchRun};
use crate::portal::session::{PortalContext, SessionState};
use crate::portal::state::FetchState;
use crate::portal::weekly::{run_weeks, select_weeks, Week};
use crate::portal::{DateRange, PortalBackend};
use crate::record::RawRecord;
use crate::{PortalError, PortalResult};
use async_trait::async_trait;
use scraper::Html;
use url::Url;

const DEFAULT_SEARCH_PATH: &str = "PlanningSearch.aspx";
const VIEWSTATE: &str = "__VIEWSTATE";
const EVENT_TARGET: &str = "__EVENTTARGET";
const EVENT_ARGUMENT: &str = "__EVENTARGUMENT";
const DATE_FROM_SUFFIX: &str = "txtDateReceivedFrom";
const DATE_TO_SUFFIX: &str = "txtDateReceivedTo";
const SEARCH_BUTTON_SUFFIX: &str = "btnSearch";
/// Lowercased name suffix of the date-type radio group
const DATE_TYPE_SUFFIX: &str = "datetype";

/// Hidden fields that carry ASP.NET page state
const ASPNET_STATE_FIELDS: [&str; 4] = [
    "__VIEWSTATE",
    "__VIEWSTATEGENERATOR",
    "__EVENTVALIDATION",
    "__VIEWSTATEENCRYPTED",
];

/// How the entry page lets us query
#[derive(Debug, Clone, PartialEq)]
enum SearchMode {
    /// A week selector exists; query these weeks one by one
    Weekly(Vec<Week>),
    /// Only free-text received-date fields exist; one query for the range
    DateFields,
}

/// ASP.NET ViewState/postback portal
pub struct AspNetBackend {
    context: PortalContext,
    search_path: String,
}

impl AspNetBackend {
    pub fn new(context: PortalContext, search_path: Option<String>) -> Self {
        Self {
            context,
            search_path: search_path.unwrap_or_else(|| DEFAULT_SEARCH_PATH.to_string()),
        }
    }

    async fn search(
        &self,
        fetcher: &Fetcher,
        run: &mut FetchRun,
        range: &DateRange,
    ) -> PortalResult<Vec<RawRecord>> {
        let entry = self.context.url(&self.search_path)?;
        let page = fetcher.execute(&PortalRequest::get(entry.clone())).await?;
        run.advance(FetchState::SessionEstablished);

        match search_mode(&page, range)? {
            SearchMode::Weekly(weeks) if weeks.is_empty() => {
                run.info(format!("No weeks overlap {} to {}", range.start, range.end));
                Ok(Vec::new())
            }
            SearchMode::Weekly(weeks) => {
                run.info(format!("Selected {} weeks", weeks.len()));
                Ok(run_weeks(
                    fetcher,
                    run,
                    &entry,
                    page,
                    &weeks,
                    self.context.max_pages,
                    week_request,
                    digest_grid,
                )
                .await)
            }
            SearchMode::DateFields => {
                run.info("No week selector, searching by received date");
                let request = date_request(&page, range)?;
                let results = fetcher.execute(&request).await?;
                run.advance(FetchState::QuerySubmitted);
                Ok(harvest(fetcher, run, results, self.context.max_pages, digest_grid).await)
            }
        }
    }
}

#[async_trait]
impl PortalBackend for AspNetBackend {
    fn name(&self) -> &str {
        &self.context.name
    }

    async fn fetch(&self, range: &DateRange) -> FetchReport {
        let mut run = FetchRun::new(self.context.name.clone());
        tracing::info!(
            "[{}] Fetching applications from {} to {}",
            self.context.name,
            range.start,
            range.end
        );

        let fetcher = match self.context.open_session() {
            Ok(fetcher) => fetcher,
            Err(e) => return run.fail(&e),
        };

        match self.search(&fetcher, &mut run, range).await {
            Ok(records) => run.finish(records),
            Err(e) => run.fail(&e),
        }
    }
}

fn postback_form(document: &Html) -> PortalResult<FormSnapshot> {
    find_form_with_field(document, VIEWSTATE)
        .ok_or_else(|| PortalError::MissingForm(format!("form with {}", VIEWSTATE)))
}

/// Decides between week-based and date-field searching
fn search_mode(page: &FetchedPage, range: &DateRange) -> PortalResult<SearchMode> {
    let document = Html::parse_document(&page.body);
    let form = postback_form(&document)?;

    if form.week_selector().is_some() {
        let (_, weeks) = select_weeks(&form, range)?;
        return Ok(SearchMode::Weekly(weeks));
    }

    if form.text_input_ending_with(DATE_FROM_SUFFIX).is_some()
        && form.text_input_ending_with(DATE_TO_SUFFIX).is_some()
    {
        return Ok(SearchMode::DateFields);
    }

    Err(PortalError::MissingWeekSelector)
}

/// Hidden state plus radio defaults of a postback form
///
/// Radio groups keep their checked value. An unchecked date-type group picks
/// an option mentioning "validated", falling back to the literal
/// "Validated"; any other unchecked group takes its first option.
fn form_state(form: &FormSnapshot) -> SessionState {
    let mut state = SessionState::from(form.hidden.clone());
    for group in &form.radios {
        let value = if is_date_type_group(group) {
            Some(group.value_or("validated", "Validated"))
        } else {
            group.checked.clone().or_else(|| group.values.first().cloned())
        };
        if let Some(value) = value {
            state.insert(group.name.clone(), value);
        }
    }
    state
}

/// A date-type filter is named `...DateType` or offers validated/decided options
fn is_date_type_group(group: &RadioGroup) -> bool {
    if group.name.to_lowercase().ends_with(DATE_TYPE_SUFFIX) {
        return true;
    }
    group.values.iter().any(|value| {
        let value = value.to_lowercase();
        value.contains("validated") || value.contains("decided")
    })
}

fn form_target(form: &FormSnapshot, page: &FetchedPage) -> PortalResult<Url> {
    match form.action.as_deref() {
        Some(action) => Ok(page.url.join(action)?),
        None => Ok(page.url.clone()),
    }
}

/// Builds the search POST for one week
fn week_request(page: &FetchedPage, week: &Week) -> PortalResult<PortalRequest> {
    let document = Html::parse_document(&page.body);
    let form = postback_form(&document)?;
    let selector = form
        .week_selector()
        .ok_or(PortalError::MissingWeekSelector)?;

    let mut state = form_state(&form);
    state.insert(selector.name.clone(), week.value.clone());
    if let Some((name, value)) = form
        .submit_ending_with(SEARCH_BUTTON_SUFFIX)
        .or_else(|| form.submits.first())
    {
        state.insert(name.clone(), value.clone());
    }

    Ok(PortalRequest::post(form_target(&form, page)?, state.into_form()))
}

/// Builds the single search POST for date-field mode
fn date_request(page: &FetchedPage, range: &DateRange) -> PortalResult<PortalRequest> {
    let document = Html::parse_document(&page.body);
    let form = postback_form(&document)?;

    let mut state = form_state(&form);
    if let Some(from) = form.text_input_ending_with(DATE_FROM_SUFFIX) {
        state.insert(from, range.start.format("%d/%m/%Y").to_string());
    }
    if let Some(to) = form.text_input_ending_with(DATE_TO_SUFFIX) {
        state.insert(to, range.end.format("%d/%m/%Y").to_string());
    }
    match form.submit_ending_with(SEARCH_BUTTON_SUFFIX) {
        Some((name, value)) => state.insert(name.clone(), value.clone()),
        None => {
            if let Some(from) = form.text_input_ending_with(DATE_FROM_SUFFIX) {
                let prefix = from.trim_end_matches(DATE_FROM_SUFFIX);
                state.insert(format!("{prefix}{SEARCH_BUTTON_SUFFIX}"), "Search");
            }
        }
    }

    Ok(PortalRequest::post(form_target(&form, page)?, state.into_form()))
}

/// Parses one grid page and its postback pager
fn digest_grid(page: &FetchedPage) -> PageDigest {
    let document = Html::parse_document(&page.body);
    let records = grid_rows(&document, &page.url);
    let next = postback_link(&document).and_then(|postback| {
        match postback_request(&document, page, &postback) {
            Ok(request) => Some(request),
            Err(e) => {
                tracing::warn!("Cannot follow postback {}: {}", postback.target, e);
                None
            }
        }
    });
    PageDigest { records, next }
}

/// Builds the paging POST from the current page's re-harvested state
///
/// Only the page-state fields travel with a postback; search buttons must
/// not, or the server would rerun the query.
fn postback_request(
    document: &Html,
    page: &FetchedPage,
    postback: &Postback,
) -> PortalResult<PortalRequest> {
    let form = postback_form(document)?;

    let mut state = SessionState::new();
    for name in ASPNET_STATE_FIELDS {
        if let Some(value) = form.hidden_value(name) {
            state.insert(name, value);
        }
    }
    state.insert(EVENT_TARGET, postback.target.clone());
    state.insert(EVENT_ARGUMENT, postback.argument.clone());

    Ok(PortalRequest::post(form_target(&form, page)?, state.into_form()))
}
