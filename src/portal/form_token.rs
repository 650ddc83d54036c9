//! Form-token portal backend
//!
//! Portals of this family hand out a session cookie and hidden form tokens
//! on the advanced search page; both must be echoed back when the query is
//! posted. Results are `li.searchresult` items paged by `a.next` links.
//!
//! When the advanced search fails or finds nothing, the weekly list search
//! of the same portal is tried before giving up.

use crate::extract::{find_form, next_link, search_results};
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

const SEARCH_FORM: &str = "form[name=searchCriteriaForm]";
const DEFAULT_SEARCH_PATH: &str = "search.do?action=advanced";
const DEFAULT_SEARCH_TARGET: &str = "search.do?action=firstPage";
const WEEKLY_LIST_PATH: &str = "search.do?action=weeklyList";
const WEEKLY_LIST_TARGET: &str = "weeklyListResults.do?action=firstPage";
const DATE_TYPE_FIELD: &str = "dateType";

/// Form-token (session + CSRF field) portal
pub struct FormTokenBackend {
    context: PortalContext,
    search_path: String,
}

impl FormTokenBackend {
    pub fn new(context: PortalContext, search_path: Option<String>) -> Self {
        Self {
            context,
            search_path: search_path.unwrap_or_else(|| DEFAULT_SEARCH_PATH.to_string()),
        }
    }

    /// Advanced search over the whole range in one query
    async fn advanced_search(
        &self,
        fetcher: &Fetcher,
        run: &mut FetchRun,
        range: &DateRange,
    ) -> PortalResult<Vec<RawRecord>> {
        let entry = self.context.url(&self.search_path)?;
        let page = fetcher.execute(&PortalRequest::get(entry)).await?;
        run.advance(FetchState::SessionEstablished);

        let request = search_request(&page, &self.context.base_url, range)?;
        tracing::debug!(
            "[{}] Posting search with {} fields to {}",
            self.context.name,
            request.form.len(),
            request.url
        );
        let results = fetcher.execute(&request).await?;
        run.advance(FetchState::QuerySubmitted);

        Ok(harvest(fetcher, run, results, self.context.max_pages, digest_results).await)
    }

    /// Weekly list search, one query per overlapping week
    async fn weekly_search(
        &self,
        fetcher: &Fetcher,
        run: &mut FetchRun,
        range: &DateRange,
    ) -> PortalResult<Vec<RawRecord>> {
        let entry = self.context.url(WEEKLY_LIST_PATH)?;
        let page = fetcher.execute(&PortalRequest::get(entry.clone())).await?;
        run.advance(FetchState::SessionEstablished);

        let weeks = weekly_options(&page, range)?;
        if weeks.is_empty() {
            run.info(format!(
                "No weekly list weeks overlap {} to {}",
                range.start, range.end
            ));
            return Ok(Vec::new());
        }
        run.info(format!("Searching {} weekly lists", weeks.len()));

        let base = &self.context.base_url;
        Ok(run_weeks(
            fetcher,
            run,
            &entry,
            page,
            &weeks,
            self.context.max_pages,
            |page: &FetchedPage, week: &Week| weekly_request(page, base, week),
            digest_results,
        )
        .await)
    }
}

#[async_trait]
impl PortalBackend for FormTokenBackend {
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

        match self.advanced_search(&fetcher, &mut run, range).await {
            Ok(records) if !records.is_empty() => return run.finish(records),
            Ok(_) => run.info("Advanced search returned no results, trying weekly list"),
            Err(e) => run.warn(format!("Advanced search failed ({}), trying weekly list", e)),
        }

        match self.weekly_search(&fetcher, &mut run, range).await {
            Ok(records) => run.finish(records),
            Err(e) => run.fail(&e),
        }
    }
}

/// Builds the advanced search POST from the search page
fn search_request(page: &FetchedPage, base: &Url, range: &DateRange) -> PortalResult<PortalRequest> {
    let document = Html::parse_document(&page.body);
    let form = find_form(&document, SEARCH_FORM)
        .ok_or_else(|| PortalError::MissingForm(SEARCH_FORM.to_string()))?;

    let mut state = SessionState::from(form.hidden.clone());
    state.insert("searchType", "Application");
    state.insert("caseType", "Application");
    state.insert(
        "date(applicationReceivedStart)",
        range.start.format("%d/%m/%Y").to_string(),
    );
    state.insert(
        "date(applicationReceivedEnd)",
        range.end.format("%d/%m/%Y").to_string(),
    );

    let target = resolve_action(base, form.action.as_deref(), DEFAULT_SEARCH_TARGET)?;
    Ok(PortalRequest::post(target, state.into_form()))
}

/// Reads the weekly list form and picks the weeks overlapping `range`
fn weekly_options(page: &FetchedPage, range: &DateRange) -> PortalResult<Vec<Week>> {
    let document = Html::parse_document(&page.body);
    let form = find_form(&document, SEARCH_FORM)
        .ok_or_else(|| PortalError::MissingForm(SEARCH_FORM.to_string()))?;
    select_weeks(&form, range).map(|(_, weeks)| weeks)
}

/// Builds the weekly list POST for one week
fn weekly_request(page: &FetchedPage, base: &Url, week: &Week) -> PortalResult<PortalRequest> {
    let document = Html::parse_document(&page.body);
    let form = find_form(&document, SEARCH_FORM)
        .ok_or_else(|| PortalError::MissingForm(SEARCH_FORM.to_string()))?;
    let week_field = form
        .week_selector()
        .map(|select| select.name.clone())
        .ok_or(PortalError::MissingWeekSelector)?;

    let date_type = form
        .radio(DATE_TYPE_FIELD)
        .map(|group| group.value_or("validated", "Validated"))
        .unwrap_or_else(|| "Validated".to_string());

    let mut state = SessionState::from(form.hidden.clone());
    state.insert(week_field, week.value.clone());
    state.insert(DATE_TYPE_FIELD, date_type);

    let target = resolve_action(base, form.action.as_deref(), WEEKLY_LIST_TARGET)?;
    Ok(PortalRequest::post(target, state.into_form()))
}

/// Parses one result page and its `a.next` link
fn digest_results(page: &FetchedPage) -> PageDigest {
    let document = Html::parse_document(&page.body);
    PageDigest {
        records: search_results(&document, &page.url),
        next: next_link(&document, &page.url).map(PortalRequest::get),
    }
}

/// Resolves a form action (possibly host-relative) against the portal root
fn resolve_action(base: &Url, action: Option<&str>, default: &str) -> PortalResult<Url> {
    Ok(base.join(action.unwrap_or(default))?)
}
