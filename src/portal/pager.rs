//! Result page harvesting loop
//!
//! Pages are processed strictly in server order: each next-page request is
//! derived from the page before it, so nothing is prefetched.

use crate::fetch::{FetchedPage, Fetcher, PortalRequest};
use crate::portal::run::FetchRun;
use crate::record::RawRecord;

/// What a backend extracted from one result page
#[derive(Debug, Clone, Default)]
pub struct PageDigest {
    pub records: Vec<RawRecord>,

    /// Request for the following page, if the page offers one
    pub next: Option<PortalRequest>,
}

/// Walks result pages starting from `first`, accumulating raw records
///
/// Stops when a page has no next-page affordance or after `max_pages` pages.
/// A failing next-page fetch ends the walk with what was gathered so far.
///
/// `digest` runs synchronously on each page so parsed documents never live
/// across an await point.
pub async fn harvest<F>(
    fetcher: &Fetcher,
    run: &mut FetchRun,
    first: FetchedPage,
    max_pages: u32,
    mut digest: F,
) -> Vec<RawRecord>
where
    F: FnMut(&FetchedPage) -> PageDigest,
{
    let mut records = Vec::new();
    let mut page = first;
    let mut parsed = 0u32;

    loop {
        let PageDigest {
            records: page_records,
            next,
        } = digest(&page);
        parsed += 1;
        run.page_parsed(page_records.len());
        records.extend(page_records);

        let Some(next) = next else {
            tracing::debug!("No next page after page {}", parsed);
            break;
        };

        if parsed >= max_pages {
            run.warn(format!("Reached page limit ({})", max_pages));
            break;
        }

        page = match fetcher.execute(&next).await {
            Ok(page) => page,
            Err(e) => {
                run.warn(format!("Stopping after page {}: {}", parsed, e));
                break;
            }
        };
    }

    records
}
