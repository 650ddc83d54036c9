//! Result item extraction
//!
//! Each portal family lays out its results differently; the selectors here
//! match the markup those portals actually serve.

use crate::extract::element_text;
use crate::record::RawRecord;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Parses form-token search results (`li.searchresult`)
///
/// Items without a link are skipped; the rest of the page still parses.
pub fn search_results(document: &Html, page_url: &Url) -> Vec<RawRecord> {
    let Ok(items) = Selector::parse("li.searchresult") else {
        return Vec::new();
    };

    document
        .select(&items)
        .filter_map(|item| {
            let record = search_result(&item, page_url);
            if record.is_none() {
                tracing::debug!("Skipping search result without a link");
            }
            record
        })
        .collect()
}

fn search_result(item: &ElementRef<'_>, page_url: &Url) -> Option<RawRecord> {
    let anchor = first(item, "a")?;
    let link_text = element_text(&anchor);
    let (head, tail) = match link_text.split_once('|') {
        Some((head, tail)) => (head.trim().to_string(), tail.trim().to_string()),
        None => (link_text.clone(), String::new()),
    };

    // With a separate case number the link text is the proposal itself.
    let (reference, fallback_description) = match text_of(item, "span.caseNumber") {
        Some(case_number) if tail.is_empty() => (case_number, link_text),
        Some(case_number) => (case_number, tail),
        None => (head, tail),
    };
    let description = text_of(item, "p.description")
        .filter(|d| !d.is_empty())
        .unwrap_or(fallback_description);

    Some(RawRecord {
        reference,
        description,
        address: text_of(item, "p.address").unwrap_or_default(),
        postcode: None,
        status: text_of(item, "span.status").unwrap_or_else(|| "Unknown".to_string()),
        date_text: text_of(item, "span.date").unwrap_or_default(),
        link: resolve_link(&anchor, page_url),
        lat: 0.0,
        lng: 0.0,
    })
}

/// Parses ASP.NET grid results (`table.rgMasterTable` rows)
///
/// Cells are read positionally: reference, address, description, date
/// received, status. Rows with fewer than five cells are skipped.
pub fn grid_rows(document: &Html, page_url: &Url) -> Vec<RawRecord> {
    let (Ok(rows), Ok(cells)) = (
        Selector::parse("table.rgMasterTable tr.rgRow, table.rgMasterTable tr.rgAltRow"),
        Selector::parse("td"),
    ) else {
        return Vec::new();
    };

    let mut records = Vec::new();
    for row in document.select(&rows) {
        let cells: Vec<ElementRef<'_>> = row.select(&cells).collect();
        if cells.len() < 5 {
            tracing::debug!("Skipping grid row with {} cells", cells.len());
            continue;
        }

        let link = first(&cells[0], "a")
            .map(|a| resolve_link(&a, page_url))
            .unwrap_or_default();

        records.push(RawRecord {
            reference: element_text(&cells[0]),
            address: element_text(&cells[1]),
            description: element_text(&cells[2]),
            date_text: element_text(&cells[3]),
            status: element_text(&cells[4]),
            postcode: None,
            link,
            lat: 0.0,
            lng: 0.0,
        });
    }
    records
}

fn first<'a>(element: &ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    element.select(&selector).next()
}

fn text_of(element: &ElementRef<'_>, selector: &str) -> Option<String> {
    first(element, selector).map(|e| element_text(&e))
}

/// Resolves an anchor's href against the page URL, or returns empty
fn resolve_link(anchor: &ElementRef<'_>, page_url: &Url) -> String {
    anchor
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|href| !href.is_empty() && !href.starts_with("javascript:"))
        .and_then(|href| page_url.join(href).ok())
        .map(|url| url.to_string())
        .unwrap_or_default()
}
