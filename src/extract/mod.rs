//! Markup Extractor
//!
//! Query operations over parsed portal pages:
//! - form state (hidden inputs, radio groups, selects, submit buttons)
//! - result items for each portal family
//! - next-page affordances (plain links and ASP.NET postbacks)
//!
//! Every function takes a borrowed [`scraper::Html`] and returns owned data.
//! Missing elements produce empty strings or `None`, never errors.

mod forms;
mod pagination;
mod results;

pub use forms::{find_form, find_form_with_field, FormSnapshot, RadioGroup, SelectField, SelectOption};
pub use pagination::{next_link, postback_link, Postback};
pub use results::{grid_rows, search_results};

use scraper::ElementRef;

/// Collapses all text beneath an element into single-spaced, trimmed text
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
