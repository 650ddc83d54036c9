//! Next-page affordances

use crate::extract::element_text;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Matches `__doPostBack('target','argument')` with either quote style
static POSTBACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"__doPostBack\(\s*['"]([^'"]+)['"]\s*,\s*['"]([^'"]*)['"]\s*\)"#)
        .expect("valid postback regex")
});

/// Target and argument of an ASP.NET postback call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Postback {
    pub target: String,
    pub argument: String,
}

impl Postback {
    /// Parses the first postback call found in `href`
    pub fn parse(href: &str) -> Option<Self> {
        let captures = POSTBACK.captures(href)?;
        Some(Self {
            target: captures.get(1)?.as_str().to_string(),
            argument: captures.get(2).map(|m| m.as_str()).unwrap_or_default().to_string(),
        })
    }
}

/// Finds the absolute URL of a non-disabled `a.next` link
pub fn next_link(document: &Html, page_url: &Url) -> Option<Url> {
    let selector = Selector::parse("a.next").ok()?;

    document
        .select(&selector)
        .filter(|a| !a.value().classes().any(|c| c == "disabled"))
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty() && !href.starts_with('#'))
        .and_then(|href| page_url.join(href).ok())
}

/// Finds a "next" anchor whose href encodes an ASP.NET postback
///
/// The anchor text must contain "next" (any case) or `>`.
pub fn postback_link(document: &Html) -> Option<Postback> {
    let selector = Selector::parse("a[href]").ok()?;

    document
        .select(&selector)
        .filter(|a| {
            let text = element_text(a).to_lowercase();
            text.contains("next") || text.contains('>')
        })
        .filter_map(|a| a.value().attr("href"))
        .find_map(Postback::parse)
}
