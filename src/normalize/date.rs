//! Free-text date normalization

use chrono::NaiveDate;

/// Formats tried in priority order; the first that parses wins
const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%d %b %Y", "%d %B %Y"];

/// Label prefixes portals put in front of dates
const DATE_PREFIXES: &[&str] = &["Received:", "Date:"];

/// Parses a portal date string without any fallback
///
/// Known prefixes ("Received:", "Date:") are stripped first. Returns `None`
/// if no supported format matches.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let mut cleaned = text.to_string();
    for prefix in DATE_PREFIXES {
        cleaned = cleaned.replace(prefix, "");
    }
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&cleaned, format).ok())
}

/// Normalizes a portal date string, falling back to `today`
///
/// Unparseable or empty text yields `today`, since the record schema has no
/// "unknown date" value.
pub fn normalize_date(text: &str, today: NaiveDate) -> NaiveDate {
    parse_date(text).unwrap_or(today)
}
