//! UK postcode extraction

use once_cell::sync::Lazy;
use regex::Regex;

static POSTCODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[A-Z]{1,2}\d{1,2}[A-Z]?\s*\d[A-Z]{2}").expect("valid postcode regex")
});

/// Extracts the first UK postcode found in free address text
///
/// Matching is case-insensitive; the result is upper-cased. Returns an empty
/// string when no postcode is present.
///
/// # Example
///
/// ```
/// use planning_harvester::normalize::extract_postcode;
///
/// assert_eq!(extract_postcode("123 High Street, Portsmouth, PO1 2AB"), "PO1 2AB");
/// assert_eq!(extract_postcode("No postcode here"), "");
/// ```
pub fn extract_postcode(address: &str) -> String {
    POSTCODE
        .find(address)
        .map(|m| m.as_str().to_uppercase())
        .unwrap_or_default()
}
