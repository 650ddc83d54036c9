//! Record normalization
//!
//! Every backend funnels its raw records through [`Normalizer`], which applies
//! postcode extraction, date and status normalization, description truncation
//! and the non-empty reference rule.

mod date;
mod postcode;
mod status;

pub use date::{normalize_date, parse_date};
pub use postcode::extract_postcode;
pub use status::normalize_status;

use crate::record::{CanonicalRecord, RawRecord};
use chrono::{Local, NaiveDate};

/// Maximum number of characters kept from a description
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Converts raw portal records into canonical records
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    /// Processing date used when a portal date cannot be parsed
    today: NaiveDate,
}

impl Normalizer {
    /// Creates a normalizer whose date fallback is the current local date
    pub fn new() -> Self {
        Self::with_today(Local::now().date_naive())
    }

    /// Creates a normalizer with an explicit processing date
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Normalizes one raw record, rejecting it if its reference is empty
    pub fn normalize(&self, raw: RawRecord) -> Option<CanonicalRecord> {
        let id = raw.reference.trim().to_string();
        if id.is_empty() {
            return None;
        }

        let postcode = raw
            .postcode
            .map(|p| p.trim().to_uppercase())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| extract_postcode(&raw.address));

        Some(CanonicalRecord {
            id,
            description: truncate_chars(raw.description.trim(), MAX_DESCRIPTION_CHARS),
            address: raw.address.trim().to_string(),
            postcode,
            status: normalize_status(&raw.status),
            date_received: normalize_date(&raw.date_text, self.today),
            link: raw.link,
            lat: raw.lat,
            lng: raw.lng,
        })
    }

    /// Normalizes a batch, dropping records without a reference
    pub fn normalize_all(&self, raws: Vec<RawRecord>) -> Vec<CanonicalRecord> {
        raws.into_iter().filter_map(|raw| self.normalize(raw)).collect()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
