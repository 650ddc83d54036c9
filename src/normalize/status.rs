//! Status keyword classification

use crate::record::ApplicationStatus;

const PENDING: &[&str] = &["pending", "registered", "under consideration"];
const APPROVED: &[&str] = &["approved", "granted", "permitted"];
const REFUSED: &[&str] = &["refused", "rejected", "denied"];
const WITHDRAWN: &[&str] = &["withdrawn"];

/// Classifies portal status text into an `ApplicationStatus`
///
/// Keyword groups are checked in the order pending, approved, refused,
/// withdrawn. Unmatched text is kept title-cased; empty text is `Unknown`.
pub fn normalize_status(status: &str) -> ApplicationStatus {
    let trimmed = status.trim();
    if trimmed.is_empty() {
        return ApplicationStatus::Unknown;
    }

    let lower = trimmed.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if contains_any(PENDING) {
        ApplicationStatus::Pending
    } else if contains_any(APPROVED) {
        ApplicationStatus::Approved
    } else if contains_any(REFUSED) {
        ApplicationStatus::Refused
    } else if contains_any(WITHDRAWN) {
        ApplicationStatus::Withdrawn
    } else {
        ApplicationStatus::from_label(&title_case(trimmed))
    }
}

/// Upper-cases the first letter of every alphabetic run, lower-cases the rest
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
