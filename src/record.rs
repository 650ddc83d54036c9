//! Application record definitions
//!
//! `RawRecord` is what a backend scrapes off a portal page; `CanonicalRecord`
//! is the uniform shape every backend produces after normalization.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A record exactly as harvested from a portal, before normalization
///
/// All fields are free text; missing markup yields empty strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    /// Portal reference (e.g. "23/00001/FUL")
    pub reference: String,

    pub description: String,

    pub address: String,

    /// Postcode if the portal supplies one directly, otherwise extracted later
    pub postcode: Option<String>,

    /// Status text as displayed by the portal
    pub status: String,

    /// Date text as displayed by the portal
    pub date_text: String,

    /// Absolute link to the source record, or empty
    pub link: String,

    /// Coordinates when the portal publishes them (`0.0` otherwise)
    pub lat: f64,
    pub lng: f64,
}

/// Normalized application status
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Refused,
    Withdrawn,
    Unknown,
    /// Unmapped portal status, title-cased verbatim
    Other(String),
}

impl ApplicationStatus {
    /// Returns the display label for this status
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Refused => "Refused",
            Self::Withdrawn => "Withdrawn",
            Self::Unknown => "Unknown",
            Self::Other(label) => label,
        }
    }

    /// Parses a stored label back into a status
    ///
    /// Known labels map to their variant; anything else is kept verbatim.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Pending" => Self::Pending,
            "Approved" => Self::Approved,
            "Refused" => Self::Refused,
            "Withdrawn" => Self::Withdrawn,
            "" | "Unknown" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ApplicationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ApplicationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

/// The canonical planning application record
///
/// `lat == 0.0 && lng == 0.0` means the record has not been geocoded yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Portal reference, unique within a portal for one scrape; never empty
    pub id: String,

    /// Free text, at most 500 characters
    #[serde(rename = "desc")]
    pub description: String,

    #[serde(rename = "addr")]
    pub address: String,

    /// Upper-cased UK postcode, or empty
    pub postcode: String,

    pub status: ApplicationStatus,

    pub date_received: NaiveDate,

    /// Absolute URL of the source record, or empty
    pub link: String,

    pub lat: f64,
    pub lng: f64,
}

impl CanonicalRecord {
    /// Returns true if an enrichment step should look this record up by postcode
    pub fn needs_geocoding(&self) -> bool {
        !self.postcode.is_empty() && self.lat == 0.0 && self.lng == 0.0
    }
}
