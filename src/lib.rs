//! Planning Harvester: polite retrieval of UK planning applications
//!
//! This crate drives the stateful HTTP protocols of three council portal
//! families (form-token search, ASP.NET postback, JSON REST) and funnels what
//! they return into one canonical application record.

pub mod config;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod output;
pub mod portal;
pub mod record;

use thiserror::Error;

/// Main error type for a harvesting run
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors surfaced by the bounded retry executor
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout or body-read failure; retryable
    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    /// HTTP 429 or 5xx; retryable
    #[error("HTTP {status} (retryable) for {url}")]
    ServerStatus { url: String, status: u16 },

    /// HTTP 4xx other than 429; never retried
    #[error("HTTP {status} for {url}")]
    ClientStatus { url: String, status: u16 },

    /// Every attempt failed with a retryable condition
    #[error("Request exhausted after {attempts} attempts for {url}{}", cause_suffix(.last_error))]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: Option<String>,
    },
}

fn cause_suffix(cause: &Option<String>) -> String {
    cause.as_deref().map(|e| format!(": {e}")).unwrap_or_default()
}

/// Errors raised while driving a portal protocol
///
/// These never cross `PortalBackend::fetch`; they become a failed report.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Expected form not found: {0}")]
    MissingForm(String),

    #[error("Week selector not found on page")]
    MissingWeekSelector,

    #[error("URL error: {0}")]
    Url(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for harvesting operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for portal protocol operations
pub type PortalResult<T> = std::result::Result<T, PortalError>;

// Re-export commonly used types
pub use config::Config;
pub use fetch::{RateLimiter, RetryPolicy};
pub use portal::{build_backend, DateRange, FetchReport, FetchState, PortalBackend};
pub use record::{ApplicationStatus, CanonicalRecord, RawRecord};
