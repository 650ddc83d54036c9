use crate::fetch::RetryPolicy;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Planning Harvester
///
/// Owned by the orchestrator; backends receive copies of the pieces they
/// need and never mutate it.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default, rename = "portal")]
    pub portals: Vec<PortalConfig>,
}

impl Config {
    /// Returns the portals that are enabled
    pub fn enabled_portals(&self) -> impl Iterator<Item = &PortalConfig> {
        self.portals.iter().filter(|p| p.enabled)
    }
}

/// Outbound HTTP identification and timeouts
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Browser-like identification header sent on every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Run-level scrape settings
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    /// Look-back window in days when no explicit range is given
    #[serde(default = "default_days")]
    pub days: u32,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the JSON file receiving canonical records
    #[serde(default = "default_output_path")]
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

/// Portal backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortalKind {
    /// Session/CSRF-token HTML search engine
    FormToken,
    /// ASP.NET WebForms ViewState/postback engine
    Aspnet,
    /// JSON REST API with limit/offset pagination
    RestApi,
}

impl PortalKind {
    /// Default admission rate for this family
    pub fn default_rate_limit(&self) -> RateLimitConfig {
        match self {
            Self::FormToken | Self::Aspnet => RateLimitConfig {
                rate: 1.0,
                burst: 3,
            },
            Self::RestApi => RateLimitConfig {
                rate: 2.0,
                burst: 5,
            },
        }
    }

    /// Config-file spelling of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FormToken => "form-token",
            Self::Aspnet => "aspnet",
            Self::RestApi => "rest-api",
        }
    }
}

/// One configured portal
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    /// Council name, used in logs and reports
    pub name: String,

    pub kind: PortalKind,

    /// Portal root (e.g. "https://publicaccess.example.gov.uk/online-applications")
    #[serde(rename = "base-url")]
    pub base_url: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Page safety limit per query cycle
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Entry page relative to the base URL; defaults per kind
    #[serde(rename = "search-path", default)]
    pub search_path: Option<String>,

    /// Organisation scope for REST portals
    #[serde(rename = "organisation-entity", default)]
    pub organisation_entity: Option<u64>,

    /// Overrides the per-kind default admission rate
    #[serde(rename = "rate-limit", default)]
    pub rate_limit: Option<RateLimitConfig>,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl PortalConfig {
    /// Configured or default rate limit for this portal
    pub fn effective_rate_limit(&self) -> RateLimitConfig {
        self.rate_limit
            .clone()
            .unwrap_or_else(|| self.kind.default_rate_limit())
    }
}

/// Token bucket settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per second
    pub rate: f64,

    /// Bucket capacity
    pub burst: u32,
}

/// Retry settings, converted into a [`RetryPolicy`]
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_enabled")]
    pub jitter: bool,
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
            jitter: self.jitter,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter: default_enabled(),
        }
    }
}

/// Upper bound accepted for `max-pages`
pub const MAX_PAGES_LIMIT: u32 = 50;

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36"
        .to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_days() -> u32 {
    30
}

fn default_output_path() -> String {
    "data/applications.json".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_max_pages() -> u32 {
    MAX_PAGES_LIMIT
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}
