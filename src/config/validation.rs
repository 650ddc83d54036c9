use crate::config::types::{
    Config, HttpConfig, OutputConfig, PortalConfig, RateLimitConfig, RetryConfig, MAX_PAGES_LIMIT,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;

    if config.scrape.days < 1 {
        return Err(ConfigError::Validation(
            "scrape days must be >= 1".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for portal in &config.portals {
        validate_portal(portal)?;
        if !names.insert(portal.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate portal name '{}'",
                portal.name
            )));
        }
    }

    Ok(())
}

/// Validates HTTP identification settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 || config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be >= 1s, got timeout={} connect={}",
            config.timeout_secs, config.connect_timeout_secs
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates one portal entry
fn validate_portal(portal: &PortalConfig) -> Result<(), ConfigError> {
    if portal.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "portal name cannot be empty".to_string(),
        ));
    }

    let url = Url::parse(&portal.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid base-url '{}' for portal '{}': {}",
            portal.base_url, portal.name, e
        ))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' for portal '{}' must use http or https",
            portal.base_url, portal.name
        )));
    }

    if portal.max_pages < 1 || portal.max_pages > MAX_PAGES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-pages for portal '{}' must be between 1 and {}, got {}",
            portal.name, MAX_PAGES_LIMIT, portal.max_pages
        )));
    }

    validate_rate_limit(&portal.effective_rate_limit(), &portal.name)?;
    validate_retry(&portal.retry, &portal.name)?;

    Ok(())
}

/// Validates token bucket settings
fn validate_rate_limit(config: &RateLimitConfig, portal: &str) -> Result<(), ConfigError> {
    if !config.rate.is_finite() || config.rate <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "rate for portal '{}' must be > 0, got {}",
            portal, config.rate
        )));
    }

    if config.burst < 1 {
        return Err(ConfigError::Validation(format!(
            "burst for portal '{}' must be >= 1, got {}",
            portal, config.burst
        )));
    }

    Ok(())
}

/// Validates retry settings
fn validate_retry(config: &RetryConfig, portal: &str) -> Result<(), ConfigError> {
    if !config.multiplier.is_finite() || config.multiplier < 1.0 {
        return Err(ConfigError::Validation(format!(
            "retry multiplier for portal '{}' must be >= 1, got {}",
            portal, config.multiplier
        )));
    }

    if config.base_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "retry base-delay-ms ({}) exceeds max-delay-ms ({}) for portal '{}'",
            config.base_delay_ms, config.max_delay_ms, portal
        )));
    }

    Ok(())
}
