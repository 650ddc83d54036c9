//! Configuration module for Planning Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use planning_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("portals.toml")).unwrap();
//! println!("{} portals configured", config.portals.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, HttpConfig, OutputConfig, PortalConfig, PortalKind, RateLimitConfig, RetryConfig,
    ScrapeConfig, MAX_PAGES_LIMIT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
