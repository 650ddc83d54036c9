//! HTTP client construction and request/response shapes
//!
//! A client is built per fetch operation so the cookie jar, and with it the
//! portal session, lives exactly as long as that fetch.

use crate::config::HttpConfig;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// HTTP method used by portal requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One idempotent request against a portal
#[derive(Debug, Clone, PartialEq)]
pub struct PortalRequest {
    pub method: Method,
    pub url: Url,
    /// URL-encoded form body for POST requests, in submission order
    pub form: Vec<(String, String)>,
}

impl PortalRequest {
    /// Creates a GET request
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            form: Vec::new(),
        }
    }

    /// Creates a form POST request
    pub fn post(url: Url, form: Vec<(String, String)>) -> Self {
        Self {
            method: Method::Post,
            url,
            form,
        }
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: Url,

    /// HTTP status code
    pub status: u16,

    /// Response body
    pub body: String,
}

/// Builds an HTTP client with a browser-like identity and a cookie store
///
/// # Arguments
///
/// * `config` - HTTP identification and timeout settings
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}
