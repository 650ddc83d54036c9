//! Session-scoped state shared by the HTML backends

use crate::config::HttpConfig;
use crate::fetch::{build_http_client, Fetcher, RateLimiter, RetryPolicy};
use crate::PortalResult;
use std::sync::Arc;
use url::Url;

/// Ordered form fields carried between requests of one fetch
///
/// Insertion order is preserved; overlaying an existing name replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    fields: Vec<(String, String)>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(field) => field.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn extend<I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in fields {
            self.insert(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consumes the state into a form body
    pub fn into_form(self) -> Vec<(String, String)> {
        self.fields
    }
}

impl From<Vec<(String, String)>> for SessionState {
    fn from(fields: Vec<(String, String)>) -> Self {
        let mut state = Self::new();
        state.extend(fields);
        state
    }
}

/// Immutable per-backend configuration
///
/// The rate limiter is owned by one backend and never shared across
/// portals.
#[derive(Debug, Clone)]
pub struct PortalContext {
    pub name: String,

    /// Portal root, always ending in `/`
    pub base_url: Url,

    pub http: HttpConfig,
    pub policy: RetryPolicy,
    pub limiter: Arc<RateLimiter>,
    pub max_pages: u32,
}

impl PortalContext {
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        http: HttpConfig,
        policy: RetryPolicy,
        limiter: RateLimiter,
        max_pages: u32,
    ) -> PortalResult<Self> {
        Ok(Self {
            name: name.into(),
            base_url: directory_url(base_url)?,
            http,
            policy,
            limiter: Arc::new(limiter),
            max_pages,
        })
    }

    /// Opens a fresh HTTP session for one fetch
    ///
    /// The returned executor owns its client and cookie jar; dropping it ends
    /// the session.
    pub fn open_session(&self) -> PortalResult<Fetcher> {
        let client = build_http_client(&self.http)?;
        Ok(Fetcher::new(
            client,
            self.policy.clone(),
            Some(Arc::clone(&self.limiter)),
        ))
    }

    /// Resolves a path relative to the portal root
    pub fn url(&self, path: &str) -> PortalResult<Url> {
        Ok(self.base_url.join(path)?)
    }
}

/// Parses a base URL and makes sure relative paths resolve beneath it
pub(crate) fn directory_url(base: &str) -> PortalResult<Url> {
    let trimmed = base.trim();
    if trimmed.ends_with('/') {
        Ok(Url::parse(trimmed)?)
    } else {
        Ok(Url::parse(&format!("{trimmed}/"))?)
    }
}
