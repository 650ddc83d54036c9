//! Retry policy and the bounded retry executor
//!
//! # Outcome Classification
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 2xx | Success, returned immediately |
//! | HTTP 429 | Retry with backoff |
//! | HTTP 5xx | Retry with backoff |
//! | Other HTTP status | Terminal, returned immediately |
//! | Connection error / timeout | Retry with backoff |

use crate::fetch::client::{FetchedPage, Method, PortalRequest};
use crate::fetch::limiter::RateLimiter;
use crate::FetchError;
use rand::Rng;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Bounded exponential backoff configuration
///
/// Immutable; `delay_for` is a pure function of the attempt index apart from
/// the jitter factor.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Scale each delay by a uniform factor in `[0.5, 1.5)`
    pub jitter: bool,
}

impl RetryPolicy {
    /// Delay before retrying after `attempt` (0-indexed), before jitter
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    /// Delay before retrying after `attempt` (0-indexed)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.base_delay_for(attempt);
        if self.jitter {
            delay.mul_f64(rand::thread_rng().gen_range(0.5..1.5))
        } else {
            delay
        }
    }

    /// Total number of attempts this policy allows
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Executes idempotent portal requests under a retry policy and rate limiter
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    limiter: Option<Arc<RateLimiter>>,
}

impl Fetcher {
    /// Creates an executor around an already-built client
    pub fn new(client: Client, policy: RetryPolicy, limiter: Option<Arc<RateLimiter>>) -> Self {
        Self {
            client,
            policy,
            limiter,
        }
    }

    /// Sends a request, retrying transport failures, 429 and 5xx responses
    ///
    /// Every attempt first passes the rate limiter (if attached). Between
    /// retryable attempts the executor sleeps `policy.delay_for(attempt)`.
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedPage)` - A 2xx response with its body
    /// * `Err(FetchError::ClientStatus)` - A terminal status, not retried
    /// * `Err(FetchError::Exhausted)` - All attempts failed retryably
    pub async fn execute(&self, request: &PortalRequest) -> Result<FetchedPage, FetchError> {
        let attempts = self.policy.attempts();
        let mut last_error = None;

        for attempt in 0..attempts {
            if let Some(limiter) = &self.limiter {
                limiter.acquire().await;
            }

            match self.attempt(request).await {
                Ok(page) => return Ok(page),
                Err(FetchError::Transport { url, source }) => {
                    tracing::warn!(
                        "Request error on attempt {} for {}: {}",
                        attempt + 1,
                        url,
                        source
                    );
                    last_error = Some(source.to_string());
                }
                Err(FetchError::ServerStatus { url, status }) => {
                    tracing::warn!(
                        "HTTP {} on attempt {} for {}",
                        status,
                        attempt + 1,
                        url
                    );
                }
                Err(terminal) => {
                    tracing::warn!("{}", terminal);
                    return Err(terminal);
                }
            }

            if attempt + 1 < attempts {
                let delay = self.policy.delay_for(attempt);
                tracing::debug!("Retrying in {:.2}s...", delay.as_secs_f64());
                sleep(delay).await;
            }
        }

        let error = FetchError::Exhausted {
            url: request.url.to_string(),
            attempts,
            last_error,
        };
        tracing::error!("{}", error);
        Err(error)
    }

    /// Performs a single attempt and classifies its outcome
    async fn attempt(&self, request: &PortalRequest) -> Result<FetchedPage, FetchError> {
        let builder = match request.method {
            Method::Get => self.client.get(request.url.clone()),
            Method::Post => self.client.post(request.url.clone()).form(&request.form),
        };

        let transport = |source: reqwest::Error| FetchError::Transport {
            url: request.url.to_string(),
            source,
        };

        let response = builder.send().await.map_err(transport)?;
        let status = response.status();
        let url = response.url().clone();

        if status.is_success() {
            let body = response.text().await.map_err(transport)?;
            return Ok(FetchedPage {
                url,
                status: status.as_u16(),
                body,
            });
        }

        // The response is dropped here, releasing the connection.
        drop(response);
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Err(FetchError::ServerStatus {
                url: url.to_string(),
                status: status.as_u16(),
            })
        } else {
            Err(FetchError::ClientStatus {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}
