//! Token-bucket admission control
//!
//! Refill is computed lazily on each acquisition from the elapsed time since
//! the previous refill; there is no background timer.

use crate::ConfigError;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Mutable bucket state, guarded by the limiter's mutex
#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant, rate: f64, burst: f64) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(burst);
        self.last_refill = now;
    }
}

/// Token bucket with capacity `burst` refilled at `rate` tokens per second
///
/// Concurrent `acquire()` calls on one instance are serialized, so callers
/// never double-spend tokens. A limiter belongs to one backend and is never
/// shared across independent portal scrapes.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Creates a full bucket
    ///
    /// # Arguments
    ///
    /// * `rate` - Tokens replenished per second; must be > 0
    /// * `burst` - Bucket capacity; must be >= 1
    ///
    /// # Returns
    ///
    /// * `Ok(RateLimiter)` - A limiter with `burst` tokens available
    /// * `Err(ConfigError)` - The rate or burst is out of range
    pub fn new(rate: f64, burst: u32) -> Result<Self, ConfigError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "rate limit must be > 0 requests/second, got {}",
                rate
            )));
        }
        if burst < 1 {
            return Err(ConfigError::Validation(format!(
                "rate limit burst must be >= 1, got {}",
                burst
            )));
        }

        Ok(Self {
            rate,
            burst: f64::from(burst),
            bucket: Mutex::new(Bucket {
                tokens: f64::from(burst),
                last_refill: Instant::now(),
            }),
        })
    }

    /// Waits until one token is available, then debits it
    ///
    /// The caller is suspended (not spinning) while the bucket is empty. The
    /// lock is held across the wait so queued callers are admitted in order.
    pub async fn acquire(&self) {
        let mut bucket = self.bucket.lock().await;
        bucket.refill(Instant::now(), self.rate, self.burst);

        if bucket.tokens < 1.0 {
            let wait = Duration::from_secs_f64((1.0 - bucket.tokens) / self.rate);
            tracing::debug!("Rate limited, waiting {:.2}s", wait.as_secs_f64());
            sleep(wait).await;
            // The token that accrued during the wait is the one handed out.
            bucket.tokens = 0.0;
            bucket.last_refill = Instant::now();
        } else {
            bucket.tokens -= 1.0;
        }
    }

    /// Returns the tokens currently available, after a lazy refill
    pub async fn available(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        bucket.refill(Instant::now(), self.rate, self.burst);
        bucket.tokens
    }
}
