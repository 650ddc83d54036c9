//! Network access for portal backends
//!
//! This module contains:
//! - HTTP client construction with a per-fetch cookie store
//! - Token-bucket rate limiting
//! - Retry policy and the bounded retry executor

mod client;
mod limiter;
mod retry;

pub use client::{build_http_client, FetchedPage, Method, PortalRequest};
pub use limiter::RateLimiter;
pub use retry::{Fetcher, RetryPolicy};
