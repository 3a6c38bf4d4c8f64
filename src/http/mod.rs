//! HTTP module
//!
//! Provides the HTTP client and the paginated data source.
//!
//! # Features
//!
//! - **Explicit Timeout**: every request is bounded by the configured timeout
//! - **Transport Retry**: optional bounded retry on connection failures only
//! - **Rate Limiting**: optional token bucket rate limiter using governor
//! - **Page Source**: `POST` page requests classified into page / `401` / error

mod client;
mod rate_limit;
mod source;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use source::{DataRequest, Fetched, HttpPageSource, PageSource};

#[cfg(test)]
mod tests;
