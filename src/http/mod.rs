//! HTTP client module
//!
//! Provides the HTTP client and the query transport built on it.
//!
//! # Features
//!
//! - **Timeouts**: Separate connect and total request timeouts
//! - **Automatic Retries**: Configurable retry logic with backoff (off by default)
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Query Transport**: Async channel abstraction over the query endpoint

mod client;
mod rate_limit;
mod transport;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RetryPolicy};
pub use rate_limit::{RateLimit, RateLimiter};
pub use transport::{NotionTransport, QueryReply, QueryRequest, QueryTransport, NOTION_VERSION};
