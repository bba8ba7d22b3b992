//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler:
//! - Building HTTP clients with proper user agent strings and timeouts
//! - Single GET requests classified into success or one failure class
//!
//! Failures are never retried. The failure reason is kept for logging only;
//! callers treat every failure the same way.

use crate::config::{CrawlerConfig, UserAgentConfig};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;

/// Outcome of one GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// The URL that was requested
    pub url: String,

    /// Response body, present only on success
    pub body: Option<String>,

    /// Why the request failed, if it did
    pub failure: Option<FetchFailure>,
}

/// Reason a fetch did not produce a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The server answered with a status other than 200
    Status(u16),

    /// Connect or total request timeout elapsed
    Timeout,

    /// The connection could not be established
    Connect,

    /// Any other transport error
    Transport(String),

    /// The body could not be read
    Body(String),

    /// The request was never issued because the run was cancelled
    Cancelled,
}

impl FetchResult {
    /// Creates a successful result
    pub fn success(url: impl Into<String>, body: String) -> Self {
        Self {
            url: url.into(),
            body: Some(body),
            failure: None,
        }
    }

    /// Creates a failed result
    pub fn failed(url: impl Into<String>, failure: FetchFailure) -> Self {
        Self {
            url: url.into(),
            body: None,
            failure: Some(failure),
        }
    }

    /// Returns true if the page was retrieved
    pub fn ok(&self) -> bool {
        self.failure.is_none()
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "HTTP {}", code),
            Self::Timeout => write!(f, "request timeout"),
            Self::Connect => write!(f, "connection failed"),
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Body(e) => write!(f, "failed to read body: {}", e),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Crawler settings providing the connect and request timeouts
///
/// # Example
///
/// ```no_run
/// use boligscrape::config::{CrawlerConfig, UserAgentConfig};
/// use boligscrape::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "boligscrape".to_string(),
///     crawler_version: "0.1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "ops@example.com".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(format_user_agent(user_agent))
        .timeout(Duration::from_secs(crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(crawler.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Formats the user agent as `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn format_user_agent(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Fetches a URL once
///
/// | Condition | Result |
/// |-----------|--------|
/// | HTTP 200 | success with body |
/// | any other status | `Status(code)` |
/// | timeout | `Timeout` |
/// | connection refused, DNS, TLS | `Connect` |
/// | body read error | `Body` |
pub async fn fetch_page(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return FetchResult::failed(url, classify_error(&e)),
    };

    let status = response.status();
    if status != StatusCode::OK {
        return FetchResult::failed(url, FetchFailure::Status(status.as_u16()));
    }

    match response.text().await {
        Ok(body) => FetchResult::success(url, body),
        Err(e) if e.is_timeout() => FetchResult::failed(url, FetchFailure::Timeout),
        Err(e) => FetchResult::failed(url, FetchFailure::Body(e.to_string())),
    }
}

fn classify_error(e: &reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else if e.is_connect() {
        FetchFailure::Connect
    } else {
        FetchFailure::Transport(e.to_string())
    }
}
