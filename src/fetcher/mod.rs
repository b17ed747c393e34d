//! Fetcher collaborator contract
//!
//! The engine never talks to the network directly. It consumes a
//! [`FetchResult`] from any [`Fetcher`] implementation; [`HttpFetcher`] is the
//! reqwest-backed one used by the binary. Fetchers must not retry or rate-limit
//! on their own: pacing and retry belong to the run orchestrator.

mod http;

pub use http::{build_http_client, user_agent_string, HttpFetcher};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Transport-level failure reported by a fetcher
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Failed to read body: {0}")]
    Body(String),

    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Returns true if this failure is transient and eligible for retry
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connect(_))
    }
}

/// How a fetch attempt ended, from the engine's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx with a body
    Success,
    /// Timeout, connection failure, HTTP 429 or 503
    SoftFailure,
    /// Anything else (404, 500, unreadable body, ...)
    HardFailure,
}

/// Result of one request, produced by a [`Fetcher`]
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Final URL after redirects
    pub url: Url,

    /// HTTP status code, absent when the request never got a response
    pub status_code: Option<u16>,

    /// Raw response body
    pub body: Option<Vec<u8>>,

    /// Response headers with lowercased names
    pub headers: HashMap<String, String>,

    /// When the response (or failure) was observed
    pub fetched_at: DateTime<Utc>,

    /// Transport failure, if any
    pub error: Option<FetchError>,
}

impl FetchResult {
    /// Creates a result for a request that received a response
    pub fn response(url: Url, status_code: u16, body: Vec<u8>) -> Self {
        Self {
            url,
            status_code: Some(status_code),
            body: Some(body),
            headers: HashMap::new(),
            fetched_at: Utc::now(),
            error: None,
        }
    }

    /// Creates a result for a request that failed before a response arrived
    pub fn failure(url: Url, error: FetchError) -> Self {
        Self {
            url,
            status_code: None,
            body: None,
            headers: HashMap::new(),
            fetched_at: Utc::now(),
            error: Some(error),
        }
    }

    /// Adds a response header (name is lowercased)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Looks up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Parses a `Retry-After` header given in seconds
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    /// Classifies this result for retry and backoff decisions
    pub fn classify(&self) -> ResponseClass {
        if let Some(error) = &self.error {
            return if error.is_soft() {
                ResponseClass::SoftFailure
            } else {
                ResponseClass::HardFailure
            };
        }

        match self.status_code {
            Some(429) | Some(503) => ResponseClass::SoftFailure,
            Some(code) if (200..300).contains(&code) && self.body.is_some() => {
                ResponseClass::Success
            }
            _ => ResponseClass::HardFailure,
        }
    }

    /// Short description of a failed result for error reporting
    pub fn describe_failure(&self) -> String {
        match (&self.error, self.status_code) {
            (Some(error), _) => error.to_string(),
            (None, Some(code)) => format!("HTTP {}", code),
            (None, None) => "No response".to_string(),
        }
    }
}

/// Source of page content
///
/// Implementations perform exactly one request per call.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> FetchResult;
}
