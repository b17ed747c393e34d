//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the engine, including:
//! - Building HTTP clients with proper user agent strings
//! - Mapping responses and transport failures onto [`FetchResult`]

use crate::config::UserAgentConfig;
use crate::fetcher::{FetchError, FetchResult, Fetcher};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{redirect::Policy, Client};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Formats the User-Agent header value
///
/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use sumi_sift::config::UserAgentConfig;
/// use sumi_sift::fetcher::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "SumiSift".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`Fetcher`]
///
/// Sends a single GET per call. Redirects are followed by the client; the
/// final URL is reported so relative links resolve against the right base.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher from an already configured client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a fetcher with a client built from the user agent configuration
    pub fn from_config(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config, timeout)?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return FetchResult::failure(url.clone(), classify_error(&e)),
        };

        let status_code = response.status().as_u16();
        let final_url = response.url().clone();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        match response.bytes().await {
            Ok(body) => FetchResult {
                url: final_url,
                status_code: Some(status_code),
                body: Some(body.to_vec()),
                headers,
                fetched_at: Utc::now(),
                error: None,
            },
            Err(e) => {
                let mut result = FetchResult::failure(final_url, classify_body_error(&e));
                result.status_code = Some(status_code);
                result.headers = headers;
                result
            }
        }
    }
}

/// Maps a request error onto the engine's failure taxonomy
fn classify_error(e: &reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_connect() {
        FetchError::Connect(e.to_string())
    } else {
        FetchError::Other(e.to_string())
    }
}

fn classify_body_error(e: &reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Body(e.to_string())
    }
}
