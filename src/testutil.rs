//! Test utilities: an in-memory [`Fetcher`] with per-URL routes
//!
//! Routes are keyed by the full URL string. A route is either sticky (same
//! response every time) or a sequence (responses served in order, the last
//! one repeating). Unrouted URLs answer 404. Every call is recorded so tests
//! can assert on request counts and order.

use crate::fetcher::{FetchError, FetchResult, Fetcher};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

enum Route {
    Sticky(FetchResult),
    Sequence(VecDeque<FetchResult>),
}

#[derive(Clone, Default)]
pub struct MockFetcher {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    calls: Arc<Mutex<Vec<String>>>,
    latency: Duration,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps this long before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Serves `body` with status 200
    pub fn page(self, url: &str, body: &str) -> Self {
        self.route(url, Route::Sticky(Self::html_response(body)))
    }

    /// Serves an empty body with `status`
    pub fn status(self, url: &str, status: u16) -> Self {
        self.route(url, Route::Sticky(Self::status_response(status)))
    }

    /// Fails every request with a transport error
    pub fn error(self, url: &str, error: FetchError) -> Self {
        self.route(url, Route::Sticky(Self::error_response(error)))
    }

    /// Serves `responses` in order; the last one repeats
    pub fn sequence(self, url: &str, responses: Vec<FetchResult>) -> Self {
        self.route(url, Route::Sequence(responses.into()))
    }

    pub fn html_response(body: &str) -> FetchResult {
        FetchResult::response(placeholder_url(), 200, body.as_bytes().to_vec())
    }

    pub fn status_response(status: u16) -> FetchResult {
        FetchResult::response(placeholder_url(), status, Vec::new())
    }

    pub fn error_response(error: FetchError) -> FetchResult {
        FetchResult::failure(placeholder_url(), error)
    }

    /// Number of fetches issued for `url`
    pub fn call_count(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    /// Every fetched URL, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn route(self, url: &str, route: Route) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), route);
        self
    }

    fn next_response(&self, url: &str) -> Option<FetchResult> {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(url)? {
            Route::Sticky(response) => Some(response.clone()),
            Route::Sequence(queue) => {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            }
        }
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult {
        self.calls.lock().unwrap().push(url.to_string());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut response = self
            .next_response(url.as_str())
            .unwrap_or_else(|| Self::status_response(404));
        response.url = url.clone();
        response
    }
}

fn placeholder_url() -> Url {
    Url::parse("http://mock.invalid/").unwrap()
}
