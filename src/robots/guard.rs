//! Compliance guard: per-origin robots.txt policy with a run-lifetime cache

use crate::config::ComplianceConfig;
use crate::fetcher::{FetchResult, Fetcher, ResponseClass};
use crate::robots::ParsedRobots;
use crate::url::{origin_of, robots_url};
use crate::{ComplianceError, UrlResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

/// Whether and how fast a URL may be fetched
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceDecision {
    /// robots.txt allows the URL for our user agent
    pub allowed: bool,

    /// Minimum spacing between requests to the URL's origin; never below the
    /// configured default
    pub crawl_delay: Duration,

    /// Set when robots.txt could not be retrieved and the guard fell back to
    /// allowing the origin
    pub degraded: Option<ComplianceError>,
}

/// Policy derived once per origin
#[derive(Debug)]
struct OriginPolicy {
    robots: ParsedRobots,
    crawl_delay: Duration,
    degraded: Option<ComplianceError>,
}

type PolicyCell = Arc<OnceCell<Arc<OriginPolicy>>>;

/// Answers allow/deny and crawl-delay questions for URLs
///
/// robots.txt is fetched through the same [`Fetcher`] the run uses, at most
/// once per origin; concurrent callers for a new origin share that fetch.
pub struct ComplianceGuard {
    fetcher: Arc<dyn Fetcher>,
    config: ComplianceConfig,
    user_agent: String,
    cache: Mutex<HashMap<String, PolicyCell>>,
}

impl ComplianceGuard {
    /// Creates a guard
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Used to retrieve robots.txt
    /// * `config` - Compliance policy
    /// * `user_agent` - Product token matched against `User-agent` lines
    pub fn new(fetcher: Arc<dyn Fetcher>, config: ComplianceConfig, user_agent: &str) -> Self {
        Self {
            fetcher,
            config,
            user_agent: user_agent.to_string(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Decides whether `url` may be fetched
    ///
    /// Never fails because of robots.txt itself: an unreachable robots.txt is
    /// reported through `degraded` and treated as allow-all.
    pub async fn decide(&self, url: &Url) -> UrlResult<ComplianceDecision> {
        let origin = origin_of(url)?;
        let policy = self.policy_for(&origin, url).await?;

        let allowed = policy.robots.is_allowed(url.as_str(), &self.user_agent);
        if !allowed {
            tracing::info!(url = %url, "Disallowed by robots.txt");
        }

        Ok(ComplianceDecision {
            allowed,
            crawl_delay: policy.crawl_delay,
            degraded: policy.degraded.clone(),
        })
    }

    /// Number of origins with a cached policy
    pub fn cached_origins(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    async fn policy_for(&self, origin: &str, url: &Url) -> UrlResult<Arc<OriginPolicy>> {
        let cell = {
            let mut cache = self
                .cache
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            cache.entry(origin.to_string()).or_default().clone()
        };

        let robots_location = robots_url(url)?;
        let policy = cell
            .get_or_init(|| self.load_policy(origin, robots_location))
            .await;
        Ok(policy.clone())
    }

    async fn load_policy(&self, origin: &str, robots_location: Url) -> Arc<OriginPolicy> {
        let floor = self.config.default_crawl_delay();

        if !self.config.respect_robots_txt {
            return Arc::new(OriginPolicy {
                robots: ParsedRobots::allow_all(),
                crawl_delay: floor,
                degraded: None,
            });
        }

        match self.fetch_robots(origin, &robots_location).await {
            Ok(robots) => {
                let crawl_delay = robots
                    .crawl_delay(&self.user_agent)
                    .map(|d| d.max(floor))
                    .unwrap_or(floor);
                tracing::debug!(
                    origin = %origin,
                    crawl_delay_ms = crawl_delay.as_millis() as u64,
                    "Cached robots.txt policy"
                );
                Arc::new(OriginPolicy {
                    robots,
                    crawl_delay,
                    degraded: None,
                })
            }
            Err(e) => {
                tracing::warn!("{}; allowing origin with default crawl delay", e);
                Arc::new(OriginPolicy {
                    robots: ParsedRobots::allow_all(),
                    crawl_delay: floor,
                    degraded: Some(e),
                })
            }
        }
    }

    /// Fetches robots.txt with a bounded number of retries
    ///
    /// | Response | Result |
    /// |----------|--------|
    /// | 2xx | parsed content |
    /// | 4xx other than 429 | allow all (no robots.txt) |
    /// | 429, 5xx, transport failure | retried, then `ComplianceError` |
    async fn fetch_robots(
        &self,
        origin: &str,
        robots_location: &Url,
    ) -> Result<ParsedRobots, ComplianceError> {
        let attempts = self.config.robots_fetch_retries + 1;
        let mut last_error = None;

        for attempt in 1..=attempts {
            tracing::debug!(origin = %origin, attempt, "Fetching robots.txt");
            let result = self.fetcher.fetch(robots_location).await;

            match interpret_robots_response(origin, &result) {
                Ok(robots) => return Ok(robots),
                Err(e) => last_error = Some(e),
            }

            if attempt < attempts {
                tokio::time::sleep(self.config.default_crawl_delay()).await;
            }
        }

        Err(last_error.unwrap_or_else(|| ComplianceError::Unreachable {
            origin: origin.to_string(),
            message: "no attempts made".to_string(),
        }))
    }
}

fn interpret_robots_response(
    origin: &str,
    result: &FetchResult,
) -> Result<ParsedRobots, ComplianceError> {
    if result.classify() == ResponseClass::Success {
        let body = result.body.as_deref().unwrap_or_default();
        return Ok(ParsedRobots::from_content(&String::from_utf8_lossy(body)));
    }

    match (result.status_code, &result.error) {
        (Some(status), None) if (400..500).contains(&status) && status != 429 => {
            Ok(ParsedRobots::allow_all())
        }
        (Some(status), None) => Err(ComplianceError::ServerError {
            origin: origin.to_string(),
            status,
        }),
        _ => Err(ComplianceError::Unreachable {
            origin: origin.to_string(),
            message: result.describe_failure(),
        }),
    }
}
