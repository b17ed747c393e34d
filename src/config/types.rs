use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sumi-Sift
///
/// Only `[user-agent]` is mandatory; every other section falls back to
/// polite defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub compliance: ComplianceConfig,
    #[serde(default, rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub quality: QualityConfig,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler, also the robots.txt product token
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// robots.txt behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ComplianceConfig {
    /// When false, every URL is allowed and only the default delay applies
    pub respect_robots_txt: bool,

    /// Crawl-delay floor used when a site does not specify one (milliseconds)
    pub default_crawl_delay_ms: u64,

    /// Extra attempts when robots.txt is unreachable
    pub robots_fetch_retries: u32,
}

impl ComplianceConfig {
    pub fn default_crawl_delay(&self) -> Duration {
        Duration::from_millis(self.default_crawl_delay_ms)
    }
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            respect_robots_txt: true,
            default_crawl_delay_ms: 1000,
            robots_fetch_retries: 2,
        }
    }
}

/// Adaptive pacing policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RateLimitConfig {
    /// Adaptive delay for an origin that has not been observed yet (milliseconds)
    pub initial_delay_ms: u64,

    /// Floor the adaptive delay decays toward (milliseconds)
    pub min_delay_ms: u64,

    /// Cap for the adaptive delay (milliseconds)
    pub max_delay_ms: u64,

    /// Multiplier applied on every soft failure
    pub backoff_factor: f64,

    /// Multiplier applied after a run of successes
    pub decay_factor: f64,

    /// Consecutive successes needed before one decay step
    pub decay_after_successes: u32,

    /// Maximum in-flight requests per origin
    pub max_concurrent_per_origin: u32,
}

impl RateLimitConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            min_delay_ms: 500,
            max_delay_ms: 60_000,
            backoff_factor: 2.0,
            decay_factor: 0.75,
            decay_after_successes: 3,
            max_concurrent_per_origin: 2,
        }
    }
}

/// Run-level limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RunConfig {
    /// Retries after the first attempt for soft failures
    pub max_retries: u32,

    /// Pages processed in parallel (across origins)
    pub workers: u32,

    /// Whole-request timeout used by the HTTP fetcher (seconds)
    pub request_timeout_secs: u64,

    /// How long an in-flight fetch may finish after cancellation (milliseconds)
    pub cancel_grace_ms: u64,
}

impl RunConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            workers: 4,
            request_timeout_secs: 30,
            cancel_grace_ms: 2000,
        }
    }
}

/// Quality gate configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct QualityConfig {
    /// Minimum aggregate score (0.0 - 1.0) for an item to be accepted
    pub min_quality_score: f64,

    /// Drop rejected items from the output instead of attaching their score
    pub enable_quality_filtering: bool,

    /// Count rejected-but-emitted items in `total_scraped`
    pub count_rejected_as_scraped: bool,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_quality_score: 0.6,
            enable_quality_filtering: true,
            count_rejected_as_scraped: false,
        }
    }
}
