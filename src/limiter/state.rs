use crate::config::RateLimitConfig;
use std::time::Duration;
use tokio::time::Instant;

/// Pacing state for one origin
///
/// Mutated only by [`RateLimiter`](super::RateLimiter) while holding the
/// origin's lock.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    /// Slot reserved by the most recent admission (may lie in the future)
    pub last_request_at: Option<Instant>,

    /// Adaptive delay, moved by observed responses
    pub current_delay: Duration,

    /// Delay requested by robots.txt (or the configured floor)
    pub crawl_delay: Duration,

    /// Soft failures since the last success
    pub consecutive_failures: u32,

    /// Successes since the last failure or decay step
    pub consecutive_successes: u32,

    /// Requests admitted and not yet released
    pub active_requests: u32,

    /// No request may start before this instant (set by Retry-After)
    pub hold_until: Option<Instant>,
}

impl RateLimitState {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            last_request_at: None,
            current_delay: config.initial_delay(),
            crawl_delay: Duration::ZERO,
            consecutive_failures: 0,
            consecutive_successes: 0,
            active_requests: 0,
            hold_until: None,
        }
    }

    /// Spacing required between two requests to this origin
    pub fn effective_delay(&self) -> Duration {
        self.crawl_delay.max(self.current_delay)
    }

    /// How long a request arriving at `now` must wait
    pub fn wait_at(&self, now: Instant) -> Duration {
        let spacing = self
            .last_request_at
            .map(|last| (last + self.effective_delay()).saturating_duration_since(now))
            .unwrap_or(Duration::ZERO);

        let hold = self
            .hold_until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO);

        spacing.max(hold)
    }

    /// Claims the next slot for a request starting at `now + wait`
    pub fn reserve(&mut self, now: Instant, wait: Duration) {
        self.last_request_at = Some(now + wait);
        self.active_requests += 1;
    }

    pub fn record_success(&mut self, config: &RateLimitConfig) {
        self.consecutive_failures = 0;
        self.consecutive_successes += 1;

        if self.consecutive_successes >= config.decay_after_successes {
            let decayed = scale(self.current_delay, config.decay_factor);
            self.current_delay = decayed.max(config.min_delay());
            self.consecutive_successes = 0;
        }
    }

    pub fn record_soft_failure(
        &mut self,
        config: &RateLimitConfig,
        retry_after: Option<Duration>,
        now: Instant,
    ) {
        self.consecutive_failures += 1;
        self.consecutive_successes = 0;
        self.current_delay = scale(self.current_delay, config.backoff_factor).min(config.max_delay());

        if let Some(retry_after) = retry_after {
            let until = now + retry_after;
            self.hold_until = Some(self.hold_until.map_or(until, |h| h.max(until)));
        }
    }

    /// Hard failures say nothing about server load; only the success streak resets
    pub fn record_hard_failure(&mut self) {
        self.consecutive_successes = 0;
    }
}

fn scale(delay: Duration, factor: f64) -> Duration {
    let scaled = delay.as_secs_f64() * factor;
    if scaled.is_finite() && scaled >= 0.0 {
        Duration::from_secs_f64(scaled)
    } else {
        delay
    }
}
