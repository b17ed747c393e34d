//! Adaptive per-origin rate limiter
//!
//! Each origin gets a counting semaphore (the concurrency cap) and a
//! [`RateLimitState`] (the pacing state). Both live behind a per-origin
//! handle; the map of origins is only locked long enough to look a handle up,
//! so one origin waiting never blocks another.
//!
//! The flow for one request:
//!
//! 1. [`RateLimiter::acquire`] suspends until a concurrency slot is free,
//!    reserves the next pacing slot and returns an [`Admission`] carrying the
//!    wait the caller must sleep before fetching.
//! 2. The caller fetches.
//! 3. [`RateLimiter::release`] feeds the outcome back (backoff on soft
//!    failure, decay after a success streak) and frees the slot.

mod clock;
mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use state::RateLimitState;

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// What happened to an admitted request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestOutcome {
    Success,
    /// Timeout, connection failure, 429 or 503
    SoftFailure {
        retry_after: Option<Duration>,
    },
    HardFailure,
}

struct OriginSlot {
    semaphore: Arc<Semaphore>,
    state: Mutex<RateLimitState>,
}

impl OriginSlot {
    fn lock(&self) -> MutexGuard<'_, RateLimitState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Permission to issue one request to an origin
///
/// Holds a concurrency slot until it is released or dropped. Dropping it
/// without calling [`RateLimiter::release`] frees the slot but leaves the
/// adaptive delay untouched.
pub struct Admission {
    origin: String,
    wait: Duration,
    slot: Arc<OriginSlot>,
    _permit: OwnedSemaphorePermit,
}

impl Admission {
    /// Time the caller must wait before sending the request
    pub fn wait(&self) -> Duration {
        self.wait
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        // Runs before the permit field is dropped, so the counter never
        // exceeds the semaphore's capacity.
        let mut state = self.slot.lock();
        state.active_requests = state.active_requests.saturating_sub(1);
    }
}

/// Per-origin pacing and concurrency control
pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    origins: Mutex<HashMap<String, Arc<OriginSlot>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            origins: Mutex::new(HashMap::new()),
        }
    }

    /// Records the crawl delay the compliance guard decided for an origin
    pub fn set_crawl_delay(&self, origin: &str, crawl_delay: Duration) {
        let slot = self.slot(origin);
        slot.lock().crawl_delay = crawl_delay;
    }

    /// Waits for a concurrency slot on `origin` and reserves a pacing slot
    ///
    /// Suspends (never spins) while the origin is at its concurrency cap.
    /// The returned [`Admission::wait`] is how long the caller must sleep
    /// before fetching; it accounts for requests admitted before this one.
    ///
    /// Fails only if the origin's semaphore has been closed.
    pub async fn acquire(&self, origin: &str) -> Result<Admission, AcquireError> {
        let slot = self.slot(origin);
        let permit = slot.semaphore.clone().acquire_owned().await?;

        let wait = {
            let mut state = slot.lock();
            let now = self.clock.now();
            let wait = state.wait_at(now);
            state.reserve(now, wait);
            wait
        };

        if !wait.is_zero() {
            tracing::debug!(
                origin = %origin,
                wait_ms = wait.as_millis() as u64,
                "Pacing request"
            );
        }

        Ok(Admission {
            origin: origin.to_string(),
            wait,
            slot,
            _permit: permit,
        })
    }

    /// Feeds a request's outcome back and frees its slot
    pub fn release(&self, admission: Admission, outcome: RequestOutcome) {
        {
            let mut state = admission.slot.lock();
            let before = state.current_delay;

            match outcome {
                RequestOutcome::Success => state.record_success(&self.config),
                RequestOutcome::SoftFailure { retry_after } => {
                    state.record_soft_failure(&self.config, retry_after, self.clock.now())
                }
                RequestOutcome::HardFailure => state.record_hard_failure(),
            }

            if state.current_delay > before {
                tracing::info!(
                    origin = %admission.origin,
                    delay_ms = state.current_delay.as_millis() as u64,
                    failures = state.consecutive_failures,
                    "Backing off"
                );
            } else if state.current_delay < before {
                tracing::debug!(
                    origin = %admission.origin,
                    delay_ms = state.current_delay.as_millis() as u64,
                    "Relaxing delay"
                );
            }
        }
        drop(admission);
    }

    /// Copy of an origin's pacing state, if the origin has been seen
    pub fn snapshot(&self, origin: &str) -> Option<RateLimitState> {
        let origins = self.origins.lock().unwrap_or_else(|p| p.into_inner());
        origins.get(origin).map(|slot| slot.lock().clone())
    }

    fn slot(&self, origin: &str) -> Arc<OriginSlot> {
        let mut origins = self.origins.lock().unwrap_or_else(|p| p.into_inner());
        origins
            .entry(origin.to_string())
            .or_insert_with(|| {
                Arc::new(OriginSlot {
                    semaphore: Arc::new(Semaphore::new(
                        self.config.max_concurrent_per_origin as usize,
                    )),
                    state: Mutex::new(RateLimitState::new(&self.config)),
                })
            })
            .clone()
    }
}
