use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Time source for pacing decisions
///
/// The limiter only ever asks "what time is it"; sleeping is left to the
/// caller. Tests swap in [`ManualClock`] so backoff arithmetic can be checked
/// without waiting.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Tokio's clock, which follows paused test time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}
