use crate::fetcher::ResponseClass;

/// What to do after one fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryVerdict {
    /// The response can be used
    Succeeded,
    /// Soft failure with retries left; `attempt` is the attempt just made
    Retry { attempt: u32 },
    /// Soft failure and no retries left
    Exhausted { attempts: u32 },
    /// Hard failure; retrying would not help
    Failed,
}

/// Bounded retry bookkeeping for one page
///
/// Holds no timing: the wait before a retry comes from the rate limiter,
/// whose adaptive delay has already grown by the time the retry asks for a
/// slot.
#[derive(Debug, Clone)]
pub struct RetryState {
    attempts: u32,
    max_retries: u32,
}

impl RetryState {
    pub fn new(max_retries: u32) -> Self {
        Self {
            attempts: 0,
            max_retries,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Records an attempt's outcome and decides the next step
    pub fn record(&mut self, class: ResponseClass) -> RetryVerdict {
        self.attempts += 1;

        match class {
            ResponseClass::Success => RetryVerdict::Succeeded,
            ResponseClass::HardFailure => RetryVerdict::Failed,
            ResponseClass::SoftFailure if self.attempts > self.max_retries => {
                RetryVerdict::Exhausted {
                    attempts: self.attempts,
                }
            }
            ResponseClass::SoftFailure => RetryVerdict::Retry {
                attempt: self.attempts,
            },
        }
    }
}
