//! Bounded retry with a pause between attempts.

use std::future::Future;
use std::time::Duration;

/// Pause between two attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The same pause after every failed attempt.
    Fixed(Duration),
    /// Doubling pause starting at `initial`, capped at `max`.
    Exponential { initial: Duration, max: Duration },
}

/// How many times an operation is attempted and how long to wait between tries.
///
/// ```rust
/// use fieldgate_engine::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts(), 3);
/// assert_eq!(policy.delay_after(1), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Fixed pause between attempts. `max_attempts` is at least 1.
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            backoff: Backoff::Fixed(delay),
        }
    }

    /// Doubling pause between attempts. `max_attempts` is at least 1.
    pub const fn exponential(max_attempts: u32, initial: Duration, max: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            backoff: Backoff::Exponential { initial, max },
        }
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub const fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Pause after the 1-based `attempt` failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { initial, max } => {
                let shift = attempt.saturating_sub(1).min(31);
                initial.saturating_mul(1u32 << shift).min(max)
            }
        }
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// `op` receives the 1-based attempt number. Returns the first success
    /// or the error of the last attempt. No pause follows the last attempt.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => return Err(e),
                Err(_) => {
                    tokio::time::sleep(self.delay_after(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    /// Three attempts, two seconds apart.
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(2))
    }
}
