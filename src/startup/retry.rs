//! Bounded retry with an injectable sleep.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Suspends the caller between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How the wait between two attempts evolves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed,
    /// Multiply the interval by `factor` after each failure, capped at `max`.
    Exponential { factor: f64, max: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
    backoff: Backoff,
}

impl RetryPolicy {
    /// A fixed-interval policy. `max_attempts` is raised to 1 if zero.
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
            backoff: Backoff::Fixed,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after the failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential { factor, max } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let scaled = self.interval.as_secs_f64() * factor.powi(exponent);
                if scaled.is_finite() && scaled < max.as_secs_f64() {
                    Duration::from_secs_f64(scaled)
                } else {
                    max
                }
            }
        }
    }
}

/// Successful outcome of [`retry`].
#[derive(Debug, PartialEq)]
pub struct Succeeded<T> {
    pub value: T,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

/// Every attempt failed; carries the last error.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Runs `operation` until it succeeds or the policy's attempt budget is spent.
///
/// `operation` receives the 1-based attempt number. `on_failure` sees each
/// failed attempt before the sleep that follows it. There is no sleep after the
/// final attempt.
pub async fn retry<T, E, F, Fut, L>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut operation: F,
    mut on_failure: L,
) -> Result<Succeeded<T>, Exhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    L: FnMut(u32, &E),
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => {
                return Ok(Succeeded {
                    value,
                    attempts: attempt,
                })
            }
            Err(error) => {
                on_failure(attempt, &error);
                if attempt >= policy.max_attempts {
                    return Err(Exhausted {
                        attempts: attempt,
                        last_error: error,
                    });
                }
                sleeper.sleep(policy.delay_after(attempt)).await;
                attempt += 1;
            }
        }
    }
}
