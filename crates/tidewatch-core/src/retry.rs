//! Retry policy with linear backoff, kept apart from the I/O it governs.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Backoff strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed {
        /// Delay between retries.
        delay: Duration,
    },
    /// Delay grows linearly with the retry number: `step * retry`.
    Linear {
        /// Delay added per retry.
        step: Duration,
        /// Upper bound on any single delay.
        max: Duration,
        /// Whether to apply random jitter (+/- 25%) to the delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Linear {
            step: Duration::from_secs(1),
            max: Duration::from_secs(10),
            jitter: false,
        }
    }
}

impl Backoff {
    /// Delay before retry number `retry` (1-based: the first retry is 1).
    pub fn delay(self, retry: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Linear { step, max, jitter } => {
                let mut delay = step.saturating_mul(retry.max(1)).min(max);

                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.25) as u64;
                    let random_offset = fastrand::u64(0..=(jitter_ms * 2));
                    let total_ms =
                        delay.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
                    delay = Duration::from_millis(total_ms.max(0) as u64);
                }

                delay
            }
        }
    }
}

/// How many times to retry, how long to wait, and which statuses are transient.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// The maximum number of retries to attempt.
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// The backoff strategy to use between retries.
    pub backoff: Backoff,
    /// 4xx statuses treated as transient. Every 5xx is always transient.
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::default(),
            retry_on_status: vec![408, 429],
        }
    }
}

impl RetryPolicy {
    /// Linear backoff of `step * retry`.
    pub fn linear(step: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Linear {
                step,
                max: step.saturating_mul(max_retries.max(1)),
                jitter: false,
            },
            ..Self::default()
        }
    }

    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Whether an HTTP status is a transient failure.
    pub fn should_retry_status(&self, status: u16) -> bool {
        (500..600).contains(&status) || self.retry_on_status.contains(&status)
    }

    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.backoff.delay(retry)
    }
}

/// Suspends the current task between attempts; injected so tests can observe delays.
pub trait Sleeper: Send + Sync {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(tokio::time::sleep(duration))
    }
}
