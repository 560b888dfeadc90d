// src/client/retry.rs

//! Retry with exponential backoff and jitter

use crate::error::Result;
use std::time::Duration;
use tracing::warn;

/// How often and how patiently a remote call is retried
///
/// Only errors for which [`crate::error::Error::is_retryable`] holds are
/// retried; everything else (client errors, "not found", bad payloads) is
/// returned after the first attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubled for every further retry
    pub base_delay: Duration,
    /// Upper bound on a single delay, before jitter
    pub max_delay: Duration,
    /// Random extra delay as a fraction of the computed delay (0.0 - 1.0)
    pub jitter_factor: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            jitter_factor: 0.25,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based), without jitter
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Delay before retry number `retry`, with jitter applied
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base = self.backoff(retry);
        let jitter = rand::random::<f32>() * self.jitter_factor.clamp(0.0, 1.0);
        base.mul_f32(1.0 + jitter)
    }

    /// Run `op` until it succeeds, fails terminally, or retries run out
    ///
    /// `op` receives the 1-based attempt number.
    pub fn run<T, F>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt <= self.max_retries => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} attempt {} failed: {}, retrying in {:?}...",
                        what, attempt, e, delay
                    );
                    std::thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_factor: 0.0,
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(10), Duration::from_secs(2));
        assert_eq!(policy.backoff(100), Duration::from_secs(2));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let delay = policy.delay_for(1);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(126));
        }
    }

    #[test]
    fn test_retries_transient_errors_then_succeeds() {
        let mut calls = 0;
        let value = fast()
            .run("fetch", |attempt| {
                calls += 1;
                if attempt < 3 {
                    Err(Error::UpstreamUnavailable("503".into()))
                } else {
                    Ok(attempt)
                }
            })
            .unwrap();
        assert_eq!(value, 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_gives_up_after_max_retries() {
        let mut calls = 0;
        let result: Result<()> = fast().run("fetch", |_| {
            calls += 1;
            Err(Error::UpstreamUnavailable("timeout".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_client_errors_are_not_retried() {
        let mut calls = 0;
        let result: Result<()> = fast().run("fetch", |_| {
            calls += 1;
            Err(Error::UpstreamRejected {
                status: 400,
                message: "bad request".into(),
            })
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);

        let mut calls = 0;
        let result: Result<()> = RetryPolicy::none().run("fetch", |_| {
            calls += 1;
            Err(Error::UpstreamUnavailable("down".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
