//! Polling waits.
//!
//! Every pause in the suite is a [`wait_until`] on an observable condition:
//! the predicate is evaluated immediately, then every `poll_interval` until it
//! is satisfied or `timeout` has elapsed. There are no fixed sleeps.

use crate::result::{E2eError, E2eResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Default poll interval (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Timeout and poll interval for one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Total budget
    pub timeout: Duration,
    /// Sleep between evaluations
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::short()
    }
}

impl WaitOptions {
    /// Create options from explicit values
    #[must_use]
    pub const fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Element readiness: 10s, 500ms poll
    #[must_use]
    pub const fn short() -> Self {
        Self::new(
            Duration::from_secs(10),
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        )
    }

    /// Toast detection: 15s, 500ms poll
    #[must_use]
    pub const fn toast() -> Self {
        Self::new(
            Duration::from_secs(15),
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        )
    }

    /// Checkout and navigation: 20s, 500ms poll
    #[must_use]
    pub const fn long() -> Self {
        Self::new(
            Duration::from_secs(20),
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        )
    }

    /// Optional-element presence: 2s, 250ms poll
    #[must_use]
    pub const fn probe() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_millis(250))
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Named wait presets, overridable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitProfile {
    /// Element readiness
    pub short: WaitOptions,
    /// Toast detection
    pub toast: WaitOptions,
    /// Checkout and navigation
    pub long: WaitOptions,
    /// Optional-element presence
    pub probe: WaitOptions,
}

impl Default for WaitProfile {
    fn default() -> Self {
        Self {
            short: WaitOptions::short(),
            toast: WaitOptions::toast(),
            long: WaitOptions::long(),
            probe: WaitOptions::probe(),
        }
    }
}

/// Poll `predicate` until it yields a value or the budget runs out.
///
/// The predicate returns `Ok(Some(v))` when satisfied, `Ok(None)` when not
/// yet satisfied. Transient interaction errors count as "not yet"; any other
/// error aborts the wait immediately.
pub async fn wait_until<T, F, Fut>(
    options: &WaitOptions,
    description: &str,
    mut predicate: F,
) -> E2eResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Option<T>>>,
{
    let start = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let last_outcome = match predicate().await {
            Ok(Some(value)) => {
                tracing::debug!(
                    description,
                    attempts,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Wait satisfied"
                );
                return Ok(value);
            }
            Ok(None) => "not satisfied".to_string(),
            Err(e) if e.is_transient() => e.to_string(),
            Err(e) => return Err(e),
        };

        let elapsed = start.elapsed();
        if elapsed >= options.timeout {
            tracing::debug!(description, attempts, %last_outcome, "Wait timed out");
            return Err(E2eError::Timeout {
                description: description.to_string(),
                elapsed,
                last_outcome,
            });
        }

        let remaining = options.timeout - elapsed;
        tokio::time::sleep(options.poll_interval.min(remaining)).await;
    }
}

/// Like [`wait_until`] but maps a timeout to `None`, for elements that may
/// legitimately never appear.
pub async fn wait_optional<T, F, Fut>(
    options: &WaitOptions,
    description: &str,
    predicate: F,
) -> E2eResult<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Option<T>>>,
{
    match wait_until(options, description, predicate).await {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_timeout() => Ok(None),
        Err(e) => Err(e),
    }
}
