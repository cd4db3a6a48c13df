//! Backoff executor — retries any fallible async operation.
//!
//! The executor knows nothing about what it retries. The orchestrator
//! uses the same policy for probes, promotion, and routing updates.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Attempt budget and backoff schedule for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total calls allowed, including the first.
    pub max_attempts: u32,
    /// Sleep after the first failure. Doubled after each later failure.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy. An attempt budget of zero is raised to one.
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    /// Backoff to sleep after the given failed attempt (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        2u32.checked_pow(exponent)
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
        }
    }
}

/// Run `op` until it succeeds or the policy's attempt budget is spent.
///
/// Returns the last error unchanged when every attempt fails.
pub async fn run_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    op: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    run_with_backoff_using(policy, operation, tokio::time::sleep, op).await
}

/// Same as [`run_with_backoff`] with a caller-supplied sleep function.
pub async fn run_with_backoff_using<T, E, F, Fut, S, SleepFut>(
    policy: &RetryPolicy,
    operation: &str,
    mut sleep: S,
    mut op: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    S: FnMut(Duration) -> SleepFut,
    SleepFut: Future<Output = ()>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= policy.max_attempts => return Err(e),
            Err(e) => {
                let backoff = policy.backoff_for(attempt);
                warn!(
                    %operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "operation failed, retrying after backoff"
                );
                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
