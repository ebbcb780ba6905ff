//! Optimistic concurrency: re-run a read-reduce-write cycle on version conflicts.
//!
//! Only conflicts are retried. Domain rejections and dependency failures are
//! returned to the caller on the first attempt; the engine never retries a
//! collaborator that is down.
//!
//! # Example
//!
//! ```rust
//! use canteen_engine::EngineConfig;
//! use canteen_engine::retry::{Attempt, retry_on_conflict};
//!
//! # async fn example() -> Result<(), canteen_core::error::CanteenError> {
//! let config = EngineConfig::default();
//! let value = retry_on_conflict(&config, "example", || async { Ok::<_, Attempt>(42) }).await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use crate::EngineConfig;
use crate::metrics::CasMetrics;
use canteen_core::error::CanteenError;
use canteen_core::repository::RepositoryError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Longest pause between two attempts.
const MAX_BACKOFF: Duration = Duration::from_millis(50);

/// Why one attempt of a read-reduce-write cycle failed.
#[derive(Debug)]
pub enum Attempt {
    /// Someone else wrote first, or a generated id collided. Worth another try.
    Retry(RepositoryError),
    /// Final answer for this call.
    Fail(CanteenError),
}

impl From<CanteenError> for Attempt {
    fn from(err: CanteenError) -> Self {
        Self::Fail(err)
    }
}

impl From<RepositoryError> for Attempt {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict { .. }
            | RepositoryError::DuplicateOrder(_)
            | RepositoryError::DuplicatePickupCode(_) => Self::Retry(err),
            RepositoryError::Backend(_) | RepositoryError::Serialization(_) => {
                tracing::error!(error = %err, "Repository failure");
                Self::Fail(err.into())
            },
        }
    }
}

/// Delay before attempt number `attempt + 1` (1-based `attempt`).
fn backoff(base: Duration, attempt: usize) -> Duration {
    if base.is_zero() {
        return Duration::ZERO;
    }
    let exp = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
    let delay = base.saturating_mul(1 << exp).min(MAX_BACKOFF);
    let jitter_us = u64::try_from(delay.as_micros() / 2).unwrap_or(0);
    let jitter = Duration::from_micros(rand::thread_rng().gen_range(0..=jitter_us));
    delay / 2 + jitter
}

/// Run `operation` until it succeeds, fails for good, or runs out of attempts.
///
/// # Errors
///
/// The operation's own [`Attempt::Fail`] error, or
/// [`CanteenError::InvalidState`] once `config.cas_attempts` conflicting
/// attempts have been made.
pub async fn retry_on_conflict<F, Fut, T>(
    config: &EngineConfig,
    operation_name: &'static str,
    mut operation: F,
) -> Result<T, CanteenError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Attempt>>,
{
    let attempts = config.cas_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(operation = operation_name, attempt, "Succeeded after conflict");
                }
                return Ok(value);
            },
            Err(Attempt::Fail(err)) => return Err(err),
            Err(Attempt::Retry(err)) => {
                CasMetrics::record_retry(operation_name);
                if attempt >= attempts {
                    tracing::warn!(
                        operation = operation_name,
                        attempts,
                        error = %err,
                        "Giving up after repeated conflicts"
                    );
                    return Err(CanteenError::InvalidState(format!(
                        "{operation_name} kept conflicting with concurrent updates: {err}"
                    )));
                }

                tracing::debug!(operation = operation_name, attempt, error = %err, "Conflict, retrying");
                let delay = backoff(config.cas_backoff, attempt);
                if delay.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    sleep(delay).await;
                }
            },
        }
    }
}
