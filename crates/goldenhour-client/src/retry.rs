//! Bounded retry around a single remote call.
//!
//! [`with_retry`] runs an async operation, sleeping between failed attempts
//! according to a [`RetryPolicy`]. The loop is explicit and bounded by the
//! policy's attempt limit; a policy without a limit relies on the caller to
//! impose a deadline (the status poller wraps it in its session budget).
//!
//! Failures that another attempt cannot fix ([`Retryable::is_retryable`]
//! returns `false`) are returned immediately as [`RetryError::Fatal`].

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::TransportError;

// =============================================================================
// Policy constants
// =============================================================================

/// Attempts made by one-shot calls (submit, notify, hospital detail).
pub const DEFAULT_ONE_SHOT_MAX_ATTEMPTS: u32 = 3;

/// Delay between one-shot attempts (1 second).
pub const DEFAULT_ONE_SHOT_DELAY_MS: u64 = 1_000;

/// Delay between failed status fetches (2 seconds).
pub const DEFAULT_STATUS_RETRY_DELAY_MS: u64 = 2_000;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Every retry waits the base delay.
    #[default]
    Fixed,
    /// Retry `n` waits `n` times the base delay.
    Linear,
}

/// When and how often a failed call is attempted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts including the first; `None` is unbounded.
    pub max_attempts: Option<u32>,
    /// Base delay between attempts.
    pub delay: Duration,
    /// Delay growth.
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// At most `max_attempts` attempts with a constant delay.
    ///
    /// A limit of zero is treated as one: the call is always made once.
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: Some(if max_attempts == 0 { 1 } else { max_attempts }),
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// At most `max_attempts` attempts with a linearly growing delay.
    pub const fn linear(max_attempts: u32, delay: Duration) -> Self {
        Self {
            backoff: Backoff::Linear,
            ..Self::fixed(max_attempts, delay)
        }
    }

    /// Unlimited attempts with a constant delay.
    pub const fn unbounded(delay: Duration) -> Self {
        Self {
            max_attempts: None,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Default for submit, notify and hospital detail: 3 attempts, 1 s apart.
    pub const fn one_shot() -> Self {
        Self::fixed(
            DEFAULT_ONE_SHOT_MAX_ATTEMPTS,
            Duration::from_millis(DEFAULT_ONE_SHOT_DELAY_MS),
        )
    }

    /// Default for status fetches: unbounded, 2 s apart.
    pub const fn status_polling() -> Self {
        Self::unbounded(Duration::from_millis(DEFAULT_STATUS_RETRY_DELAY_MS))
    }

    /// Delay to wait after failed attempt number `attempt_number` (1-based).
    pub const fn delay_for(&self, attempt_number: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Linear => self.delay.saturating_mul(attempt_number),
        }
    }

    /// Whether another attempt may follow failed attempt `attempt_number`.
    pub const fn permits_retry(&self, attempt_number: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempt_number < max,
            None => true,
        }
    }
}

/// A failed attempt that is about to be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAttempt<E> {
    /// 1-based number of the attempt that failed.
    pub attempt_number: u32,
    /// Why it failed.
    pub last_error: E,
    /// How long the controller waits before the next attempt.
    pub next_delay: Duration,
}

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    /// `false` stops the retry loop immediately.
    fn is_retryable(&self) -> bool;
}

impl Retryable for TransportError {
    fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }
}

/// Why a retried call ultimately failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError<E> {
    /// The failure was not retryable; returned after the first such attempt.
    #[error("{0}")]
    Fatal(E),

    /// Every permitted attempt failed.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Error of the final attempt.
        last: E,
    },
}

impl<E> RetryError<E> {
    /// The error of the final attempt.
    pub const fn last_error(&self) -> &E {
        match self {
            Self::Fatal(err) | Self::Exhausted { last: err, .. } => err,
        }
    }

    /// Consume and return the error of the final attempt.
    pub fn into_last_error(self) -> E {
        match self {
            Self::Fatal(err) | Self::Exhausted { last: err, .. } => err,
        }
    }

    /// Whether the controller gave up because attempts ran out.
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Run `operation` until it succeeds, fails fatally or attempts run out.
///
/// `operation` receives the 1-based attempt number.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: F,
) -> Result<T, RetryError<E>>
where
    E: Retryable + core::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_retry_observed(policy, operation, |_| {}).await
}

/// [`with_retry`] that reports every failed attempt before sleeping.
pub async fn with_retry_observed<T, E, F, Fut, O>(
    policy: &RetryPolicy,
    mut operation: F,
    mut observe: O,
) -> Result<T, RetryError<E>>
where
    E: Retryable + core::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    O: FnMut(&RetryAttempt<E>),
{
    let mut attempt_number: u32 = 1;
    loop {
        let last_error = match operation(attempt_number).await {
            Ok(value) => {
                if attempt_number > 1 {
                    debug!(attempt = attempt_number, "call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !last_error.is_retryable() {
            debug!(
                attempt = attempt_number,
                error = %last_error,
                "failure is not retryable"
            );
            return Err(RetryError::Fatal(last_error));
        }

        if !policy.permits_retry(attempt_number) {
            warn!(
                attempts = attempt_number,
                error = %last_error,
                "retries exhausted"
            );
            return Err(RetryError::Exhausted {
                attempts: attempt_number,
                last: last_error,
            });
        }

        let next_delay = policy.delay_for(attempt_number);
        debug!(
            attempt = attempt_number,
            delay = ?next_delay,
            error = %last_error,
            "call failed, retrying"
        );
        observe(&RetryAttempt {
            attempt_number,
            last_error,
            next_delay,
        });

        tokio::time::sleep(next_delay).await;
        attempt_number = attempt_number.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::transport::Operation;

    fn fault() -> TransportError {
        TransportError::ServerFault {
            operation: Operation::GetStatus,
            status: 503,
        }
    }

    fn unauthorized() -> TransportError {
        TransportError::Unauthorized {
            operation: Operation::SubmitEmergency,
        }
    }

    /// Fails the first `failures` attempts, then returns the attempt number.
    async fn run(
        policy: RetryPolicy,
        failures: u32,
    ) -> (Result<u32, RetryError<TransportError>>, u32) {
        let mut calls = 0_u32;
        let result = with_retry(&policy, |n| {
            calls = calls.saturating_add(1);
            let outcome = if n <= failures { Err(fault()) } else { Ok(n) };
            async move { outcome }
        })
        .await;
        (result, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let start = Instant::now();
        let (result, calls) = run(RetryPolicy::one_shot(), 2).await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls, 3);
        assert_eq!(start.elapsed(), Duration::from_millis(2_000));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_exactly_max_attempts() {
        for failures in [3, 4, 10] {
            let (result, calls) = run(RetryPolicy::one_shot(), failures).await;
            assert_eq!(calls, 3);
            assert_eq!(
                result,
                Err(RetryError::Exhausted {
                    attempts: 3,
                    last: fault()
                })
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_try_success_does_not_sleep() {
        let start = Instant::now();
        let (result, calls) = run(RetryPolicy::one_shot(), 0).await;
        assert_eq!(result, Ok(1));
        assert_eq!(calls, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_is_never_retried() {
        let mut calls = 0_u32;
        let result: Result<(), _> = with_retry(&RetryPolicy::one_shot(), |_| {
            calls = calls.saturating_add(1);
            async { Err(unauthorized()) }
        })
        .await;
        assert_eq!(calls, 1);
        assert_eq!(result, Err(RetryError::Fatal(unauthorized())));
    }

    #[tokio::test(start_paused = true)]
    async fn linear_backoff_grows_with_attempts() {
        let policy = RetryPolicy::linear(4, Duration::from_millis(100));
        let mut delays = Vec::new();
        let start = Instant::now();
        let result = with_retry_observed(
            &policy,
            |n| {
                let outcome = if n <= 3 { Err(fault()) } else { Ok(n) };
                async move { outcome }
            },
            |attempt| delays.push(attempt.next_delay),
        )
        .await;
        assert_eq!(result, Ok(4));
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300)
            ]
        );
        assert_eq!(start.elapsed(), Duration::from_millis(600));
    }

    #[test]
    fn policy_limits() {
        let unbounded = RetryPolicy::status_polling();
        assert!(unbounded.permits_retry(u32::MAX));
        assert_eq!(unbounded.delay_for(7), Duration::from_secs(2));

        let never = RetryPolicy::fixed(0, Duration::from_millis(5));
        assert_eq!(never.max_attempts, Some(1));
        assert!(!never.permits_retry(1));
    }

    #[test]
    fn exhausted_error_keeps_last_failure() {
        let err = RetryError::Exhausted {
            attempts: 3,
            last: fault(),
        };
        assert!(err.is_exhausted());
        assert_eq!(err.last_error(), &fault());
        assert_eq!(
            err.to_string(),
            "retries exhausted after 3 attempts: get_status: server fault (HTTP 503)"
        );
    }
}
