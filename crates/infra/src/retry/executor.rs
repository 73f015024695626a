//! Backoff executor: wraps one fallible remote call.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::policy::RetryPolicy;

/// How a failure should be treated by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// The remote asked us to slow down; retry after a delay.
    Throttled,
    /// Anything else; surface immediately.
    Fatal,
}

/// Failure classification for remote errors.
pub trait Classify {
    fn classify(&self) -> RetryClass;
}

impl Classify for libris_ai::GenerationError {
    fn classify(&self) -> RetryClass {
        if self.is_throttled() {
            RetryClass::Throttled
        } else {
            RetryClass::Fatal
        }
    }
}

/// Error returned by [`BackoffExecutor::execute_cancellable`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError<E> {
    /// The call failed (fatal, or throttled with no attempts left).
    #[error("{0}")]
    Call(#[source] E),
    /// Cancellation was observed before `attempt` could start.
    #[error("cancelled before attempt {attempt}")]
    Cancelled { attempt: u32 },
}

/// Per-call retry bookkeeping. Created for each call and dropped afterwards.
#[derive(Debug, Clone, Copy)]
struct RetryState {
    attempt: u32,
    base_delay: Duration,
    max_attempts: u32,
}

impl RetryState {
    fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            base_delay: policy.base_delay,
            max_attempts: policy.max_attempts.max(1),
        }
    }
}

/// Retries throttled calls with exponential backoff.
///
/// The sleep between attempts is a `tokio::time::sleep`, so waiting never
/// blocks the worker thread.
#[derive(Debug, Clone, Default)]
pub struct BackoffExecutor {
    policy: RetryPolicy,
}

impl BackoffExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `call` until it succeeds, fails fatally, or attempts run out.
    pub async fn execute<T, E, F, Fut>(&self, call: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display,
    {
        match self.run(None, call).await {
            Ok(value) => Ok(value),
            Err(RetryError::Call(e)) => Err(e),
            Err(RetryError::Cancelled { .. }) => unreachable!("no cancellation token supplied"),
        }
    }

    /// Like [`execute`](Self::execute), but stops at attempt boundaries once
    /// `cancel` fires. An in-flight call is never interrupted.
    pub async fn execute_cancellable<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display,
    {
        self.run(Some(cancel), call).await
    }

    async fn run<T, E, F, Fut>(
        &self,
        cancel: Option<&CancellationToken>,
        mut call: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display,
    {
        let mut state = RetryState::new(&self.policy);

        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(RetryError::Cancelled {
                    attempt: state.attempt + 1,
                });
            }

            state.attempt += 1;
            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if err.classify() == RetryClass::Fatal {
                debug!(attempt = state.attempt, error = %err, "remote call failed (not retryable)");
                return Err(RetryError::Call(err));
            }

            if !self.policy.should_retry(state.attempt) {
                warn!(
                    attempts = state.attempt,
                    error = %err,
                    "remote call still throttled; giving up"
                );
                return Err(RetryError::Call(err));
            }

            let delay = self.policy.delay_for_attempt(state.attempt);
            warn!(
                attempt = state.attempt,
                max_attempts = state.max_attempts,
                base_delay_ms = state.base_delay.as_millis() as u64,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "remote call throttled; backing off"
            );

            match cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => {
                            return Err(RetryError::Cancelled {
                                attempt: state.attempt + 1,
                            });
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::time::Instant;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    enum TestError {
        #[error("throttled on attempt {0}")]
        Throttled(u32),
        #[error("fatal")]
        Fatal,
    }

    impl Classify for TestError {
        fn classify(&self) -> RetryClass {
            match self {
                TestError::Throttled(_) => RetryClass::Throttled,
                TestError::Fatal => RetryClass::Fatal,
            }
        }
    }

    /// Records the instant of every attempt; throttles the first `throttled` ones.
    fn scripted(
        throttled: u32,
        calls: Arc<Mutex<Vec<Instant>>>,
    ) -> impl FnMut() -> std::future::Ready<Result<&'static str, TestError>> {
        move || {
            let mut calls = calls.lock().unwrap();
            calls.push(Instant::now());
            let n = calls.len() as u32;
            if n <= throttled {
                std::future::ready(Err(TestError::Throttled(n)))
            } else {
                std::future::ready(Ok("done"))
            }
        }
    }

    fn gaps(calls: &[Instant]) -> Vec<Duration> {
        calls.windows(2).map(|w| w[1] - w[0]).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_calls_back_off_1_2_4_seconds() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let executor = BackoffExecutor::default();
        let started = Instant::now();

        let result = executor.execute(scripted(3, calls.clone())).await;

        assert_eq!(result, Ok("done"));
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 4);
        assert_eq!(
            gaps(&calls),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
        assert_eq!(started.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt_does_not_sleep() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let started = Instant::now();

        let result = BackoffExecutor::default().execute(scripted(0, calls.clone())).await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_errors_are_not_retried() {
        let mut attempts = 0u32;
        let result: Result<(), TestError> = BackoffExecutor::default()
            .execute(|| {
                attempts += 1;
                std::future::ready(Err(TestError::Fatal))
            })
            .await;

        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_returns_last_throttled_error() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let started = Instant::now();

        let result = BackoffExecutor::default().execute(scripted(u32::MAX, calls.clone())).await;

        assert_eq!(result, Err(TestError::Throttled(5)));
        assert_eq!(calls.lock().unwrap().len(), 5);
        assert_eq!(started.elapsed(), Duration::from_secs(1 + 2 + 4 + 8));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_backoff_stops_before_next_attempt() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let token = CancellationToken::new();
        let executor = BackoffExecutor::default();

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                token.cancel();
            })
        };

        let result = executor
            .execute_cancellable(&token, scripted(u32::MAX, calls.clone()))
            .await;
        canceller.await.unwrap();

        // Attempt 1 at t=0, attempt 2 at t=1s, cancelled while waiting 2s.
        assert_eq!(result, Err(RetryError::Cancelled { attempt: 3 }));
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_token_prevents_first_attempt() {
        let token = CancellationToken::new();
        token.cancel();
        let mut attempts = 0u32;

        let result: Result<(), RetryError<TestError>> = BackoffExecutor::default()
            .execute_cancellable(&token, || {
                attempts += 1;
                std::future::ready(Ok(()))
            })
            .await;

        assert_eq!(result, Err(RetryError::Cancelled { attempt: 1 }));
        assert_eq!(attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_cancellable_call_keeps_the_remote_error_as_source() {
        use std::error::Error as _;

        let calls = Arc::new(Mutex::new(Vec::new()));
        let token = CancellationToken::new();

        let err = BackoffExecutor::default()
            .execute_cancellable(&token, scripted(u32::MAX, calls.clone()))
            .await
            .unwrap_err();

        assert_eq!(err, RetryError::Call(TestError::Throttled(5)));
        assert_eq!(err.to_string(), "throttled on attempt 5");
        let source = err.source().expect("remote error is the source");
        assert_eq!(source.to_string(), "throttled on attempt 5");

        let cancelled: RetryError<TestError> = RetryError::Cancelled { attempt: 3 };
        assert_eq!(cancelled.to_string(), "cancelled before attempt 3");
        assert!(cancelled.source().is_none());
    }
}
