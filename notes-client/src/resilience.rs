//! Retry with exponential backoff around a single logical call.
//!
//! A call moves through [`CallState`]s: `Pending` for every attempt, then
//! either `Success`, `Failed`, or `RetryScheduled` followed by a new
//! `Pending`. Retries are strictly sequential: the next attempt is only
//! dispatched once the previous one has finished and the backoff delay has
//! elapsed.

use std::{future::Future, time::Duration};

use reqwest::StatusCode;

use crate::model::ErrorBody;

/// Outcome of one failed attempt, before classification.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request never got a response (connection refused, reset, DNS...).
    #[error("no response received: {0}")]
    NoResponse(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("server responded with {status}")]
    Status {
        status: StatusCode,
        body: Option<ErrorBody>,
    },

    /// Anything else, e.g. a success body that could not be decoded.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Network failures, timeouts and 5xx responses are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NoResponse(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => status.is_server_error(),
            Self::Other(_) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for every following one.
    pub base_delay: Duration,
    pub retryable: fn(&TransportError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            retryable: TransportError::is_retryable,
        }
    }
}

impl RetryPolicy {
    /// Delay slept before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Pending { attempt: u32 },
    RetryScheduled { retry: u32, delay: Duration },
    Success,
    Failed,
}

/// What happened during one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallReport {
    pub attempts: u32,
    /// Backoff delays slept, one per retry.
    pub delays: Vec<Duration>,
    pub states: Vec<CallState>,
}

impl CallReport {
    pub fn retries(&self) -> usize {
        self.delays.len()
    }

    fn enter(&mut self, state: CallState) {
        tracing::trace!("call state -> {:?}", state);
        self.states.push(state);
    }
}

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or
/// the policy runs out of retries. `attempt` must rebuild the same request
/// every time it is invoked.
pub async fn call_with_resilience<T, F, Fut>(
    policy: &RetryPolicy,
    mut attempt: F,
) -> (Result<T, TransportError>, CallReport)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut report = CallReport::default();

    loop {
        report.attempts += 1;
        report.enter(CallState::Pending {
            attempt: report.attempts,
        });

        let error = match attempt().await {
            Ok(value) => {
                report.enter(CallState::Success);
                return (Ok(value), report);
            }
            Err(e) => e,
        };

        let retry = report.attempts;
        if retry > policy.max_retries || !(policy.retryable)(&error) {
            report.enter(CallState::Failed);
            return (Err(error), report);
        }

        let delay = policy.backoff(retry);
        tracing::warn!(
            "Retrying request (attempt {}/{}) after {:?}: {}",
            retry,
            policy.max_retries,
            delay,
            error
        );
        report.enter(CallState::RetryScheduled { retry, delay });
        report.delays.push(delay);

        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use tokio::time::Instant;

    use super::*;

    fn server_error() -> TransportError {
        TransportError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: None,
        }
    }

    /// The paused clock lands on timer deadlines, rounded to the timer wheel
    /// resolution.
    fn assert_elapsed(started: Instant, expected: Duration) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(10),
            "elapsed {elapsed:?}, expected {expected:?}"
        );
    }

    #[test]
    fn backoff_doubles_from_base_delay() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(TransportError::NoResponse("refused".into()).is_retryable());
        assert!(TransportError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(server_error().is_retryable());
        assert!(
            TransportError::Status {
                status: StatusCode::BAD_GATEWAY,
                body: None
            }
            .is_retryable()
        );

        assert!(
            !TransportError::Status {
                status: StatusCode::NOT_FOUND,
                body: None
            }
            .is_retryable()
        );
        assert!(
            !TransportError::Status {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                body: None
            }
            .is_retryable()
        );
        assert!(!TransportError::Other("bad body".into()).is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn server_error_then_success_retries_once_after_one_second() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let (result, report) = call_with_resilience(&RetryPolicy::default(), || {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(server_error())
                } else {
                    Ok("saved")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "saved");
        assert_eq!(report.attempts, 2);
        assert_eq!(report.retries(), 1);
        assert_eq!(report.delays, [Duration::from_secs(1)]);
        assert_elapsed(started, Duration::from_secs(1));
        assert_eq!(
            report.states,
            [
                CallState::Pending { attempt: 1 },
                CallState::RetryScheduled {
                    retry: 1,
                    delay: Duration::from_secs(1)
                },
                CallState::Pending { attempt: 2 },
                CallState::Success,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_network_failure_exhausts_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let (result, report) = call_with_resilience(&RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(TransportError::NoResponse("connection refused".into())) }
        })
        .await;

        assert!(matches!(result, Err(TransportError::NoResponse(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            report.delays,
            [
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
        assert_elapsed(started, Duration::from_secs(7));
        assert_eq!(report.states.last(), Some(&CallState::Failed));
    }

    #[tokio::test(start_paused = true)]
    async fn client_errors_fail_immediately() {
        let calls = Arc::new(AtomicU32::new(0));

        let (result, report) = call_with_resilience(&RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(TransportError::Status {
                    status: StatusCode::UNPROCESSABLE_ENTITY,
                    body: None,
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.retries(), 0);
        assert_eq!(
            report.states,
            [CallState::Pending { attempt: 1 }, CallState::Failed]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn custom_predicate_and_cap_are_honoured() {
        let policy = RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(250),
            retryable: |e: &TransportError| matches!(e, TransportError::Timeout(_)),
        };
        let calls = Arc::new(AtomicU32::new(0));

        let (result, report) = call_with_resilience(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(TransportError::Timeout(Duration::from_secs(15))) }
        })
        .await;

        assert!(matches!(result, Err(TransportError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.delays, [Duration::from_millis(250)]);

        calls.store(0, Ordering::SeqCst);
        let (_, report) = call_with_resilience(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(server_error()) }
        })
        .await;
        assert_eq!(report.attempts, 1);
    }
}
