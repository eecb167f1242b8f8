//! Polling until a remote resource converges on a target status.
//!
//! Most Open Telekom Cloud operations are asynchronous: the API accepts the
//! request and the resource then walks through a vocabulary of transitional
//! statuses (`BUILD`, `PENDING_UPDATE`, `RUNNING`, ...) before it settles.
//! [`StateChangeConf`] describes one such vocabulary and polls a refresh
//! function until the resource reaches one of the target statuses.
//!
//! # Example
//!
//! ```ignore
//! let conf = StateChangeConf::new(&["BUILD"], &["ACTIVE"], Duration::from_secs(600))
//!     .with_poll(client.poll());
//! let server = conf
//!     .wait_for_state(|| async {
//!         let server = client.get_server(&id).await?;
//!         let status = server.status.clone();
//!         Ok(Some((server, status)))
//!     })
//!     .await?;
//! ```

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, trace};

use crate::config::PollConfig;

pub const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;

const INITIAL_WAIT: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(180);
const RETRY_MIN_TIMEOUT: Duration = Duration::from_millis(500);

const RETRY_PENDING: &str = "retryableerror";
const RETRY_TARGET: &str = "success";

/// Result of a single refresh: `None` when the resource does not exist,
/// otherwise the resource together with its current status.
pub type Refreshed<T> = Option<(T, String)>;

#[derive(Debug, Error)]
pub enum WaitError<E> {
    #[error(
        "timeout while waiting for state to become '{}' (last state: '{last_state}', timeout: {timeout:?})",
        .expected.join(", ")
    )]
    Timeout {
        last_state: String,
        expected: Vec<String>,
        timeout: Duration,
    },

    #[error("unexpected state '{state}', wanted target '{}'", .expected.join(", "))]
    UnexpectedState { state: String, expected: Vec<String> },

    #[error("couldn't find resource ({checks} retries)")]
    NotFound { checks: u32 },

    #[error("wait reached '{state}' without a result")]
    NoResult { state: String },

    #[error(transparent)]
    Refresh(E),
}

impl<E> WaitError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }
}

#[derive(Debug, Clone)]
pub struct StateChangeConf {
    /// Statuses that keep the wait going. When non-empty, any status outside
    /// `pending` and `target` aborts the wait.
    pub pending: Vec<String>,
    pub target: Vec<String>,
    pub timeout: Duration,
    /// Sleep before the first refresh.
    pub delay: Duration,
    /// Lower bound for the backoff between refreshes.
    pub min_timeout: Duration,
    /// Fixed interval between refreshes, overriding the backoff.
    pub poll_interval: Option<Duration>,
    /// Consecutive "not found" refreshes tolerated before giving up.
    pub not_found_checks: u32,
    /// Consecutive target observations required before returning.
    pub continuous_target_occurence: u32,
}

impl StateChangeConf {
    pub fn new(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            timeout,
            delay: Duration::ZERO,
            min_timeout: Duration::ZERO,
            poll_interval: None,
            not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
            continuous_target_occurence: 1,
        }
    }

    pub fn with_poll(mut self, poll: &PollConfig) -> Self {
        self.delay = poll.delay;
        self.min_timeout = poll.min_timeout;
        self.poll_interval = poll.poll_interval;
        self
    }

    /// Polls `refresh` until the returned status is one of `target`.
    ///
    /// Returns `Ok(None)` only when `target` is empty and the resource
    /// disappeared. Errors from `refresh` are returned immediately as
    /// [`WaitError::Refresh`]; callers that wait for a deletion map a 404 to
    /// a `DELETED` status inside `refresh` instead of returning it.
    pub async fn wait_for_state<T, E, F, Fut>(&self, mut refresh: F) -> Result<Option<T>, WaitError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Refreshed<T>, E>>,
    {
        debug!(
            pending = ?self.pending,
            target = ?self.target,
            timeout = ?self.timeout,
            "waiting for state"
        );

        let mut last_state = String::new();
        let outcome =
            tokio::time::timeout(self.timeout, self.poll(&mut refresh, &mut last_state)).await;

        match outcome {
            Ok(result) => result,
            Err(_) => Err(WaitError::Timeout {
                last_state,
                expected: self.target.clone(),
                timeout: self.timeout,
            }),
        }
    }

    async fn poll<T, E, F, Fut>(
        &self,
        refresh: &mut F,
        last_state: &mut String,
    ) -> Result<Option<T>, WaitError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Refreshed<T>, E>>,
    {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let required = self.continuous_target_occurence.max(1);
        let mut wait = INITIAL_WAIT;
        let mut not_found_ticks = 0u32;
        let mut target_occurence = 0u32;

        loop {
            match refresh().await.map_err(WaitError::Refresh)? {
                None => {
                    if self.target.is_empty() {
                        target_occurence += 1;
                        if target_occurence >= required {
                            return Ok(None);
                        }
                    } else {
                        not_found_ticks += 1;
                        if not_found_ticks > self.not_found_checks {
                            return Err(WaitError::NotFound {
                                checks: not_found_ticks,
                            });
                        }
                    }
                }
                Some((resource, state)) => {
                    not_found_ticks = 0;
                    trace!(state = %state, "refreshed");

                    if self.target.iter().any(|t| *t == state) {
                        target_occurence += 1;
                        if target_occurence >= required {
                            return Ok(Some(resource));
                        }
                    } else if self.pending.iter().any(|p| *p == state) {
                        target_occurence = 0;
                    } else if !self.pending.is_empty() {
                        return Err(WaitError::UnexpectedState {
                            state,
                            expected: self.target.clone(),
                        });
                    } else {
                        target_occurence = 0;
                    }

                    *last_state = state;
                }
            }

            // Back off exponentially, except while the target must reoccur.
            if target_occurence == 0 {
                wait *= 2;
            }
            wait = match self.poll_interval {
                Some(interval) if !interval.is_zero() && interval < MAX_POLL_INTERVAL => interval,
                _ if wait < self.min_timeout => self.min_timeout,
                _ if wait > MAX_BACKOFF => MAX_BACKOFF,
                _ => wait,
            };

            trace!(wait = ?wait, "sleeping before next refresh");
            sleep(wait).await;
        }
    }
}

/// Classification of a failed attempt inside [`retry`].
#[derive(Debug)]
pub enum RetryError<E> {
    Retryable(E),
    NonRetryable(E),
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Retryable(e) | RetryError::NonRetryable(e) => e,
        }
    }
}

/// Calls `operation` until it succeeds, fails with a non-retryable error, or
/// `timeout` elapses.
///
/// On timeout the last retryable error is returned as
/// [`WaitError::Refresh`]; a plain [`WaitError::Timeout`] is only returned if
/// no attempt finished within the deadline.
pub async fn retry<T, E, F, Fut>(timeout: Duration, mut operation: F) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
{
    let last_error: Mutex<Option<E>> = Mutex::new(None);
    let slot = &last_error;

    let mut conf = StateChangeConf::new(&[RETRY_PENDING], &[RETRY_TARGET], timeout);
    conf.min_timeout = RETRY_MIN_TIMEOUT;

    let outcome = conf
        .wait_for_state(|| {
            let attempt = operation();
            async move {
                match attempt.await {
                    Ok(value) => Ok(Some((Some(value), RETRY_TARGET.to_string()))),
                    Err(RetryError::Retryable(e)) => {
                        if let Ok(mut guard) = slot.lock() {
                            *guard = Some(e);
                        }
                        Ok(Some((None, RETRY_PENDING.to_string())))
                    }
                    Err(RetryError::NonRetryable(e)) => Err(e),
                }
            }
        })
        .await;

    let last_error = last_error.into_inner().ok().flatten();

    match (outcome, last_error) {
        (Ok(Some(Some(value))), _) => Ok(value),
        // Only a successful attempt reports the target status, and it always
        // carries its value.
        (Ok(Some(None) | None), _) => Err(WaitError::NoResult {
            state: RETRY_TARGET.to_string(),
        }),
        (Err(WaitError::Timeout { .. }), Some(e)) => Err(WaitError::Refresh(e)),
        (Err(e), _) => Err(e),
    }
}
