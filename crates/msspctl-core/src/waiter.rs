//! Waiting for asynchronous control-plane operations to settle
//!
//! Transactions, domain tasks and upgrade runs all follow the same shape:
//! a start call hands back an [`OperationHandle`], and a status endpoint is
//! polled until the operation reaches a terminal state. [`AsyncOperationWaiter`]
//! runs that loop once for every kind; the state vocabulary comes from a
//! [`WaitPolicy`] and the status fetch from the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use msspctl_core::{AsyncOperationWaiter, OperationHandle, OperationKind};
//!
//! let waiter = AsyncOperationWaiter::for_kind(OperationKind::TenantTransaction);
//! let handle = OperationHandle::transaction("a1b2c3");
//!
//! let done = waiter
//!     .wait_on(&client, &handle, |status| {
//!         spinner.set_message(format!("{}: {}", handle, status.state));
//!     })
//!     .await?;
//! ```

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CoreError, TransportError};
use crate::operation::{OperationHandle, OperationKind, OperationStatus, WaitPolicy};

/// Something that can report the current status of an operation
///
/// Implementations own their transport and credentials; the waiter only
/// calls [`fetch_status`](StatusSource::fetch_status) with a stable handle.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Structured payload carried alongside the state
    type Detail: Send;

    /// The only kind of handle this source can report on
    fn kind(&self) -> OperationKind;

    async fn fetch_status(
        &self,
        handle: &OperationHandle,
    ) -> Result<OperationStatus<Self::Detail>, TransportError>;
}

/// Why a wait ended without a successful terminal status
#[derive(Error, Debug)]
pub enum WaitError<D> {
    /// The handle names an operation the status source cannot look up
    #[error("expected {expected} handle, got {handle}")]
    UnsupportedHandle {
        handle: OperationHandle,
        expected: OperationKind,
    },

    /// The status source failed; no further polls were made
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The operation reached a terminal state outside the success set
    #[error("{handle} failed with status {}", .status.state)]
    OperationFailed {
        handle: OperationHandle,
        status: OperationStatus<D>,
    },

    /// The cancellation token fired before the operation settled
    #[error("stopped waiting for {handle}: cancelled")]
    Cancelled {
        handle: OperationHandle,
        last_status: Option<OperationStatus<D>>,
    },

    /// The policy deadline passed before the operation settled
    #[error("stopped waiting for {handle} after {elapsed:?}")]
    TimedOut {
        handle: OperationHandle,
        elapsed: Duration,
        last_status: Option<OperationStatus<D>>,
    },
}

impl<D> WaitError<D> {
    /// The last status observed before the wait ended, if any
    pub fn last_status(&self) -> Option<&OperationStatus<D>> {
        match self {
            WaitError::UnsupportedHandle { .. } | WaitError::Transport(_) => None,
            WaitError::OperationFailed { status, .. } => Some(status),
            WaitError::Cancelled { last_status, .. } | WaitError::TimedOut { last_status, .. } => {
                last_status.as_ref()
            }
        }
    }
}

impl<D> From<WaitError<D>> for CoreError {
    fn from(err: WaitError<D>) -> Self {
        match err {
            WaitError::UnsupportedHandle { handle, expected } => CoreError::Config(format!(
                "Expected {} handle, got {}",
                expected, handle
            )),
            WaitError::Transport(e) => CoreError::Transport(e),
            WaitError::OperationFailed { handle, status } => CoreError::OperationFailed {
                kind: handle.kind(),
                id: handle.id().to_string(),
                state: status.state,
                message: status.message,
            },
            WaitError::Cancelled { handle, .. } => CoreError::Cancelled {
                kind: handle.kind(),
                id: handle.id().to_string(),
            },
            WaitError::TimedOut {
                handle, elapsed, ..
            } => CoreError::TimedOut {
                kind: handle.kind(),
                id: handle.id().to_string(),
                elapsed,
            },
        }
    }
}

/// Polls one operation at a time until it settles
///
/// The waiter holds only its policy and an optional cancellation token, so a
/// single instance can drive any number of concurrent waits.
#[derive(Debug, Clone)]
pub struct AsyncOperationWaiter {
    policy: WaitPolicy,
    cancel: Option<CancellationToken>,
}

impl AsyncOperationWaiter {
    pub fn new(policy: WaitPolicy) -> Self {
        Self {
            policy,
            cancel: None,
        }
    }

    /// Waiter using the control plane's vocabulary and interval for `kind`
    pub fn for_kind(kind: OperationKind) -> Self {
        Self::new(kind.default_policy())
    }

    /// Stop waiting as soon as `token` is cancelled
    ///
    /// The token is checked before every poll and raced against every sleep.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn policy(&self) -> &WaitPolicy {
        &self.policy
    }

    /// Poll `handle` with `poll_fn` until a terminal state is observed
    ///
    /// The first poll happens immediately. `on_update` sees every status that
    /// was fetched, including the terminal one, and never the result of a
    /// failed fetch. Transport errors end the wait without retry.
    ///
    /// # Errors
    ///
    /// - [`WaitError::Transport`] if `poll_fn` fails
    /// - [`WaitError::OperationFailed`] for a terminal state outside the success set
    /// - [`WaitError::Cancelled`] if the cancellation token fires
    /// - [`WaitError::TimedOut`] if the policy deadline passes
    pub async fn wait<D, F, Fut, U>(
        &self,
        handle: &OperationHandle,
        mut poll_fn: F,
        mut on_update: U,
    ) -> Result<OperationStatus<D>, WaitError<D>>
    where
        F: FnMut(OperationHandle) -> Fut,
        Fut: Future<Output = Result<OperationStatus<D>, TransportError>>,
        U: FnMut(&OperationStatus<D>),
    {
        let started = Instant::now();
        let interval = self.policy.interval();
        let mut last_status: Option<OperationStatus<D>> = None;
        let mut polls: u32 = 0;

        loop {
            if self.is_cancelled() {
                info!(operation = %handle, polls, "Wait cancelled");
                return Err(WaitError::Cancelled {
                    handle: handle.clone(),
                    last_status,
                });
            }

            let status = poll_fn(handle.clone()).await?;
            polls += 1;
            debug!(
                operation = %handle,
                state = %status.state,
                poll = polls,
                elapsed = ?started.elapsed(),
                "Polled operation status"
            );
            on_update(&status);

            if self.policy.is_terminal(&status.state) {
                if self.policy.is_success(&status.state) {
                    info!(operation = %handle, state = %status.state, polls, "Operation completed");
                    return Ok(status);
                }
                warn!(
                    operation = %handle,
                    state = %status.state,
                    reason = status.message.as_deref().unwrap_or(""),
                    "Operation failed"
                );
                return Err(WaitError::OperationFailed {
                    handle: handle.clone(),
                    status,
                });
            }

            last_status = Some(status);

            let mut pause = interval;
            if let Some(deadline) = self.policy.deadline() {
                let elapsed = started.elapsed();
                if elapsed >= deadline {
                    warn!(operation = %handle, ?elapsed, "Gave up waiting for operation");
                    return Err(WaitError::TimedOut {
                        handle: handle.clone(),
                        elapsed,
                        last_status,
                    });
                }
                // Never sleep past the deadline
                pause = pause.min(deadline - elapsed);
            }

            match &self.cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            info!(operation = %handle, polls, "Wait cancelled");
                            return Err(WaitError::Cancelled {
                                handle: handle.clone(),
                                last_status,
                            });
                        }
                        _ = tokio::time::sleep(pause) => {}
                    }
                }
                None => tokio::time::sleep(pause).await,
            }
        }
    }

    /// [`wait`](Self::wait) with the status fetch delegated to a [`StatusSource`]
    ///
    /// Fails with [`WaitError::UnsupportedHandle`] before polling if the
    /// handle's kind differs from the source's.
    pub async fn wait_on<S, U>(
        &self,
        source: &S,
        handle: &OperationHandle,
        on_update: U,
    ) -> Result<OperationStatus<S::Detail>, WaitError<S::Detail>>
    where
        S: StatusSource + ?Sized,
        U: FnMut(&OperationStatus<S::Detail>),
    {
        if handle.kind() != source.kind() {
            return Err(WaitError::UnsupportedHandle {
                handle: handle.clone(),
                expected: source.kind(),
            });
        }
        self.wait(
            handle,
            |h| async move { source.fetch_status(&h).await },
            on_update,
        )
        .await
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    type Step = Result<OperationStatus<()>, TransportError>;

    /// Replays a fixed sequence of poll results and records when each poll happened
    #[derive(Clone, Default)]
    struct Script {
        steps: Arc<Mutex<VecDeque<Step>>>,
        polled_at: Arc<Mutex<Vec<Instant>>>,
    }

    impl Script {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: Arc::new(Mutex::new(steps.into())),
                polled_at: Arc::default(),
            }
        }

        fn of_states(states: &[&str]) -> Self {
            Self::new(
                states
                    .iter()
                    .map(|s| Ok(OperationStatus::new(*s)))
                    .collect(),
            )
        }

        fn poll_fn(&self) -> impl FnMut(OperationHandle) -> std::future::Ready<Step> + '_ {
            move |_handle| {
                self.polled_at.lock().unwrap().push(Instant::now());
                let next = self
                    .steps
                    .lock()
                    .unwrap()
                    .pop_front()
                    .expect("polled past the end of the script");
                std::future::ready(next)
            }
        }

        fn poll_count(&self) -> usize {
            self.polled_at.lock().unwrap().len()
        }

        fn gaps(&self) -> Vec<Duration> {
            let times = self.polled_at.lock().unwrap();
            times.windows(2).map(|w| w[1] - w[0]).collect()
        }
    }

    fn transaction_waiter() -> AsyncOperationWaiter {
        AsyncOperationWaiter::for_kind(OperationKind::TenantTransaction)
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_success_status_after_non_terminal_polls() {
        let script = Script::of_states(&["PENDING", "PENDING", "DONE"]);
        let handle = OperationHandle::transaction("tx-1");
        let mut seen = Vec::new();

        let status = transaction_waiter()
            .wait(&handle, script.poll_fn(), |s| seen.push(s.state.clone()))
            .await
            .unwrap();

        assert_eq!(status.state, "DONE");
        assert_eq!(seen, vec!["PENDING", "PENDING", "DONE"]);
        assert_eq!(script.poll_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_exactly_the_interval_between_polls() {
        let script = Script::of_states(&["PENDING", "IN_PROGRESS", "PENDING", "DONE"]);
        let handle = OperationHandle::transaction("tx-2");

        transaction_waiter()
            .wait(&handle, script.poll_fn(), |_| {})
            .await
            .unwrap();

        assert_eq!(script.gaps(), vec![Duration::from_secs(3); 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_failure_carries_final_status() {
        let script = Script::new(vec![
            Ok(OperationStatus::new("PENDING")),
            Ok(OperationStatus::new("PENDING")),
            Ok(OperationStatus::new("ERROR").with_message("quota exceeded")),
        ]);
        let handle = OperationHandle::transaction("tx-3");
        let mut updates = 0;

        let err = transaction_waiter()
            .wait(&handle, script.poll_fn(), |_| updates += 1)
            .await
            .unwrap_err();

        match err {
            WaitError::OperationFailed { handle: h, status } => {
                assert_eq!(h, handle);
                assert_eq!(status.state, "ERROR");
                assert_eq!(status.message.as_deref(), Some("quota exceeded"));
            }
            other => panic!("expected OperationFailed, got {other:?}"),
        }
        assert_eq!(updates, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_transaction_is_a_failure() {
        let script = Script::of_states(&["CANCELLED"]);
        let handle = OperationHandle::transaction("tx-4");

        let err = transaction_waiter()
            .wait(&handle, script.poll_fn(), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::OperationFailed { .. }));
        assert_eq!(err.last_status().map(|s| s.state.as_str()), Some("CANCELLED"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_stops_polling_without_update() {
        let script = Script::new(vec![
            Ok(OperationStatus::new("PENDING")),
            Err(TransportError::Http {
                status: 502,
                message: "bad gateway".to_string(),
            }),
            Ok(OperationStatus::new("DONE")),
        ]);
        let handle = OperationHandle::transaction("tx-5");
        let mut seen = Vec::new();

        let err = transaction_waiter()
            .wait(&handle, script.poll_fn(), |s| seen.push(s.state.clone()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WaitError::Transport(TransportError::Http { status: 502, .. })
        ));
        assert_eq!(seen, vec!["PENDING"]);
        assert_eq!(script.poll_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_terminal_returns_without_sleeping() {
        let script = Script::of_states(&["DONE"]);
        let handle = OperationHandle::transaction("tx-6");
        let before = Instant::now();

        let status = transaction_waiter()
            .wait(&handle, script.poll_fn(), |_| {})
            .await
            .unwrap();

        assert_eq!(status.state, "DONE");
        assert_eq!(script.poll_count(), 1);
        assert_eq!(Instant::now() - before, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_waits_do_not_interfere() {
        let waiter = AsyncOperationWaiter::for_kind(OperationKind::DomainTask);
        let first = Script::new(vec![Ok(OperationStatus::new("SUCCESS").with_message("a"))]);
        let second = Script::new(vec![Ok(OperationStatus::new("FAILED").with_message("b"))]);
        let h1 = OperationHandle::domain_task("dom", "task-a");
        let h2 = OperationHandle::domain_task("dom", "task-b");

        let (r1, r2) = tokio::join!(
            waiter.wait(&h1, first.poll_fn(), |_| {}),
            waiter.wait(&h2, second.poll_fn(), |_| {}),
        );

        assert_eq!(r1.unwrap().message.as_deref(), Some("a"));
        match r2.unwrap_err() {
            WaitError::OperationFailed { handle, status } => {
                assert_eq!(handle.id(), "task-b");
                assert_eq!(status.message.as_deref(), Some("b"));
            }
            other => panic!("expected OperationFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_vocabulary_is_honoured() {
        let policy = WaitPolicy::new(
            ["Ready", "Broken"],
            ["Ready"],
            Duration::from_millis(250),
        )
        .unwrap();
        let script = Script::of_states(&["Provisioning", "DONE", "Ready"]);
        let handle = OperationHandle::transaction("custom");

        // "DONE" means nothing under this policy, so polling continues
        let status = AsyncOperationWaiter::new(policy)
            .wait(&handle, script.poll_fn(), |_| {})
            .await
            .unwrap();

        assert_eq!(status.state, "Ready");
        assert_eq!(script.gaps(), vec![Duration::from_millis(250); 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_poll() {
        let token = CancellationToken::new();
        token.cancel();
        let script = Script::of_states(&["DONE"]);
        let handle = OperationHandle::transaction("tx-7");

        let err = transaction_waiter()
            .with_cancellation(token)
            .wait(&handle, script.poll_fn(), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Cancelled { last_status: None, .. }));
        assert_eq!(script.poll_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_during_sleep_keeps_last_status() {
        let token = CancellationToken::new();
        let script = Script::of_states(&["PENDING", "PENDING", "DONE"]);
        let handle = OperationHandle::transaction("tx-8");
        let waiter = transaction_waiter().with_cancellation(token.clone());

        let canceller = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        };
        let (result, ()) = tokio::join!(waiter.wait(&handle, script.poll_fn(), |_| {}), canceller);

        match result.unwrap_err() {
            WaitError::Cancelled { last_status, .. } => {
                assert_eq!(last_status.unwrap().state, "PENDING");
            }
            other => panic!("expected Cancelled, got {other:?}"),
        }
        assert_eq!(script.poll_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_turns_long_wait_into_timeout() {
        let policy = OperationKind::UpgradeRun
            .default_policy()
            .with_deadline(Some(Duration::from_secs(12)));
        let script = Script::of_states(&["PENDING", "IN_PROGRESS", "IN_PROGRESS", "IN_PROGRESS"]);
        let handle = OperationHandle::upgrade_run("run-1");

        let err = AsyncOperationWaiter::new(policy)
            .wait(&handle, script.poll_fn(), |_| {})
            .await
            .unwrap_err();

        match err {
            WaitError::TimedOut {
                elapsed,
                last_status,
                ..
            } => {
                assert_eq!(elapsed, Duration::from_secs(12));
                assert_eq!(last_status.unwrap().state, "IN_PROGRESS");
            }
            other => panic!("expected TimedOut, got {other:?}"),
        }
        assert_eq!(script.poll_count(), 4);
    }

    #[test]
    fn test_wait_error_converts_to_core_error() {
        let err: WaitError<()> = WaitError::OperationFailed {
            handle: OperationHandle::transaction("tx-9"),
            status: OperationStatus::new("ERROR").with_message("quota exceeded"),
        };
        let core: CoreError = err.into();
        assert_eq!(
            core.to_string(),
            "transaction tx-9 failed with status ERROR: quota exceeded"
        );
    }

    struct FixedSource(&'static str);

    #[async_trait]
    impl StatusSource for FixedSource {
        type Detail = u32;

        fn kind(&self) -> OperationKind {
            OperationKind::UpgradeRun
        }

        async fn fetch_status(
            &self,
            handle: &OperationHandle,
        ) -> Result<OperationStatus<u32>, TransportError> {
            assert_eq!(handle.id(), "run-2");
            Ok(OperationStatus::new(self.0).with_detail(7))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_on_status_source_passes_detail_through() {
        let handle = OperationHandle::upgrade_run("run-2");
        let mut details = Vec::new();

        let status = AsyncOperationWaiter::for_kind(OperationKind::UpgradeRun)
            .wait_on(&FixedSource("UPGRADE_STAGED"), &handle, |s| {
                details.push(s.detail)
            })
            .await
            .unwrap();

        assert_eq!(status.detail, Some(7));
        assert_eq!(details, vec![Some(7)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_on_rejects_handle_of_another_kind() {
        let handle = OperationHandle::transaction("run-2");

        let err = AsyncOperationWaiter::for_kind(OperationKind::UpgradeRun)
            .wait_on(&FixedSource("UPGRADE_STAGED"), &handle, |_| {
                panic!("no status should be fetched")
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WaitError::UnsupportedHandle {
                expected: OperationKind::UpgradeRun,
                ..
            }
        ));
        let core: CoreError = err.into();
        assert!(matches!(core, CoreError::Config(_)));
        assert_eq!(
            core.to_string(),
            "Configuration error: Expected upgrade run handle, got transaction run-2"
        );
    }
}
