//! Operation handles, status snapshots and per-kind wait policies
//!
//! Every asynchronous control-plane operation is identified by an
//! [`OperationHandle`] and observed through [`OperationStatus`] snapshots.
//! The state vocabulary differs per [`OperationKind`]; a [`WaitPolicy`]
//! captures which states end the wait and which of those count as success.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Polling interval for tenant transactions
pub const TRANSACTION_INTERVAL: Duration = Duration::from_secs(3);

/// Polling interval for FMC domain tasks
pub const TASK_INTERVAL: Duration = Duration::from_secs(5);

/// Polling interval for fleet upgrade runs
pub const UPGRADE_RUN_INTERVAL: Duration = Duration::from_secs(5);

const TRANSACTION_TERMINAL: &[&str] = &["DONE", "ERROR", "CANCELLED"];
const TRANSACTION_SUCCESS: &[&str] = &["DONE"];

// The task API reports success under several spellings.
const TASK_TERMINAL: &[&str] = &["SUCCEEDED", "SUCCESS", "COMPLETED", "Deployed", "FAILED"];
const TASK_SUCCESS: &[&str] = &["SUCCEEDED", "SUCCESS", "COMPLETED", "Deployed"];

const UPGRADE_RUN_TERMINAL: &[&str] = &[
    "UPGRADE_STAGED",
    "UPGRADE_STAGING_FAILED",
    "UPGRADE_COMPLETED",
    "UPGRADE_FAILED",
];
const UPGRADE_RUN_SUCCESS: &[&str] = &["UPGRADE_STAGED", "UPGRADE_COMPLETED"];

/// The family an asynchronous operation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// MSP portal transaction (tenant creation, user creation, cdFMC provisioning)
    TenantTransaction,
    /// Job scoped to a cdFMC domain (device backups)
    DomainTask,
    /// Multi-device upgrade run
    UpgradeRun,
}

impl OperationKind {
    /// The state vocabulary and interval the control plane uses for this kind
    pub fn default_policy(self) -> WaitPolicy {
        let (terminal, success, interval) = match self {
            OperationKind::TenantTransaction => {
                (TRANSACTION_TERMINAL, TRANSACTION_SUCCESS, TRANSACTION_INTERVAL)
            }
            OperationKind::DomainTask => (TASK_TERMINAL, TASK_SUCCESS, TASK_INTERVAL),
            OperationKind::UpgradeRun => {
                (UPGRADE_RUN_TERMINAL, UPGRADE_RUN_SUCCESS, UPGRADE_RUN_INTERVAL)
            }
        };
        WaitPolicy {
            terminal_states: terminal.iter().map(|s| s.to_string()).collect(),
            success_states: success.iter().map(|s| s.to_string()).collect(),
            interval,
            deadline: None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::TenantTransaction => write!(f, "transaction"),
            OperationKind::DomainTask => write!(f, "task"),
            OperationKind::UpgradeRun => write!(f, "upgrade run"),
        }
    }
}

/// Opaque reference to a submitted operation
///
/// Created once by the call that starts the operation and never modified.
/// Domain tasks also carry the cdFMC domain they run in, since their status
/// endpoint is domain-scoped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationHandle {
    kind: OperationKind,
    id: String,
    domain_uid: Option<String>,
}

impl OperationHandle {
    pub fn transaction(uid: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::TenantTransaction,
            id: uid.into(),
            domain_uid: None,
        }
    }

    pub fn domain_task(domain_uid: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::DomainTask,
            id: task_id.into(),
            domain_uid: Some(domain_uid.into()),
        }
    }

    pub fn upgrade_run(uid: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::UpgradeRun,
            id: uid.into(),
            domain_uid: None,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The cdFMC domain for domain tasks, `None` for every other kind
    pub fn domain_uid(&self) -> Option<&str> {
        self.domain_uid.as_deref()
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// A single observation of an operation's progress
///
/// `detail` holds whatever richer structure the status source returns
/// (per-device upgrade statuses, transaction metadata). The waiter only
/// ever reads `state`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationStatus<D> {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<D>,
}

impl<D> OperationStatus<D> {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            message: None,
            detail: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_detail(mut self, detail: D) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// The state machine a wait runs under
///
/// `success_states` is always a subset of `terminal_states`. Comparison is
/// exact: `Deployed` and `DEPLOYED` are different states.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitPolicy {
    terminal_states: BTreeSet<String>,
    success_states: BTreeSet<String>,
    interval: Duration,
    deadline: Option<Duration>,
}

impl WaitPolicy {
    /// Build a policy from caller-supplied vocabularies
    ///
    /// Fails with [`CoreError::Config`] if the terminal set is empty or a
    /// success state is not terminal.
    pub fn new<T, S>(terminal_states: T, success_states: S, interval: Duration) -> Result<Self>
    where
        T: IntoIterator,
        T::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        let terminal_states: BTreeSet<String> =
            terminal_states.into_iter().map(Into::into).collect();
        let success_states: BTreeSet<String> =
            success_states.into_iter().map(Into::into).collect();

        if terminal_states.is_empty() {
            return Err(CoreError::Config(
                "wait policy needs at least one terminal state".to_string(),
            ));
        }
        if let Some(stray) = success_states.difference(&terminal_states).next() {
            return Err(CoreError::Config(format!(
                "success state '{}' is not a terminal state",
                stray
            )));
        }

        Ok(Self {
            terminal_states,
            success_states,
            interval,
            deadline: None,
        })
    }

    /// Replace the interval between polls
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Bound the total wait. `None` waits until a terminal state is seen.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn terminal_states(&self) -> impl Iterator<Item = &str> {
        self.terminal_states.iter().map(String::as_str)
    }

    pub fn success_states(&self) -> impl Iterator<Item = &str> {
        self.success_states.iter().map(String::as_str)
    }

    pub fn is_terminal(&self, state: &str) -> bool {
        self.terminal_states.contains(state)
    }

    pub fn is_success(&self, state: &str) -> bool {
        self.success_states.contains(state)
    }
}
