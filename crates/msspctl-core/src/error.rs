//! Unified error handling for msspctl-core
//!
//! [`TransportError`] means we could not find out what an operation is doing.
//! [`CoreError::OperationFailed`] means the control plane told us it failed.
//!
//! # Example
//!
//! ```rust
//! use msspctl_core::{CoreError, TransportError};
//!
//! let err: CoreError = TransportError::Unauthorized {
//!     status: 401,
//!     message: "token expired".to_string(),
//! }
//! .into();
//! assert!(err.is_unauthorized());
//! assert!(err.is_transport());
//! assert!(!err.is_operation_failed());
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::operation::OperationKind;

/// The status source could not be reached or returned something unusable
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection, TLS or timeout failure from the HTTP layer
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// 401/403 from the control plane
    #[error("Unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// Any other non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Body was not the JSON shape we expected
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Returns true for 5xx responses and connection-level failures
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Request(e) => e.is_timeout() || e.is_connect(),
            TransportError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Core error type for workflows and status sources
#[derive(Error, Debug)]
pub enum CoreError {
    /// Could not reach or understand the control plane
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The operation settled in a terminal state outside the success set
    #[error("{kind} {id} failed with status {state}{}", message_suffix(.message))]
    OperationFailed {
        kind: OperationKind,
        id: String,
        state: String,
        message: Option<String>,
    },

    /// The wait was cancelled before the operation settled
    #[error("Stopped waiting for {kind} {id}: cancelled")]
    Cancelled { kind: OperationKind, id: String },

    /// The wait exceeded its deadline
    #[error("Stopped waiting for {kind} {id} after {elapsed:?}")]
    TimedOut {
        kind: OperationKind,
        id: String,
        elapsed: Duration,
    },

    /// A response lacked something the workflow needs to continue
    #[error("Validation error: {0}")]
    Validation(String),

    /// Caller-side problem (bad policy, missing or malformed input)
    #[error("Configuration error: {0}")]
    Config(String),
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Returns true if the control plane could not be reached or understood
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, CoreError::Transport(_))
    }

    /// Returns true if this is an authentication/authorization error (401/403)
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            CoreError::Transport(TransportError::Unauthorized { .. })
        )
    }

    /// Returns true if the operation itself reported failure
    #[must_use]
    pub fn is_operation_failed(&self) -> bool {
        matches!(self, CoreError::OperationFailed { .. })
    }

    /// Returns true if this is a "not found" error (404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::Transport(TransportError::Http { status: 404, .. })
        )
    }

    /// Returns true if retrying the whole command might help
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Transport(e) => e.is_retryable(),
            CoreError::TimedOut { .. } => true,
            _ => false,
        }
    }
}
