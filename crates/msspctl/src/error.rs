//! Error types for msspctl
//!
//! Library errors are folded into [`CliError`], which knows how to explain
//! itself (suggestions) and which exit code to leave with.

use std::time::Duration;

use colored::Colorize;
use msspctl_core::{ConfigError, CoreError, TransportError};
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: transaction 4f1c... failed with status ERROR: quota exceeded
///
///   tip: Inspect the transaction: msspctl transaction wait 4f1c... -o json
/// ```
pub struct CliDiagnostic {
    message: String,
    detail: Option<String>,
    tips: Vec<(String, Vec<String>)>,
}

impl CliDiagnostic {
    /// Start a new error diagnostic with the given message.
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            detail: None,
            tips: Vec::new(),
        }
    }

    /// Add a detail line below the error message.
    pub fn detail(mut self, text: &str) -> Self {
        self.detail = Some(text.to_string());
        self
    }

    /// Add a tip with optional example commands.
    pub fn tip(mut self, description: &str, commands: &[&str]) -> Self {
        self.tips.push((
            description.to_string(),
            commands.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        if let Some(detail) = &self.detail {
            eprintln!("  {}", detail);
        }

        for (description, commands) in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", description);
            for cmd in commands {
                eprintln!("      {}", cmd);
            }
        }
    }
}

/// Main error type for the msspctl application
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("No profile configured. Use 'msspctl profile set' to configure a profile.")]
    NoProfileConfigured,

    #[error("Missing API token for profile '{name}'")]
    MissingToken { name: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("API error: {message}")]
    ApiError { message: String },

    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// The operation reached a terminal state that is not a success
    #[error("{message}")]
    OperationFailed {
        kind: String,
        id: String,
        message: String,
    },

    #[error("Stopped waiting for {kind} {id}: interrupted")]
    Cancelled { kind: String, id: String },

    #[error("Timed out after {}s waiting for {kind} {id}", .elapsed.as_secs())]
    TimedOut {
        kind: String,
        id: String,
        elapsed: Duration,
    },

    /// The control plane answered, but not with what the workflow needs
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for msspctl operations
pub type Result<T> = std::result::Result<T, CliError>;

impl CliError {
    /// Process exit code for this error
    ///
    /// 1 operation failed or other error, 2 configuration, 3 transport,
    /// 124 timed out, 130 interrupted.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Configuration(_)
            | CliError::ProfileNotFound { .. }
            | CliError::NoProfileConfigured
            | CliError::MissingToken { .. }
            | CliError::InvalidInput { .. } => 2,
            CliError::AuthenticationFailed { .. }
            | CliError::ApiError { .. }
            | CliError::ConnectionError { .. } => 3,
            CliError::TimedOut { .. } => 124,
            CliError::Cancelled { .. } => 130,
            CliError::OperationFailed { .. }
            | CliError::UnexpectedResponse { .. }
            | CliError::OutputError { .. } => 1,
        }
    }

    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            CliError::ProfileNotFound { name } => vec![
                "List available profiles: msspctl profile list".to_string(),
                format!(
                    "Create profile '{}': msspctl profile set {} --region <region>",
                    name, name
                ),
            ],
            CliError::NoProfileConfigured => vec![
                "Create a profile: msspctl profile set <name> --region <region> --api-token <token>"
                    .to_string(),
                "Or export SCCFM_API_TOKEN (and SCCFM_REGION) for a one-off run".to_string(),
            ],
            CliError::MissingToken { name } => vec![
                format!(
                    "Store a token: msspctl profile set {} --region <region> --api-token <token>",
                    name
                ),
                "Or export SCCFM_API_TOKEN".to_string(),
                "Note: SCCFM_API_TOKEN is ignored when --config-file is given".to_string(),
            ],
            CliError::AuthenticationFailed { .. } => vec![
                "Check the API token: msspctl profile show <profile>".to_string(),
                "Make sure the token belongs to the region the profile points at".to_string(),
            ],
            CliError::ConnectionError { .. } => vec![
                "Check network connectivity".to_string(),
                "Verify the API URL: msspctl profile show <profile>".to_string(),
            ],
            CliError::ApiError { message } if message.contains("404") => vec![
                "Verify the UID is correct".to_string(),
                "Check that you're using the profile for the right region".to_string(),
            ],
            CliError::OperationFailed { kind, id, .. } if kind == "transaction" => vec![format!(
                "Inspect the transaction: msspctl transaction wait {} -o json",
                id
            )],
            CliError::OperationFailed { kind, id, .. } if kind == "upgrade run" => vec![format!(
                "See per-device results: msspctl upgrade wait {} -o table",
                id
            )],
            CliError::Cancelled { kind, id } | CliError::TimedOut { kind, id, .. } => {
                let command = match kind.as_str() {
                    "transaction" => format!("msspctl transaction wait {}", id),
                    "upgrade run" => format!("msspctl upgrade wait {}", id),
                    _ => format!("msspctl task wait {} --domain-uid <domain>", id),
                };
                vec![format!(
                    "The operation keeps running on the control plane. Resume with: {}",
                    command
                )]
            }
            CliError::InvalidInput { .. } => {
                vec!["Check the command syntax: msspctl <command> --help".to_string()]
            }
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&format!("{}", self));

        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion, &[]);
        }

        diag.print();
    }
}

impl From<TransportError> for CliError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unauthorized { status, message } => CliError::AuthenticationFailed {
                message: format!("{} {}", status, message),
            },
            TransportError::Http { status, message } => CliError::ApiError {
                message: format!("HTTP {}: {}", status, message),
            },
            TransportError::Request(e) => CliError::ConnectionError {
                message: e.to_string(),
            },
            TransportError::Decode(message) => CliError::ApiError {
                message: format!("Unexpected response: {}", message),
            },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport(e) => CliError::from(e),
            CoreError::OperationFailed { ref kind, ref id, .. } => CliError::OperationFailed {
                kind: kind.to_string(),
                id: id.clone(),
                message: err.to_string(),
            },
            CoreError::Cancelled { kind, id } => CliError::Cancelled {
                kind: kind.to_string(),
                id,
            },
            CoreError::TimedOut { kind, id, elapsed } => CliError::TimedOut {
                kind: kind.to_string(),
                id,
                elapsed,
            },
            CoreError::Validation(message) => CliError::UnexpectedResponse { message },
            CoreError::Config(message) => CliError::InvalidInput { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound { name },
            ConfigError::NoProfiles { .. } => CliError::NoProfileConfigured,
            ConfigError::MissingToken { profile } => CliError::MissingToken { name: profile },
            other => CliError::Configuration(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Configuration(err.to_string())
    }
}
