//! Building clients and waiters from the loaded configuration

use std::path::PathBuf;
use std::time::Duration;

use msspctl_core::{
    AsyncOperationWaiter, Config, ControlPlaneClient, OperationKind, WaitPolicy,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::error::Result as CliResult;

/// Connection manager for creating authenticated clients
#[derive(Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    /// `--max-wait` from the command line, which beats the config file
    pub max_wait: Option<Duration>,
    /// Fires when the user interrupts the command
    pub cancel: CancellationToken,
}

impl ConnectionManager {
    /// Create a connection manager with an optional explicit config path
    pub fn with_config_path(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
            max_wait: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Save the configuration to the file it was loaded from
    pub fn save_config(&self, config: &Config) -> CliResult<()> {
        match &self.config_path {
            Some(path) => config.save_to_path(path)?,
            None => config.save()?,
        }
        Ok(())
    }

    /// Create a control-plane client for the resolved profile
    ///
    /// When --config-file is explicitly specified, SCCFM_API_TOKEN is ignored
    /// so that the file alone decides which tenant is touched.
    pub fn create_client(&self, profile_name: Option<&str>) -> CliResult<ControlPlaneClient> {
        trace!("Profile name: {:?}", profile_name);

        let use_env_vars = self.config_path.is_none();
        if !use_env_vars {
            info!("--config-file specified explicitly, ignoring environment variables");
        }

        let resolved = self.config.resolve_connection(profile_name, use_env_vars)?;
        info!(
            profile = %resolved.name,
            base_url = %resolved.base_url,
            "Connecting to control plane"
        );

        let client = ControlPlaneClient::new(&resolved.base_url, resolved.api_token)?;
        debug!("Control-plane client created successfully");
        Ok(client)
    }

    /// Wait policy for `kind` from config, with command-line overrides applied
    pub fn policy_for(&self, kind: OperationKind, interval_secs: Option<u64>) -> WaitPolicy {
        let mut policy = self.config.wait.policy_for(kind);
        if let Some(secs) = interval_secs {
            policy = policy.with_interval(Duration::from_secs(secs));
        }
        if self.max_wait.is_some() {
            policy = policy.with_deadline(self.max_wait);
        }
        policy
    }

    /// A waiter for `kind` that stops when the user interrupts
    pub fn waiter_for(&self, kind: OperationKind, interval_secs: Option<u64>) -> AsyncOperationWaiter {
        let policy = self.policy_for(kind, interval_secs);
        debug!(
            %kind,
            interval = ?policy.interval(),
            deadline = ?policy.deadline(),
            "Wait policy"
        );
        AsyncOperationWaiter::new(policy).with_cancellation(self.cancel.clone())
    }
}
