//! Configuration management for msspctl
//!
//! Handles configuration loading from files and environment variables.
//! Configuration is stored in TOML format with support for multiple named profiles.

#[cfg(target_os = "macos")]
use directories::BaseDirs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{ConfigError, Result};
use crate::client::base_url_for_region;
use crate::operation::{OperationKind, WaitPolicy};

/// Environment variable holding the API token
pub const API_TOKEN_ENV: &str = "SCCFM_API_TOKEN";

/// Environment variable naming the region when no profile is configured
pub const REGION_ENV: &str = "SCCFM_REGION";

const ENV_PROFILE_NAME: &str = "env";
const ENV_DEFAULT_REGION: &str = "us";

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Profile used when `--profile` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
    /// Polling settings shared by all profiles
    #[serde(default)]
    pub wait: WaitSettings,
}

/// Individual profile configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Profile {
    /// Region the MSSP portal is deployed in (`us`, `eu`, `apj`, `scale`, `staging`, ...)
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Overrides the URL derived from `region`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Profile {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            api_token: None,
            base_url: None,
        }
    }

    /// Base URL for API calls made with this profile
    pub fn effective_base_url(&self) -> String {
        match &self.base_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => base_url_for_region(&self.region),
        }
    }

    pub fn has_token(&self) -> bool {
        self.api_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Everything needed to build a client: which profile, where, and with what token
#[derive(Clone, PartialEq)]
pub struct ResolvedProfile {
    pub name: String,
    pub base_url: String,
    pub api_token: String,
}

impl std::fmt::Debug for ResolvedProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedProfile")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Poll intervals and the optional overall bound on a wait
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WaitSettings {
    #[serde(default = "default_transaction_interval")]
    pub transaction_interval_secs: u64,
    #[serde(default = "default_task_interval")]
    pub task_interval_secs: u64,
    #[serde(default = "default_upgrade_interval")]
    pub upgrade_interval_secs: u64,
    /// Give up after this many seconds; unset waits until the operation settles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wait_secs: Option<u64>,
}

fn default_transaction_interval() -> u64 {
    3
}

fn default_task_interval() -> u64 {
    5
}

fn default_upgrade_interval() -> u64 {
    5
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            transaction_interval_secs: default_transaction_interval(),
            task_interval_secs: default_task_interval(),
            upgrade_interval_secs: default_upgrade_interval(),
            max_wait_secs: None,
        }
    }
}

impl WaitSettings {
    /// Reject settings that would make a wait spin or end before it starts
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("transaction_interval_secs", self.transaction_interval_secs),
            ("task_interval_secs", self.task_interval_secs),
            ("upgrade_interval_secs", self.upgrade_interval_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidWaitSetting(format!(
                    "{} must be at least 1",
                    key
                )));
            }
        }
        if self.max_wait_secs == Some(0) {
            return Err(ConfigError::InvalidWaitSetting(
                "max_wait_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn interval_for(&self, kind: OperationKind) -> Duration {
        let secs = match kind {
            OperationKind::TenantTransaction => self.transaction_interval_secs,
            OperationKind::DomainTask => self.task_interval_secs,
            OperationKind::UpgradeRun => self.upgrade_interval_secs,
        };
        Duration::from_secs(secs)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_secs.map(Duration::from_secs)
    }

    /// The kind's state vocabulary with the configured interval and deadline
    pub fn policy_for(&self, kind: OperationKind) -> WaitPolicy {
        kind.default_policy()
            .with_interval(self.interval_for(kind))
            .with_deadline(self.max_wait())
    }
}

impl Config {
    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        // Expand environment variables in the config content
        let expanded_content = Self::expand_env_vars(&content);

        let config: Config = toml::from_str(&expanded_content)?;
        config.wait.validate()?;

        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name, clearing the default if it pointed there
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// List all profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    pub fn get_profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Pick the profile name to use
    ///
    /// Order: explicit name, `default_profile`, then the alphabetically
    /// first profile.
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<String> {
        if let Some(profile_name) = explicit_profile {
            return Ok(profile_name.to_string());
        }

        if let Some(ref default) = self.default_profile {
            return Ok(default.clone());
        }

        if let Some((name, _)) = self.list_profiles().first() {
            return Ok((*name).clone());
        }

        Err(ConfigError::NoProfiles {
            suggestion: "Use 'msspctl profile set <name> --region <region>' to create one."
                .to_string(),
        })
    }

    /// Resolve the profile, base URL and token to connect with
    ///
    /// With `use_env`, `SCCFM_API_TOKEN` overrides the profile's token, and
    /// when no profile exists at all the environment alone is enough
    /// (`SCCFM_REGION`, default `us`). Without it only the file counts.
    pub fn resolve_connection(
        &self,
        explicit_profile: Option<&str>,
        use_env: bool,
    ) -> Result<ResolvedProfile> {
        self.resolve_connection_with(explicit_profile, |var| {
            if use_env {
                std::env::var(var).ok().filter(|v| !v.is_empty())
            } else {
                None
            }
        })
    }

    fn resolve_connection_with<F>(
        &self,
        explicit_profile: Option<&str>,
        env: F,
    ) -> Result<ResolvedProfile>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_token = env(API_TOKEN_ENV);

        let name = match self.resolve_profile(explicit_profile) {
            Ok(name) => name,
            Err(ConfigError::NoProfiles { .. }) if env_token.is_some() => {
                let region = env(REGION_ENV).unwrap_or_else(|| ENV_DEFAULT_REGION.to_string());
                return Ok(ResolvedProfile {
                    name: ENV_PROFILE_NAME.to_string(),
                    base_url: base_url_for_region(&region),
                    api_token: env_token.unwrap_or_default(),
                });
            }
            Err(e) => return Err(e),
        };

        let profile = self.get_profile(&name)?;
        let api_token = env_token
            .or_else(|| profile.api_token.clone().filter(|t| !t.is_empty()))
            .ok_or_else(|| ConfigError::MissingToken {
                profile: name.clone(),
            })?;

        Ok(ResolvedProfile {
            base_url: profile.effective_base_url(),
            name,
            api_token,
        })
    }

    /// Get the path to the configuration file
    ///
    /// On macOS, this supports both the standard macOS path and Linux-style ~/.config path:
    /// 1. Check ~/.config/msspctl/config.toml (Linux-style, preferred for consistency)
    /// 2. Fall back to ~/Library/Application Support/com.cisco.msspctl/config.toml
    ///
    /// On Linux: ~/.config/msspctl/config.toml
    /// On Windows: %APPDATA%\cisco\msspctl\config.toml
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(base_dirs) = BaseDirs::new() {
                let linux_style_path = base_dirs
                    .home_dir()
                    .join(".config")
                    .join("msspctl")
                    .join("config.toml");

                if linux_style_path
                    .parent()
                    .map(|p| p.exists())
                    .unwrap_or(false)
                {
                    return Ok(linux_style_path);
                }
            }
        }

        let proj_dirs =
            ProjectDirs::from("com", "cisco", "msspctl").ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand `${VAR}` and `${VAR:-default}` references
    ///
    /// Unset variables without a default are left as written so that
    /// profiles nobody uses do not need their variables set.
    fn expand_env_vars(content: &str) -> String {
        let expanded =
            shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok());
        expanded.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn profile(region: &str, token: Option<&str>) -> Profile {
        Profile {
            region: region.to_string(),
            api_token: token.map(str::to_string),
            base_url: None,
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.set_profile("acme".to_string(), profile("eu", Some("token-1")));
        config.default_profile = Some("acme".to_string());
        config.wait.max_wait_secs = Some(600);

        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_wait_defaults_when_section_missing() {
        let config: Config = toml::from_str(
            r#"
[profiles.acme]
region = "us"
"#,
        )
        .unwrap();

        assert_eq!(config.wait, WaitSettings::default());
        assert_eq!(
            config.wait.interval_for(OperationKind::TenantTransaction),
            Duration::from_secs(3)
        );
        assert_eq!(
            config.wait.interval_for(OperationKind::DomainTask),
            Duration::from_secs(5)
        );
        assert_eq!(config.wait.max_wait(), None);
    }

    #[test]
    fn test_policy_for_applies_settings() {
        let settings = WaitSettings {
            transaction_interval_secs: 1,
            max_wait_secs: Some(90),
            ..WaitSettings::default()
        };
        let policy = settings.policy_for(OperationKind::TenantTransaction);

        assert_eq!(policy.interval(), Duration::from_secs(1));
        assert_eq!(policy.deadline(), Some(Duration::from_secs(90)));
        assert!(policy.is_success("DONE"));
        assert!(policy.is_terminal("CANCELLED"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let settings = WaitSettings {
            task_interval_secs: 0,
            ..WaitSettings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("task_interval_secs"));
    }

    #[test]
    fn test_profile_resolution_order() {
        let mut config = Config::default();
        config.set_profile("zeta".to_string(), profile("us", Some("t")));
        config.set_profile("alpha".to_string(), profile("eu", Some("t")));

        assert_eq!(config.resolve_profile(None).unwrap(), "alpha");

        config.default_profile = Some("zeta".to_string());
        assert_eq!(config.resolve_profile(None).unwrap(), "zeta");
        assert_eq!(config.resolve_profile(Some("other")).unwrap(), "other");
    }

    #[test]
    fn test_no_profiles_error() {
        let err = Config::default().resolve_profile(None).unwrap_err();
        assert!(err.to_string().contains("No profiles configured"));
        assert!(err.to_string().contains("msspctl profile set"));
    }

    #[test]
    fn test_remove_profile_clears_default() {
        let mut config = Config::default();
        config.set_profile("acme".to_string(), profile("us", None));
        config.default_profile = Some("acme".to_string());

        assert!(config.remove_profile("acme").is_some());
        assert_eq!(config.default_profile, None);
        assert!(config.remove_profile("acme").is_none());
    }

    #[test]
    fn test_resolve_connection_uses_profile() {
        let mut config = Config::default();
        config.set_profile("acme".to_string(), profile("EU", Some("file-token")));

        let resolved = config.resolve_connection_with(None, no_env).unwrap();
        assert_eq!(resolved.name, "acme");
        assert_eq!(resolved.api_token, "file-token");
        assert_eq!(resolved.base_url, "https://api.eu.security.cisco.com/firewall");
    }

    #[test]
    fn test_env_token_overrides_profile() {
        let mut config = Config::default();
        config.set_profile("acme".to_string(), profile("us", Some("file-token")));

        let resolved = config
            .resolve_connection_with(None, |var| {
                (var == API_TOKEN_ENV).then(|| "env-token".to_string())
            })
            .unwrap();
        assert_eq!(resolved.api_token, "env-token");
    }

    #[test]
    fn test_env_only_connection() {
        let resolved = Config::default()
            .resolve_connection_with(None, |var| match var {
                API_TOKEN_ENV => Some("env-token".to_string()),
                REGION_ENV => Some("scale".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(resolved.name, "env");
        assert_eq!(resolved.base_url, "https://scale.manage.security.cisco.com");
    }

    #[test]
    fn test_missing_token_and_unknown_profile() {
        let mut config = Config::default();
        config.set_profile("acme".to_string(), profile("us", None));

        assert!(matches!(
            config.resolve_connection_with(None, no_env),
            Err(ConfigError::MissingToken { profile }) if profile == "acme"
        ));
        assert!(matches!(
            config.resolve_connection_with(Some("nope"), no_env),
            Err(ConfigError::ProfileNotFound { name }) if name == "nope"
        ));
    }

    #[test]
    fn test_base_url_override() {
        let mut acme = profile("us", Some("t"));
        acme.base_url = Some("http://localhost:8080".to_string());
        assert_eq!(acme.effective_base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_resolved_profile_debug_redacts_token() {
        let resolved = ResolvedProfile {
            name: "acme".to_string(),
            base_url: "https://example.com".to_string(),
            api_token: "super-secret".to_string(),
        };
        assert!(!format!("{:?}", resolved).contains("super-secret"));
    }

    #[test]
    #[serial_test::serial]
    fn test_env_var_expansion_with_defaults() {
        unsafe {
            std::env::set_var("MSSPCTL_TEST_TOKEN", "expanded-token");
            std::env::remove_var("MSSPCTL_TEST_REGION");
        }

        let content = r#"
[profiles.acme]
region = "${MSSPCTL_TEST_REGION:-eu}"
api_token = "${MSSPCTL_TEST_TOKEN}"
"#;

        let expanded = Config::expand_env_vars(content);
        let config: Config = toml::from_str(&expanded).unwrap();
        let acme = config.profiles.get("acme").unwrap();
        assert_eq!(acme.region, "eu");
        assert_eq!(acme.api_token.as_deref(), Some("expanded-token"));

        unsafe {
            std::env::remove_var("MSSPCTL_TEST_TOKEN");
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_unset_var_left_as_is() {
        unsafe {
            std::env::remove_var("MSSPCTL_UNSET_VAR");
        }
        let expanded = Config::expand_env_vars("api_token = \"${MSSPCTL_UNSET_VAR}\"");
        assert!(expanded.contains("${MSSPCTL_UNSET_VAR}"));
    }
}
