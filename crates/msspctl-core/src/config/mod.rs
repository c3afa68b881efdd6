//! Configuration and profile management
//!
// The nested `config` module holds the file model itself
#![allow(clippy::module_inception)]
//!
//! Profiles name a control-plane region and the API token to use with it.
//! Config files are TOML, live in the platform config directory and may
//! reference environment variables as `${VAR}` or `${VAR:-default}`.

pub mod config;
pub mod error;

pub use config::{
    API_TOKEN_ENV, Config, Profile, REGION_ENV, ResolvedProfile, WaitSettings,
};
pub use error::{ConfigError, Result};
