//! # msspctl-core
//!
//! Library layer for managing MSSP tenants on the firewall-management
//! control plane. The CLI in `msspctl` is a thin presentation layer over it.
//!
//! Most control-plane calls start work and return immediately with a
//! reference to it: a tenant transaction, a cdFMC domain task or a fleet
//! upgrade run. This crate provides:
//!
//! - [`AsyncOperationWaiter`] - one polling loop for all three, driven by a
//!   [`WaitPolicy`] (terminal states, success states, interval, optional deadline)
//! - [`api`] - typed handlers for the REST endpoints, each a [`StatusSource`]
//! - [`workflows`] - submit-then-wait operations (`create_tenant_and_wait`, ...)
//!   and tenant-scoped tokens (`tenant_token`)
//! - [`config`] - TOML profiles and wait settings
//!
//! ## Example
//!
//! ```rust,ignore
//! use msspctl_core::{AsyncOperationWaiter, ControlPlaneClient, OperationKind};
//! use msspctl_core::api::CreateTenantRequest;
//! use msspctl_core::workflows::create_tenant_and_wait;
//!
//! let client = ControlPlaneClient::for_region("us", token)?;
//! let waiter = AsyncOperationWaiter::for_kind(OperationKind::TenantTransaction);
//! let request = CreateTenantRequest {
//!     display_name: "Acme Corp".to_string(),
//!     tenant_name: "acme".to_string(),
//! };
//!
//! let done = create_tenant_and_wait(&client, &waiter, &request, |status| {
//!     println!("transaction is {}", status.state);
//! })
//! .await?;
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod operation;
pub mod waiter;
pub mod workflows;

pub use client::{ControlPlaneClient, base_url_for_region};
pub use config::{Config, ConfigError, Profile, ResolvedProfile, WaitSettings};
pub use error::{CoreError, Result, TransportError};
pub use operation::{OperationHandle, OperationKind, OperationStatus, WaitPolicy};
pub use waiter::{AsyncOperationWaiter, StatusSource, WaitError};
