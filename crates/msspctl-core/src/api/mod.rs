//! Thin handlers for the control-plane endpoints msspctl uses
//!
//! Submitters start operations and hand back whatever the control plane
//! returns (usually a transaction). The three status handlers implement
//! [`StatusSource`](crate::StatusSource) so they can drive an
//! [`AsyncOperationWaiter`](crate::AsyncOperationWaiter).

pub mod backups;
pub mod devices;
pub mod tasks;
pub mod tenants;
pub mod transactions;
pub mod upgrades;

pub use backups::{BackupHandler, DeviceBackupRequest};
pub use devices::{FtdLicense, InventoryHandler, ZtpOnboardingInput};
pub use tasks::{FmcTask, TaskDetail, TaskHandler};
pub use tenants::{
    ApiOnlyUser, CreateTenantRequest, ManagedTenant, TenantHandler, UserInput, UserRole,
};
pub use transactions::{CdoTransaction, TransactionDetail, TransactionHandler};
pub use upgrades::{
    CompatibleVersion, DeviceUpgradeStatus, UpgradeDevicesRequest, UpgradeHandler, UpgradeRun,
    UpgradeRunDetail,
};
