//! Submit-and-wait workflows for the three operation kinds
//!
//! Each workflow:
//! 1. Submits the request (returns a transaction or task reference)
//! 2. Waits on the returned handle with the caller's waiter
//! 3. Returns the successful terminal status
//!
//! The waiter decides interval, deadline and cancellation; `on_update`
//! receives every status observed while waiting.

use serde::Serialize;
use tracing::{debug, info};

use crate::api::{
    BackupHandler, CompatibleVersion, CreateTenantRequest, DeviceBackupRequest, InventoryHandler,
    TaskDetail, TaskHandler, TenantHandler, TransactionDetail, TransactionHandler,
    UpgradeDevicesRequest, UpgradeHandler, UpgradeRunDetail, UserInput, ZtpOnboardingInput,
};
use crate::client::ControlPlaneClient;
use crate::error::{CoreError, Result};
use crate::operation::{OperationHandle, OperationStatus};
use crate::waiter::AsyncOperationWaiter;

/// Wait for an already-submitted transaction
pub async fn wait_for_transaction<U>(
    client: &ControlPlaneClient,
    waiter: &AsyncOperationWaiter,
    handle: &OperationHandle,
    on_update: U,
) -> Result<OperationStatus<TransactionDetail>>
where
    U: FnMut(&OperationStatus<TransactionDetail>),
{
    let source = TransactionHandler::new(client.clone());
    Ok(waiter.wait_on(&source, handle, on_update).await?)
}

/// Wait for an already-submitted cdFMC domain task
pub async fn wait_for_task<U>(
    client: &ControlPlaneClient,
    waiter: &AsyncOperationWaiter,
    handle: &OperationHandle,
    on_update: U,
) -> Result<OperationStatus<TaskDetail>>
where
    U: FnMut(&OperationStatus<TaskDetail>),
{
    let source = TaskHandler::new(client.clone());
    Ok(waiter.wait_on(&source, handle, on_update).await?)
}

/// Wait for an already-triggered upgrade run
pub async fn wait_for_upgrade_run<U>(
    client: &ControlPlaneClient,
    waiter: &AsyncOperationWaiter,
    handle: &OperationHandle,
    on_update: U,
) -> Result<OperationStatus<UpgradeRunDetail>>
where
    U: FnMut(&OperationStatus<UpgradeRunDetail>),
{
    let source = UpgradeHandler::new(client.clone());
    Ok(waiter.wait_on(&source, handle, on_update).await?)
}

/// Create a managed tenant and wait for the transaction to finish
pub async fn create_tenant_and_wait<U>(
    client: &ControlPlaneClient,
    waiter: &AsyncOperationWaiter,
    request: &CreateTenantRequest,
    on_update: U,
) -> Result<OperationStatus<TransactionDetail>>
where
    U: FnMut(&OperationStatus<TransactionDetail>),
{
    let tx = TenantHandler::new(client.clone()).create(request).await?;
    info!(
        transaction = %tx.transaction_uid,
        tenant = %request.tenant_name,
        "Submitted tenant creation"
    );
    wait_for_transaction(client, waiter, &tx.handle(), on_update).await
}

/// Provision a cdFMC for a tenant and wait for the transaction to finish
pub async fn provision_cdfmc_and_wait<U>(
    client: &ControlPlaneClient,
    waiter: &AsyncOperationWaiter,
    tenant_uid: &str,
    dedicated: bool,
    on_update: U,
) -> Result<OperationStatus<TransactionDetail>>
where
    U: FnMut(&OperationStatus<TransactionDetail>),
{
    let tx = TenantHandler::new(client.clone())
        .provision_cdfmc(tenant_uid, dedicated)
        .await?;
    info!(
        transaction = %tx.transaction_uid,
        tenant = tenant_uid,
        dedicated,
        "Submitted cdFMC provisioning"
    );
    wait_for_transaction(client, waiter, &tx.handle(), on_update).await
}

/// Add users to a tenant and wait for the transaction to finish
///
/// Fails with [`CoreError::Config`] before submitting anything if `users`
/// is empty.
pub async fn add_users_and_wait<U>(
    client: &ControlPlaneClient,
    waiter: &AsyncOperationWaiter,
    tenant_uid: &str,
    users: &[UserInput],
    on_update: U,
) -> Result<OperationStatus<TransactionDetail>>
where
    U: FnMut(&OperationStatus<TransactionDetail>),
{
    if users.is_empty() {
        return Err(CoreError::Config("No users given".to_string()));
    }
    let tx = TenantHandler::new(client.clone())
        .add_users(tenant_uid, users)
        .await?;
    info!(
        transaction = %tx.transaction_uid,
        tenant = tenant_uid,
        users = users.len(),
        "Submitted user creation"
    );
    wait_for_transaction(client, waiter, &tx.handle(), on_update).await
}

/// Work out which software versions every given device can upgrade to
///
/// The calculation runs as a transaction; its `entityUid` keys the result.
pub async fn compatible_versions<U>(
    client: &ControlPlaneClient,
    waiter: &AsyncOperationWaiter,
    device_uids: &[String],
    on_update: U,
) -> Result<Vec<CompatibleVersion>>
where
    U: FnMut(&OperationStatus<TransactionDetail>),
{
    if device_uids.is_empty() {
        return Err(CoreError::Config("No devices given".to_string()));
    }
    let handler = UpgradeHandler::new(client.clone());
    let tx = handler.calculate_compatible_versions(device_uids).await?;
    let done = wait_for_transaction(client, waiter, &tx.handle(), on_update).await?;

    let calculation_uid = done
        .detail
        .and_then(|d| d.entity_uid)
        .or(tx.entity_uid)
        .ok_or_else(|| {
            CoreError::Validation("Version calculation returned no entity UID".to_string())
        })?;
    Ok(handler.compatible_versions(&calculation_uid).await?)
}

/// Trigger an upgrade and wait for the upgrade run to settle
///
/// The trigger transaction is not awaited; the run it names is.
pub async fn upgrade_devices_and_wait<U>(
    client: &ControlPlaneClient,
    waiter: &AsyncOperationWaiter,
    request: &UpgradeDevicesRequest,
    on_update: U,
) -> Result<OperationStatus<UpgradeRunDetail>>
where
    U: FnMut(&OperationStatus<UpgradeRunDetail>),
{
    if request.device_uids.is_empty() {
        return Err(CoreError::Config("No devices given".to_string()));
    }
    let tx = UpgradeHandler::new(client.clone()).trigger(request).await?;
    let run_uid = tx.entity_uid.ok_or_else(|| {
        CoreError::Validation(format!(
            "Upgrade transaction {} returned no upgrade run UID",
            tx.transaction_uid
        ))
    })?;
    info!(
        upgrade_run = %run_uid,
        version = %request.software_version,
        devices = request.device_uids.len(),
        "Triggered device upgrade"
    );
    wait_for_upgrade_run(client, waiter, &OperationHandle::upgrade_run(run_uid), on_update).await
}

/// Back up devices in a cdFMC domain and wait for the backup task
pub async fn backup_devices_and_wait<U>(
    client: &ControlPlaneClient,
    waiter: &AsyncOperationWaiter,
    domain_uid: &str,
    request: &DeviceBackupRequest,
    on_update: U,
) -> Result<OperationStatus<TaskDetail>>
where
    U: FnMut(&OperationStatus<TaskDetail>),
{
    if request.device_ids.is_empty() {
        return Err(CoreError::Config("No devices given".to_string()));
    }
    let handle = BackupHandler::new(client.clone())
        .create(domain_uid, request)
        .await?
        .ok_or_else(|| {
            CoreError::Validation("Backup request returned no task to wait on".to_string())
        })?;
    info!(task = handle.id(), domain = domain_uid, "Submitted device backup");
    wait_for_task(client, waiter, &handle, on_update).await
}

/// API-only user tenant tokens are minted for unless the caller picks another
pub const AUTOMATION_USERNAME: &str = "msp-automation-user";

/// An API token that acts inside one managed tenant
#[derive(Clone, Serialize)]
pub struct TenantToken {
    pub tenant_uid: String,
    pub tenant_name: String,
    /// UID of the API-only user the token belongs to
    pub user_uid: String,
    pub api_token: String,
}

impl TenantToken {
    /// A client on the same endpoint as `msp_client` that acts as this tenant
    pub fn client(&self, msp_client: &ControlPlaneClient) -> Result<ControlPlaneClient> {
        msp_client.with_token(self.api_token.clone())
    }
}

impl std::fmt::Debug for TenantToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantToken")
            .field("tenant_uid", &self.tenant_uid)
            .field("tenant_name", &self.tenant_name)
            .field("user_uid", &self.user_uid)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Mint an API token for a managed tenant
///
/// Looks up the API-only user `{username}@{tenant name}`. If the tenant has
/// none, the user is created as an admin and `on_update` follows that
/// transaction. Minting a token revokes the user's previous one.
pub async fn tenant_token<U>(
    client: &ControlPlaneClient,
    waiter: &AsyncOperationWaiter,
    tenant_uid: &str,
    username: &str,
    on_update: U,
) -> Result<TenantToken>
where
    U: FnMut(&OperationStatus<TransactionDetail>),
{
    if username.trim().is_empty() {
        return Err(CoreError::Config("API user name is empty".to_string()));
    }
    let tenants = TenantHandler::new(client.clone());
    let tenant = tenants.get(tenant_uid).await?;
    let qualified_name = format!("{}@{}", username, tenant.name);

    let user = match tenants.find_api_only_user(tenant_uid, &qualified_name).await? {
        Some(user) => {
            debug!(user = %qualified_name, "Reusing API-only user");
            user
        }
        None => {
            info!(user = %qualified_name, tenant = tenant_uid, "Creating API-only user");
            let users = [UserInput::api_only_admin(username)];
            add_users_and_wait(client, waiter, tenant_uid, &users, on_update).await?;
            tenants
                .find_api_only_user(tenant_uid, &qualified_name)
                .await?
                .ok_or_else(|| {
                    CoreError::Validation(format!(
                        "API-only user {} was created but cannot be found",
                        qualified_name
                    ))
                })?
        }
    };

    let api_token = tenants.generate_api_token(tenant_uid, &user.uid).await?;
    info!(user = %qualified_name, tenant = tenant_uid, "Generated tenant API token");
    Ok(TenantToken {
        tenant_uid: tenant.uid,
        tenant_name: tenant.name,
        user_uid: user.uid,
        api_token,
    })
}

/// Register an FTD for zero-touch provisioning and wait for the transaction
///
/// `tenant_client` must authenticate as the managed tenant (see
/// [`tenant_token`]). Fails with [`CoreError::Config`] before submitting if
/// the input is incomplete.
pub async fn onboard_ztp_and_wait<U>(
    tenant_client: &ControlPlaneClient,
    waiter: &AsyncOperationWaiter,
    input: &ZtpOnboardingInput,
    on_update: U,
) -> Result<OperationStatus<TransactionDetail>>
where
    U: FnMut(&OperationStatus<TransactionDetail>),
{
    input.validate()?;
    let tx = InventoryHandler::new(tenant_client.clone())
        .onboard_ftd_ztp(input)
        .await?;
    info!(
        transaction = %tx.transaction_uid,
        device = %input.name,
        serial = %input.serial_number,
        "Submitted ZTP onboarding"
    );
    wait_for_transaction(tenant_client, waiter, &tx.handle(), on_update).await
}
