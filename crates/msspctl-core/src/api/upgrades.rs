//! Fleet upgrades of cdFMC-managed FTD devices
//!
//! An upgrade is triggered through the MSP portal, which answers with a
//! transaction whose `entityUid` names the upgrade run. The run carries an
//! overall status plus one sub-status per device.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::ControlPlaneClient;
use crate::error::TransportError;
use crate::operation::{OperationHandle, OperationKind, OperationStatus};
use crate::waiter::StatusSource;

use super::transactions::CdoTransaction;

/// Request body for triggering an upgrade
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeDevicesRequest {
    pub name: String,
    pub device_uids: Vec<String>,
    pub software_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibleVersion {
    pub software_version: String,
    #[serde(default)]
    pub is_suggested_version: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompatibleVersionsResponse {
    #[serde(default)]
    compatible_versions: Vec<CompatibleVersion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionStatus {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpgradeRunDevice {
    uid: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    managed_tenant_display_name: Option<String>,
    upgrade_run_status: String,
    #[serde(default)]
    completion_statuses: Vec<CompletionStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct UpgradeRunMetadata {
    #[serde(default)]
    devices: Vec<UpgradeRunDevice>,
}

/// An upgrade run as returned by the upgrade-runs endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRun {
    pub uid: String,
    #[serde(default)]
    pub name: Option<String>,
    pub upgrade_run_status: String,
    #[serde(default)]
    metadata: UpgradeRunMetadata,
}

/// Where one device stands within an upgrade run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUpgradeStatus {
    pub uid: String,
    pub name: Option<String>,
    pub managed_tenant_display_name: Option<String>,
    pub upgrade_run_status: String,
    /// Message from the most recent completion status, if any
    pub latest_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRunDetail {
    /// Upgrade run UID, the handle to resume waiting with
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub devices: Vec<DeviceUpgradeStatus>,
}

impl From<UpgradeRun> for OperationStatus<UpgradeRunDetail> {
    fn from(run: UpgradeRun) -> Self {
        let devices = run
            .metadata
            .devices
            .into_iter()
            .map(|d| DeviceUpgradeStatus {
                uid: d.uid,
                name: d.name,
                managed_tenant_display_name: d.managed_tenant_display_name,
                upgrade_run_status: d.upgrade_run_status,
                latest_message: d.completion_statuses.into_iter().last().and_then(|c| c.message),
            })
            .collect::<Vec<_>>();

        OperationStatus {
            state: run.upgrade_run_status,
            message: failed_device_summary(&devices),
            detail: Some(UpgradeRunDetail {
                uid: run.uid,
                name: run.name,
                devices,
            }),
        }
    }
}

/// "name: message" for each failed device that reported why, joined with "; "
fn failed_device_summary(devices: &[DeviceUpgradeStatus]) -> Option<String> {
    let reasons = devices
        .iter()
        .filter(|d| d.upgrade_run_status.contains("FAILED"))
        .filter_map(|d| {
            let message = d.latest_message.as_deref()?;
            let device = d.name.as_deref().unwrap_or(&d.uid);
            Some(format!("{}: {}", device, message))
        })
        .collect::<Vec<_>>();

    if reasons.is_empty() {
        None
    } else {
        Some(reasons.join("; "))
    }
}

/// Handler for MSP device upgrades
#[derive(Debug, Clone)]
pub struct UpgradeHandler {
    client: ControlPlaneClient,
}

impl UpgradeHandler {
    pub fn new(client: ControlPlaneClient) -> Self {
        Self { client }
    }

    /// Start calculating which versions the given devices can upgrade to
    pub async fn calculate_compatible_versions(
        &self,
        device_uids: &[String],
    ) -> Result<CdoTransaction, TransportError> {
        self.client
            .post(
                "/v1/msp/inventory/devices/upgrades/versions/calculate",
                &serde_json::json!({ "deviceUids": device_uids }),
            )
            .await
    }

    /// Fetch the result of a finished version calculation
    pub async fn compatible_versions(
        &self,
        calculation_uid: &str,
    ) -> Result<Vec<CompatibleVersion>, TransportError> {
        let response: CompatibleVersionsResponse = self
            .client
            .get(&format!(
                "/v1/msp/inventory/devices/upgrades/versions/{}",
                calculation_uid
            ))
            .await?;
        Ok(response.compatible_versions)
    }

    pub async fn trigger(
        &self,
        request: &UpgradeDevicesRequest,
    ) -> Result<CdoTransaction, TransportError> {
        self.client
            .post("/v1/msp/inventory/devices/upgrades/trigger", request)
            .await
    }

    pub async fn get_run(&self, upgrade_run_uid: &str) -> Result<UpgradeRun, TransportError> {
        self.client
            .get(&format!(
                "/v1/msp/inventory/devices/upgrades/runs/{}",
                upgrade_run_uid
            ))
            .await
    }
}

#[async_trait]
impl StatusSource for UpgradeHandler {
    type Detail = UpgradeRunDetail;

    fn kind(&self) -> OperationKind {
        OperationKind::UpgradeRun
    }

    async fn fetch_status(
        &self,
        handle: &OperationHandle,
    ) -> Result<OperationStatus<UpgradeRunDetail>, TransportError> {
        Ok(self.get_run(handle.id()).await?.into())
    }
}
