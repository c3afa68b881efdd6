//! cdFMC operational device backups

use serde::{Deserialize, Serialize};

use crate::client::ControlPlaneClient;
use crate::error::TransportError;
use crate::operation::OperationHandle;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceBackupRequest {
    pub name: String,
    pub description: String,
    /// FMC-side device record UIDs
    pub device_ids: Vec<String>,
}

impl DeviceBackupRequest {
    /// A request named after today's date, e.g. `backup-2026-10-15`
    pub fn dated(device_ids: Vec<String>) -> Self {
        let today = chrono::Local::now().date_naive().format("%Y-%m-%d");
        Self {
            name: format!("backup-{}", today),
            description: format!("Backup on {}", today),
            device_ids,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TaskReference {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct BackupMetadata {
    #[serde(default)]
    task: Option<TaskReference>,
}

/// Response to a backup submission
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceBackupResponse {
    #[serde(default)]
    metadata: Option<BackupMetadata>,
}

impl DeviceBackupResponse {
    /// ID of the task tracking the backup, when the API returned one
    pub fn task_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.task.as_ref())
            .and_then(|t| t.id.as_deref())
    }
}

/// Handler for cdFMC device backups within one domain
#[derive(Debug, Clone)]
pub struct BackupHandler {
    client: ControlPlaneClient,
}

impl BackupHandler {
    pub fn new(client: ControlPlaneClient) -> Self {
        Self { client }
    }

    /// Submit a backup; the returned handle is `None` when no task was reported
    pub async fn create(
        &self,
        domain_uid: &str,
        request: &DeviceBackupRequest,
    ) -> Result<Option<OperationHandle>, TransportError> {
        let response: DeviceBackupResponse = self
            .client
            .post(
                &format!(
                    "/v1/cdfmc/api/fmc_config/v1/domain/{}/backup/operational/devicebackup",
                    domain_uid
                ),
                request,
            )
            .await?;
        Ok(response
            .task_id()
            .map(|id| OperationHandle::domain_task(domain_uid, id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_id_extraction() {
        let response: DeviceBackupResponse = serde_json::from_value(json!({
            "metadata": {"task": {"id": "task-42", "links": {}}}
        }))
        .unwrap();
        assert_eq!(response.task_id(), Some("task-42"));

        let empty: DeviceBackupResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.task_id(), None);
    }

    #[test]
    fn test_dated_request_shape() {
        let request = DeviceBackupRequest::dated(vec!["fmc-dev-1".to_string()]);
        assert!(request.name.starts_with("backup-"));
        assert!(request.description.starts_with("Backup on "));

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["deviceIds"], json!(["fmc-dev-1"]));
    }
}
