//! cdFMC domain task statuses
//!
//! Jobs started through the cdFMC config API (device backups, deployments)
//! are tracked under `/domain/{domainUid}/job/taskstatuses/{taskId}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::ControlPlaneClient;
use crate::error::TransportError;
use crate::operation::{OperationHandle, OperationKind, OperationStatus};
use crate::waiter::StatusSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FmcTask {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
}

impl From<FmcTask> for OperationStatus<TaskDetail> {
    fn from(task: FmcTask) -> Self {
        OperationStatus {
            state: task.status,
            message: task.message,
            detail: Some(TaskDetail {
                task_type: task.task_type,
            }),
        }
    }
}

/// Handler for cdFMC task statuses
#[derive(Debug, Clone)]
pub struct TaskHandler {
    client: ControlPlaneClient,
}

impl TaskHandler {
    pub fn new(client: ControlPlaneClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, domain_uid: &str, task_id: &str) -> Result<FmcTask, TransportError> {
        self.client
            .get(&format!(
                "/v1/cdfmc/api/fmc_config/v1/domain/{}/job/taskstatuses/{}",
                domain_uid, task_id
            ))
            .await
    }
}

#[async_trait]
impl StatusSource for TaskHandler {
    type Detail = TaskDetail;

    fn kind(&self) -> OperationKind {
        OperationKind::DomainTask
    }

    async fn fetch_status(
        &self,
        handle: &OperationHandle,
    ) -> Result<OperationStatus<TaskDetail>, TransportError> {
        // wait_on only passes DomainTask handles, which always carry a domain
        let domain_uid = handle.domain_uid().unwrap_or_default();
        Ok(self.get(domain_uid, handle.id()).await?.into())
    }
}
