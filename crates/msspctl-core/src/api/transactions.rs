//! MSP portal transactions
//!
//! Tenant creation, user creation, cdFMC provisioning and upgrade-version
//! calculation all answer with a transaction that settles in `DONE`,
//! `ERROR` or `CANCELLED`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::ControlPlaneClient;
use crate::error::TransportError;
use crate::operation::{OperationHandle, OperationKind, OperationStatus};
use crate::waiter::StatusSource;

/// A transaction as returned by submit calls and the transactions endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdoTransaction {
    pub transaction_uid: String,
    pub cdo_transaction_status: String,
    #[serde(default)]
    pub tenant_uid: Option<String>,
    #[serde(default)]
    pub transaction_type: Option<String>,
    /// UID of the entity the transaction acted on (an upgrade run, a version calculation)
    #[serde(default)]
    pub entity_uid: Option<String>,
    #[serde(default)]
    pub entity_url: Option<String>,
    #[serde(default)]
    pub submission_time: Option<String>,
    #[serde(default)]
    pub last_updated_time: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_details: Option<serde_json::Value>,
}

impl CdoTransaction {
    pub fn handle(&self) -> OperationHandle {
        OperationHandle::transaction(&self.transaction_uid)
    }
}

/// Transaction fields that ride along in [`OperationStatus::detail`]
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<serde_json::Value>,
}

impl From<CdoTransaction> for OperationStatus<TransactionDetail> {
    fn from(tx: CdoTransaction) -> Self {
        OperationStatus {
            state: tx.cdo_transaction_status,
            message: tx.error_message,
            detail: Some(TransactionDetail {
                transaction_type: tx.transaction_type,
                entity_uid: tx.entity_uid,
                entity_url: tx.entity_url,
                submission_time: tx.submission_time,
                last_updated_time: tx.last_updated_time,
                error_details: tx.error_details,
            }),
        }
    }
}

/// Handler for `/v1/transactions`
#[derive(Debug, Clone)]
pub struct TransactionHandler {
    client: ControlPlaneClient,
}

impl TransactionHandler {
    pub fn new(client: ControlPlaneClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, transaction_uid: &str) -> Result<CdoTransaction, TransportError> {
        self.client
            .get(&format!("/v1/transactions/{}", transaction_uid))
            .await
    }
}

#[async_trait]
impl StatusSource for TransactionHandler {
    type Detail = TransactionDetail;

    fn kind(&self) -> OperationKind {
        OperationKind::TenantTransaction
    }

    async fn fetch_status(
        &self,
        handle: &OperationHandle,
    ) -> Result<OperationStatus<TransactionDetail>, TransportError> {
        Ok(self.get(handle.id()).await?.into())
    }
}
