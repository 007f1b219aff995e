//! Sync-intent journal
//!
//! The order and ledger collections cannot be written atomically together.
//! Before an orchestrated operation writes the order it records a sync
//! intent; the intent is resolved once the ledger step has succeeded. An
//! intent left pending marks an order whose ledger state may have drifted,
//! and a recovery pass replays it.
//!
//! # Adapters
//!
//! - **Postgres**: `infra_db::adapters::PostgresSyncJournal`
//! - **In-memory**: [`InMemorySyncJournal`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tokio::sync::RwLock;

use core_kernel::{
    DomainPort, HealthCheckResult, HealthCheckable, OperationMetadata, OrderId, PortError,
    SyncIntentId,
};

/// The orchestrated operation an intent was recorded for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    ChangeStatus,
    UpdateOrder,
    DeleteOrder,
}

impl SyncOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperation::ChangeStatus => "change_status",
            SyncOperation::UpdateOrder => "update_order",
            SyncOperation::DeleteOrder => "delete_order",
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncOperation {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "change_status" => Ok(SyncOperation::ChangeStatus),
            "update_order" => Ok(SyncOperation::UpdateOrder),
            "delete_order" => Ok(SyncOperation::DeleteOrder),
            other => Err(PortError::internal(format!("unknown sync operation '{}'", other))),
        }
    }
}

/// A durable marker for an in-flight orchestrated operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncIntent {
    pub id: SyncIntentId,
    pub order_id: OrderId,
    pub operation: SyncOperation,
    pub recorded_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl SyncIntent {
    /// Creates a new pending intent
    pub fn new(order_id: OrderId, operation: SyncOperation) -> Self {
        Self {
            id: SyncIntentId::new_v7(),
            order_id,
            operation,
            recorded_at: Utc::now(),
            resolved_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.resolved_at.is_none()
    }
}

/// Port for the sync-intent journal
#[async_trait]
pub trait SyncJournalPort: DomainPort + HealthCheckable {
    /// Records a pending intent
    async fn record(
        &self,
        order_id: OrderId,
        operation: SyncOperation,
        metadata: Option<OperationMetadata>,
    ) -> Result<SyncIntent, PortError>;

    /// Marks an intent resolved
    ///
    /// Stores may drop resolved intents, so resolving the same intent twice
    /// can yield `PortError::NotFound`.
    async fn resolve(
        &self,
        id: SyncIntentId,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    /// Lists pending intents, oldest first
    async fn list_pending(
        &self,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<SyncIntent>, PortError>;
}

/// In-memory journal
///
/// Pending intents do not survive a restart, so this is only suitable for
/// tests and single-process deployments backed by in-memory stores. Only
/// pending intents are kept; resolving one removes it.
#[derive(Debug, Default)]
pub struct InMemorySyncJournal {
    intents: RwLock<HashMap<SyncIntentId, SyncIntent>>,
}

impl InMemorySyncJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DomainPort for InMemorySyncJournal {}

#[async_trait]
impl HealthCheckable for InMemorySyncJournal {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("in-memory-sync-journal")
    }
}

#[async_trait]
impl SyncJournalPort for InMemorySyncJournal {
    async fn record(
        &self,
        order_id: OrderId,
        operation: SyncOperation,
        _metadata: Option<OperationMetadata>,
    ) -> Result<SyncIntent, PortError> {
        let intent = SyncIntent::new(order_id, operation);
        self.intents.write().await.insert(intent.id, intent.clone());
        Ok(intent)
    }

    async fn resolve(
        &self,
        id: SyncIntentId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        self.intents
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PortError::not_found("SyncIntent", id))
    }

    async fn list_pending(
        &self,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<SyncIntent>, PortError> {
        let intents = self.intents.read().await;
        let mut pending: Vec<SyncIntent> = intents.values().cloned().collect();
        pending.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then(a.id.cmp(&b.id)));
        Ok(pending)
    }
}
