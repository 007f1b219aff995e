//! PostgreSQL Sync Journal
//!
//! Durable implementation of `SyncJournalPort`. Unlike the in-memory
//! journal, pending intents survive a restart and are replayed by the
//! recovery pass on startup.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    DomainPort, HealthCheckResult, HealthCheckable, OperationMetadata, OrderId, PortError,
    SyncIntentId,
};
use domain_sync::{SyncIntent, SyncJournalPort, SyncOperation};

use super::ping;
use crate::repositories::sync_intents::{
    SyncIntentRepository, SyncIntentRow, SyncOperation as DbSyncOperation,
};

/// PostgreSQL-backed sync-intent journal
#[derive(Debug, Clone)]
pub struct PostgresSyncJournal {
    repository: SyncIntentRepository,
    pool: PgPool,
}

impl PostgresSyncJournal {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: SyncIntentRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresSyncJournal {}

#[async_trait]
impl HealthCheckable for PostgresSyncJournal {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-sync-journal").await
    }
}

#[async_trait]
impl SyncJournalPort for PostgresSyncJournal {
    #[instrument(skip_all, fields(order_id = %order_id, operation = %operation))]
    async fn record(
        &self,
        order_id: OrderId,
        operation: SyncOperation,
        _metadata: Option<OperationMetadata>,
    ) -> Result<SyncIntent, PortError> {
        let intent = SyncIntent::new(order_id, operation);
        self.repository.insert(&intent_to_row(&intent)).await?;
        debug!(intent_id = %intent.id, "Recorded sync intent");
        Ok(intent)
    }

    #[instrument(skip_all, fields(intent_id = %id))]
    async fn resolve(
        &self,
        id: SyncIntentId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        self.repository.resolve(id.into()).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn list_pending(
        &self,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<SyncIntent>, PortError> {
        let rows = self.repository.list_pending().await?;
        debug!(count = rows.len(), "Loaded pending sync intents");
        Ok(rows.into_iter().map(row_to_intent).collect())
    }
}

fn intent_to_row(intent: &SyncIntent) -> SyncIntentRow {
    SyncIntentRow {
        intent_id: intent.id.into(),
        order_id: intent.order_id.into(),
        operation: match intent.operation {
            SyncOperation::ChangeStatus => DbSyncOperation::ChangeStatus,
            SyncOperation::UpdateOrder => DbSyncOperation::UpdateOrder,
            SyncOperation::DeleteOrder => DbSyncOperation::DeleteOrder,
        },
        recorded_at: intent.recorded_at,
        resolved_at: intent.resolved_at,
    }
}

fn row_to_intent(row: SyncIntentRow) -> SyncIntent {
    SyncIntent {
        id: SyncIntentId::from(row.intent_id),
        order_id: OrderId::from(row.order_id),
        operation: match row.operation {
            DbSyncOperation::ChangeStatus => SyncOperation::ChangeStatus,
            DbSyncOperation::UpdateOrder => SyncOperation::UpdateOrder,
            DbSyncOperation::DeleteOrder => SyncOperation::DeleteOrder,
        },
        recorded_at: row.recorded_at,
        resolved_at: row.resolved_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_row_round_trip() {
        for operation in [
            SyncOperation::ChangeStatus,
            SyncOperation::UpdateOrder,
            SyncOperation::DeleteOrder,
        ] {
            let intent = SyncIntent::new(OrderId::new(), operation);
            assert_eq!(row_to_intent(intent_to_row(&intent)), intent);
        }
    }
}
