//! Sync-intent repository implementation
//!
//! Database access for the `sync_intents` table, the outbox that records
//! order mutations whose ledger step has not been confirmed yet.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Repository for sync intents
#[derive(Debug, Clone)]
pub struct SyncIntentRepository {
    pool: PgPool,
}

impl SyncIntentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, intent: &SyncIntentRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO sync_intents (intent_id, order_id, operation, recorded_at, resolved_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(intent.intent_id)
        .bind(intent.order_id)
        .bind(intent.operation)
        .bind(intent.recorded_at)
        .bind(intent.resolved_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Stamps `resolved_at`, keeping the first stamp if already resolved
    pub async fn resolve(&self, intent_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE sync_intents SET resolved_at = COALESCE(resolved_at, now()) WHERE intent_id = $1",
        )
        .bind(intent_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("SyncIntent", intent_id));
        }
        Ok(())
    }

    /// Lists unresolved intents, oldest first
    pub async fn list_pending(&self) -> Result<Vec<SyncIntentRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, SyncIntentRow>(
            r#"
            SELECT intent_id, order_id, operation, recorded_at, resolved_at
            FROM sync_intents
            WHERE resolved_at IS NULL
            ORDER BY recorded_at, intent_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Operation as stored in the `sync_operation` enum type
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "sync_operation", rename_all = "snake_case")]
pub enum SyncOperation {
    ChangeStatus,
    UpdateOrder,
    DeleteOrder,
}

/// A row of the `sync_intents` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncIntentRow {
    pub intent_id: Uuid,
    pub order_id: Uuid,
    pub operation: SyncOperation,
    pub recorded_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}
