//! Ledger repository implementation
//!
//! Database access for the `ledger_entries` table. Entries linked to an
//! order are always returned oldest first.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const ENTRY_COLUMNS: &str = "entry_id, kind, category, amount, currency, transaction_date, \
     description, order_ref, created_at, updated_at";

/// Repository for ledger entries
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Retrieves an entry by its identifier
    pub async fn get_by_id(&self, entry_id: Uuid) -> Result<LedgerEntryRow, DatabaseError> {
        let sql = format!("SELECT {} FROM ledger_entries WHERE entry_id = $1", ENTRY_COLUMNS);
        sqlx::query_as::<_, LedgerEntryRow>(&sql)
            .bind(entry_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("LedgerEntry", entry_id))
    }

    /// Finds the earliest revenue entry referencing an order
    pub async fn find_first_revenue(
        &self,
        order_ref: Uuid,
    ) -> Result<Option<LedgerEntryRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM ledger_entries \
             WHERE order_ref = $1 AND kind = 'revenue' \
             ORDER BY created_at, entry_id \
             LIMIT 1",
            ENTRY_COLUMNS
        );
        let row = sqlx::query_as::<_, LedgerEntryRow>(&sql)
            .bind(order_ref)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Lists every entry referencing an order
    pub async fn list_for_order(&self, order_ref: Uuid) -> Result<Vec<LedgerEntryRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM ledger_entries WHERE order_ref = $1 ORDER BY created_at, entry_id",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query_as::<_, LedgerEntryRow>(&sql)
            .bind(order_ref)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn insert(&self, entry: &LedgerEntryRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                entry_id, kind, category, amount, currency, transaction_date,
                description, order_ref, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.entry_id)
        .bind(entry.kind)
        .bind(&entry.category)
        .bind(entry.amount)
        .bind(&entry.currency)
        .bind(entry.transaction_date)
        .bind(&entry.description)
        .bind(entry.order_ref)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Changes an entry's amount and transaction date
    pub async fn update_amount_and_date(
        &self,
        entry_id: Uuid,
        amount: Decimal,
        currency: &str,
        transaction_date: NaiveDate,
    ) -> Result<LedgerEntryRow, DatabaseError> {
        let sql = format!(
            "UPDATE ledger_entries \
             SET amount = $2, currency = $3, transaction_date = $4, updated_at = now() \
             WHERE entry_id = $1 \
             RETURNING {}",
            ENTRY_COLUMNS
        );
        sqlx::query_as::<_, LedgerEntryRow>(&sql)
            .bind(entry_id)
            .bind(amount)
            .bind(currency)
            .bind(transaction_date)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("LedgerEntry", entry_id))
    }

    pub async fn delete(&self, entry_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM ledger_entries WHERE entry_id = $1")
            .bind(entry_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("LedgerEntry", entry_id));
        }
        Ok(())
    }

    /// Deletes every entry referencing an order and returns how many went
    pub async fn delete_for_order(&self, order_ref: Uuid) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM ledger_entries WHERE order_ref = $1")
            .bind(order_ref)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// ============================================================================
// Row types
// ============================================================================

/// Entry kind as stored in the `entry_kind` enum type
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "entry_kind", rename_all = "snake_case")]
pub enum EntryKind {
    Revenue,
    Expense,
}

/// A row of the `ledger_entries` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerEntryRow {
    pub entry_id: Uuid,
    pub kind: EntryKind,
    pub category: String,
    pub amount: Decimal,
    pub currency: String,
    pub transaction_date: NaiveDate,
    pub description: String,
    pub order_ref: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
