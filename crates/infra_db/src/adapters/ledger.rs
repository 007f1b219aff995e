//! PostgreSQL Ledger Adapter
//!
//! Implements `LedgerPort` on top of [`LedgerRepository`].

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    DomainPort, HealthCheckResult, HealthCheckable, LedgerEntryId, Money, OperationMetadata,
    OrderId, PortError,
};
use domain_ledger::{EntryKind, LedgerEntry, LedgerEntryUpdate, LedgerPort, NewLedgerEntry};

use super::{parse_currency, ping};
use crate::error::DatabaseError;
use crate::repositories::ledger::{EntryKind as DbEntryKind, LedgerEntryRow, LedgerRepository};

/// PostgreSQL-backed implementation of the LedgerPort trait
#[derive(Debug, Clone)]
pub struct PostgresLedgerAdapter {
    repository: LedgerRepository,
    pool: PgPool,
}

impl PostgresLedgerAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: LedgerRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresLedgerAdapter {}

#[async_trait]
impl HealthCheckable for PostgresLedgerAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-ledger-adapter").await
    }
}

#[async_trait]
impl LedgerPort for PostgresLedgerAdapter {
    #[instrument(skip_all, fields(order_id = %order_id))]
    async fn find_revenue_entry_by_order(
        &self,
        order_id: OrderId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Option<LedgerEntry>, PortError> {
        let row = self.repository.find_first_revenue(order_id.into()).await?;
        Ok(row.map(row_to_entry).transpose()?)
    }

    #[instrument(skip_all, fields(order_id = %order_id))]
    async fn list_entries_for_order(
        &self,
        order_id: OrderId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<LedgerEntry>, PortError> {
        let rows = self.repository.list_for_order(order_id.into()).await?;
        rows.into_iter()
            .map(|row| row_to_entry(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip_all, fields(entry_id = %id))]
    async fn get_entry(
        &self,
        id: LedgerEntryId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<LedgerEntry, PortError> {
        let row = self.repository.get_by_id(id.into()).await?;
        Ok(row_to_entry(row)?)
    }

    #[instrument(skip_all, fields(kind = %entry.kind, order_ref = ?entry.order_ref))]
    async fn insert_entry(
        &self,
        entry: NewLedgerEntry,
        _metadata: Option<OperationMetadata>,
    ) -> Result<LedgerEntryId, PortError> {
        entry
            .validate()
            .map_err(|e| PortError::validation_field(e.to_string(), e.field()))?;

        let stored = LedgerEntry::from_new(entry);
        self.repository.insert(&entry_to_row(&stored)).await?;
        debug!(entry_id = %stored.id, "Inserted ledger entry");
        Ok(stored.id)
    }

    #[instrument(skip_all, fields(entry_id = %id))]
    async fn update_entry(
        &self,
        id: LedgerEntryId,
        update: LedgerEntryUpdate,
        _metadata: Option<OperationMetadata>,
    ) -> Result<LedgerEntry, PortError> {
        update
            .validate()
            .map_err(|e| PortError::validation_field(e.to_string(), e.field()))?;

        let row = self
            .repository
            .update_amount_and_date(
                id.into(),
                update.amount.amount(),
                update.amount.currency().code(),
                update.transaction_date,
            )
            .await?;
        Ok(row_to_entry(row)?)
    }

    #[instrument(skip_all, fields(entry_id = %id))]
    async fn delete_entry(
        &self,
        id: LedgerEntryId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        self.repository.delete(id.into()).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(order_id = %order_id))]
    async fn delete_all_entries_for_order(
        &self,
        order_id: OrderId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<u64, PortError> {
        let removed = self.repository.delete_for_order(order_id.into()).await?;
        debug!(removed, "Deleted ledger entries for order");
        Ok(removed)
    }
}

fn entry_to_row(entry: &LedgerEntry) -> LedgerEntryRow {
    LedgerEntryRow {
        entry_id: entry.id.into(),
        kind: match entry.kind {
            EntryKind::Revenue => DbEntryKind::Revenue,
            EntryKind::Expense => DbEntryKind::Expense,
        },
        category: entry.category.clone(),
        amount: entry.amount.amount(),
        currency: entry.amount.currency().code().to_string(),
        transaction_date: entry.transaction_date,
        description: entry.description.clone(),
        order_ref: entry.order_ref.map(Into::into),
        created_at: entry.created_at,
        updated_at: entry.updated_at,
    }
}

fn row_to_entry(row: LedgerEntryRow) -> Result<LedgerEntry, DatabaseError> {
    let currency = parse_currency(&row.currency)?;
    Ok(LedgerEntry {
        id: LedgerEntryId::from(row.entry_id),
        kind: match row.kind {
            DbEntryKind::Revenue => EntryKind::Revenue,
            DbEntryKind::Expense => EntryKind::Expense,
        },
        category: row.category,
        amount: Money::new(row.amount, currency),
        transaction_date: row.transaction_date,
        description: row.description,
        order_ref: row.order_ref.map(OrderId::from),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_entry_row_round_trip() {
        let entry = LedgerEntry::from_new(NewLedgerEntry::revenue_for_order(
            OrderId::new(),
            "Sales",
            Money::new(dec!(150), Currency::BRL),
            NaiveDate::from_ymd_opt(2024, 5, 13).unwrap(),
            "Sales order #1a2b3c4d",
        ));

        let row = entry_to_row(&entry);
        assert_eq!(row.kind, DbEntryKind::Revenue);
        assert_eq!(row.currency, "BRL");
        assert_eq!(row_to_entry(row).unwrap(), entry);
    }

    #[test]
    fn test_manual_entry_keeps_null_order_ref() {
        let entry = LedgerEntry::from_new(NewLedgerEntry {
            kind: EntryKind::Expense,
            category: "Seeds".to_string(),
            amount: Money::new(dec!(42.50), Currency::BRL),
            transaction_date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            description: "Seed restock".to_string(),
            order_ref: None,
        });

        let row = entry_to_row(&entry);
        assert!(row.order_ref.is_none());
        assert_eq!(row_to_entry(row).unwrap().kind, EntryKind::Expense);
    }
}
