//! Ledger Domain Ports
//!
//! This module defines the Ledger Accessor: the port through which
//! financial entries are read and written, keyed by their optional
//! back-reference to an order.
//!
//! # Architecture
//!
//! - **Postgres Adapter**: `infra_db::adapters::PostgresLedgerAdapter`
//! - **Mock Adapter**: [`mock::MockLedgerPort`], in-memory, for tests

use async_trait::async_trait;

use core_kernel::{LedgerEntryId, OrderId, PortError, DomainPort, OperationMetadata, HealthCheckable};

use crate::entry::{LedgerEntry, NewLedgerEntry, LedgerEntryUpdate};

/// The Ledger Accessor
#[async_trait]
pub trait LedgerPort: DomainPort + HealthCheckable {
    /// Finds the revenue entry linked to an order
    ///
    /// When more than one exists (drift), the earliest-created is returned.
    async fn find_revenue_entry_by_order(
        &self,
        order_id: OrderId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Option<LedgerEntry>, PortError>;

    /// Lists every entry, of any kind, linked to an order, oldest first
    async fn list_entries_for_order(
        &self,
        order_id: OrderId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<LedgerEntry>, PortError>;

    /// Retrieves an entry by ID
    async fn get_entry(
        &self,
        id: LedgerEntryId,
        metadata: Option<OperationMetadata>,
    ) -> Result<LedgerEntry, PortError>;

    /// Inserts a new entry
    ///
    /// # Returns
    ///
    /// The ID of the stored entry
    async fn insert_entry(
        &self,
        entry: NewLedgerEntry,
        metadata: Option<OperationMetadata>,
    ) -> Result<LedgerEntryId, PortError>;

    /// Changes the amount and transaction date of an entry
    async fn update_entry(
        &self,
        id: LedgerEntryId,
        update: LedgerEntryUpdate,
        metadata: Option<OperationMetadata>,
    ) -> Result<LedgerEntry, PortError>;

    /// Deletes an entry
    ///
    /// Returns `PortError::NotFound` when the entry does not exist.
    async fn delete_entry(
        &self,
        id: LedgerEntryId,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    /// Deletes every entry linked to an order
    ///
    /// # Returns
    ///
    /// Number of entries removed
    async fn delete_all_entries_for_order(
        &self,
        order_id: OrderId,
        metadata: Option<OperationMetadata>,
    ) -> Result<u64, PortError>;
}

/// Extension trait for LedgerPort with convenience methods
#[async_trait]
pub trait LedgerPortExt: LedgerPort {
    /// Lists only the revenue entries linked to an order, oldest first
    async fn revenue_entries_for_order(
        &self,
        order_id: OrderId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<LedgerEntry>, PortError> {
        let entries = self.list_entries_for_order(order_id, metadata).await?;
        Ok(entries
            .into_iter()
            .filter(|e| e.is_revenue_for(order_id))
            .collect())
    }
}

// Blanket implementation for all LedgerPort implementors
impl<T: LedgerPort + ?Sized> LedgerPortExt for T {}

/// Mock implementation of LedgerPort for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use core_kernel::HealthCheckResult;

    /// In-memory mock implementation of LedgerPort
    ///
    /// Entries are kept in insertion order, which doubles as creation order.
    #[derive(Debug, Default)]
    pub struct MockLedgerPort {
        entries: Arc<RwLock<Vec<LedgerEntry>>>,
        fail_writes: AtomicBool,
    }

    impl MockLedgerPort {
        /// Creates a new mock port
        pub fn new() -> Self {
            Self::default()
        }

        /// Stores an entry without validation, for seeding drift
        pub async fn insert_raw(&self, entry: LedgerEntry) {
            self.entries.write().await.push(entry);
        }

        /// Returns a snapshot of every stored entry
        pub async fn all_entries(&self) -> Vec<LedgerEntry> {
            self.entries.read().await.clone()
        }

        /// Makes every subsequent write fail with `ServiceUnavailable`
        pub fn set_fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        fn check_writable(&self) -> Result<(), PortError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(PortError::unavailable("mock-ledger-port"));
            }
            Ok(())
        }
    }

    impl DomainPort for MockLedgerPort {}

    #[async_trait]
    impl HealthCheckable for MockLedgerPort {
        async fn health_check(&self) -> HealthCheckResult {
            if self.fail_writes.load(Ordering::SeqCst) {
                HealthCheckResult::degraded("mock-ledger-port", "writes disabled")
            } else {
                HealthCheckResult::healthy("mock-ledger-port")
            }
        }
    }

    #[async_trait]
    impl LedgerPort for MockLedgerPort {
        async fn find_revenue_entry_by_order(
            &self,
            order_id: OrderId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Option<LedgerEntry>, PortError> {
            tokio::task::yield_now().await;
            Ok(self
                .entries
                .read()
                .await
                .iter()
                .find(|e| e.is_revenue_for(order_id))
                .cloned())
        }

        async fn list_entries_for_order(
            &self,
            order_id: OrderId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<LedgerEntry>, PortError> {
            Ok(self
                .entries
                .read()
                .await
                .iter()
                .filter(|e| e.order_ref == Some(order_id))
                .cloned()
                .collect())
        }

        async fn get_entry(
            &self,
            id: LedgerEntryId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<LedgerEntry, PortError> {
            self.entries
                .read()
                .await
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .ok_or_else(|| PortError::not_found("LedgerEntry", id))
        }

        async fn insert_entry(
            &self,
            entry: NewLedgerEntry,
            _metadata: Option<OperationMetadata>,
        ) -> Result<LedgerEntryId, PortError> {
            self.check_writable()?;
            entry
                .validate()
                .map_err(|e| PortError::validation_field(e.to_string(), e.field()))?;

            let stored = LedgerEntry::from_new(entry);
            let id = stored.id;
            self.entries.write().await.push(stored);
            Ok(id)
        }

        async fn update_entry(
            &self,
            id: LedgerEntryId,
            update: LedgerEntryUpdate,
            _metadata: Option<OperationMetadata>,
        ) -> Result<LedgerEntry, PortError> {
            self.check_writable()?;
            update
                .validate()
                .map_err(|e| PortError::validation_field(e.to_string(), e.field()))?;

            let mut entries = self.entries.write().await;
            let entry = entries
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| PortError::not_found("LedgerEntry", id))?;
            entry.apply(update);
            Ok(entry.clone())
        }

        async fn delete_entry(
            &self,
            id: LedgerEntryId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            self.check_writable()?;
            let mut entries = self.entries.write().await;
            let before = entries.len();
            entries.retain(|e| e.id != id);
            if entries.len() == before {
                return Err(PortError::not_found("LedgerEntry", id));
            }
            Ok(())
        }

        async fn delete_all_entries_for_order(
            &self,
            order_id: OrderId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<u64, PortError> {
            self.check_writable()?;
            let mut entries = self.entries.write().await;
            let before = entries.len();
            entries.retain(|e| e.order_ref != Some(order_id));
            Ok((before - entries.len()) as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::mock::MockLedgerPort;
    use crate::entry::EntryKind;
    use chrono::NaiveDate;
    use core_kernel::{Currency, Money};
    use rust_decimal_macros::dec;

    fn revenue(order_id: OrderId, amount: rust_decimal::Decimal) -> NewLedgerEntry {
        NewLedgerEntry::revenue_for_order(
            order_id,
            "Sales",
            Money::new(amount, Currency::BRL),
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            "Sales order #test",
        )
    }

    #[tokio::test]
    async fn test_mock_insert_and_find() {
        let port = MockLedgerPort::new();
        let order_id = OrderId::new();

        assert!(port.find_revenue_entry_by_order(order_id, None).await.unwrap().is_none());

        let id = port.insert_entry(revenue(order_id, dec!(100)), None).await.unwrap();
        let found = port.find_revenue_entry_by_order(order_id, None).await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.amount.amount(), dec!(100));
    }

    #[tokio::test]
    async fn test_find_returns_earliest_when_duplicated() {
        let port = MockLedgerPort::new();
        let order_id = OrderId::new();

        let first = port.insert_entry(revenue(order_id, dec!(100)), None).await.unwrap();
        port.insert_entry(revenue(order_id, dec!(100)), None).await.unwrap();

        let found = port.find_revenue_entry_by_order(order_id, None).await.unwrap().unwrap();
        assert_eq!(found.id, first);
        assert_eq!(port.revenue_entries_for_order(order_id, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_find_ignores_expenses() {
        let port = MockLedgerPort::new();
        let order_id = OrderId::new();
        let mut expense = revenue(order_id, dec!(20));
        expense.kind = EntryKind::Expense;
        port.insert_entry(expense, None).await.unwrap();

        assert!(port.find_revenue_entry_by_order(order_id, None).await.unwrap().is_none());
        assert_eq!(port.list_entries_for_order(order_id, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let port = MockLedgerPort::new();
        let order_id = OrderId::new();
        let id = port.insert_entry(revenue(order_id, dec!(100)), None).await.unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let updated = port
            .update_entry(
                id,
                LedgerEntryUpdate { amount: Money::new(dec!(150), Currency::BRL), transaction_date: date },
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.amount.amount(), dec!(150));

        port.delete_entry(id, None).await.unwrap();
        assert!(port.get_entry(id, None).await.unwrap_err().is_not_found());
        assert!(port.delete_entry(id, None).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_all_for_order_leaves_others() {
        let port = MockLedgerPort::new();
        let target = OrderId::new();
        let other = OrderId::new();
        port.insert_entry(revenue(target, dec!(10)), None).await.unwrap();
        port.insert_entry(revenue(target, dec!(10)), None).await.unwrap();
        port.insert_entry(revenue(other, dec!(10)), None).await.unwrap();

        assert_eq!(port.delete_all_entries_for_order(target, None).await.unwrap(), 2);
        assert_eq!(port.all_entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_negative_amount() {
        let port = MockLedgerPort::new();
        let result = port.insert_entry(revenue(OrderId::new(), dec!(-5)), None).await;
        assert!(matches!(result, Err(PortError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_fail_writes() {
        let port = MockLedgerPort::new();
        port.set_fail_writes(true);
        let result = port.insert_entry(revenue(OrderId::new(), dec!(1)), None).await;
        assert!(result.unwrap_err().is_transient());
    }
}
