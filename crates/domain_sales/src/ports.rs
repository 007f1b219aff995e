//! Sales Domain Ports
//!
//! This module defines the Order Accessor: the port through which orders
//! and their line items are read and written. The synchronization services
//! depend only on this trait, never on a concrete store.
//!
//! # Architecture
//!
//! - **Postgres Adapter**: `infra_db::adapters::PostgresOrderAdapter`
//! - **Mock Adapter**: [`mock::MockOrderPort`], in-memory, for tests
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_sales::ports::OrderPort;
//! use std::sync::Arc;
//!
//! pub struct OrderService {
//!     orders: Arc<dyn OrderPort>,
//! }
//!
//! impl OrderService {
//!     pub async fn get(&self, id: OrderId) -> Result<Order, PortError> {
//!         self.orders.get_order(id, None).await
//!     }
//! }
//! ```

use async_trait::async_trait;

use core_kernel::{OrderId, PortError, DomainPort, OperationMetadata, HealthCheckable};

use crate::order::{Order, OrderLine, NewOrderLine, OrderFields, OrderStatus, NewOrderRecord};

/// Query parameters for listing orders
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Filter by status
    pub status: Option<OrderStatus>,
    /// Limit results
    pub limit: Option<u32>,
    /// Offset for pagination
    pub offset: Option<u32>,
}

impl OrderQuery {
    /// Creates a query matching every order
    pub fn all() -> Self {
        Self::default()
    }

    /// Creates a query to find by status
    pub fn by_status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Adds pagination to the query
    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// The Order Accessor
///
/// A thin read/write interface over order records and their lines. It
/// applies no business rules beyond storage constraints; totals and
/// ledger consequences are the caller's responsibility.
#[async_trait]
pub trait OrderPort: DomainPort + HealthCheckable {
    // ========================================================================
    // Order Operations
    // ========================================================================

    /// Retrieves an order by ID
    ///
    /// # Returns
    ///
    /// The order if found, or `PortError::NotFound`
    async fn get_order(
        &self,
        id: OrderId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Order, PortError>;

    /// Lists orders matching the query, ordered by order date then id
    async fn list_orders(
        &self,
        query: OrderQuery,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Order>, PortError>;

    /// Creates a new pending order together with its lines
    async fn create_order(
        &self,
        record: NewOrderRecord,
        metadata: Option<OperationMetadata>,
    ) -> Result<Order, PortError>;

    /// Overwrites an order's writable fields
    ///
    /// # Arguments
    ///
    /// * `id` - The order identifier
    /// * `fields` - The complete field set to store
    /// * `expected_version` - When set, the write only succeeds if the
    ///   stored version matches; otherwise `PortError::Conflict`
    ///
    /// # Returns
    ///
    /// The order as stored after the write
    async fn update_order(
        &self,
        id: OrderId,
        fields: OrderFields,
        expected_version: Option<u64>,
        metadata: Option<OperationMetadata>,
    ) -> Result<Order, PortError>;

    /// Overwrites an order's fields and replaces its lines in one write
    ///
    /// Either both the order row and the lines are stored or neither is, so
    /// a stored total always matches the stored lines. `expected_version`
    /// behaves as in [`OrderPort::update_order`].
    async fn update_order_with_lines(
        &self,
        id: OrderId,
        fields: OrderFields,
        lines: Vec<NewOrderLine>,
        expected_version: Option<u64>,
        metadata: Option<OperationMetadata>,
    ) -> Result<(Order, Vec<OrderLine>), PortError>;

    /// Deletes an order row
    ///
    /// Returns `PortError::NotFound` when the order does not exist.
    async fn delete_order(
        &self,
        id: OrderId,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    // ========================================================================
    // Line Operations
    // ========================================================================

    /// Lists the lines of an order
    async fn list_lines_for_order(
        &self,
        id: OrderId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<OrderLine>, PortError>;

    /// Replaces every line of an order
    ///
    /// # Returns
    ///
    /// The stored lines
    async fn replace_lines_for_order(
        &self,
        id: OrderId,
        lines: Vec<NewOrderLine>,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<OrderLine>, PortError>;

    /// Deletes every line of an order
    ///
    /// # Returns
    ///
    /// Number of lines removed
    async fn delete_lines_for_order(
        &self,
        id: OrderId,
        metadata: Option<OperationMetadata>,
    ) -> Result<u64, PortError>;
}

/// Extension trait for OrderPort with convenience methods
#[async_trait]
pub trait OrderPortExt: OrderPort {
    /// Loads an order together with its lines
    async fn get_order_with_lines(
        &self,
        id: OrderId,
        metadata: Option<OperationMetadata>,
    ) -> Result<(Order, Vec<OrderLine>), PortError> {
        let order = self.get_order(id, metadata.clone()).await?;
        let lines = self.list_lines_for_order(id, metadata).await?;
        Ok((order, lines))
    }

    /// Checks if an order exists
    async fn order_exists(
        &self,
        id: OrderId,
        metadata: Option<OperationMetadata>,
    ) -> Result<bool, PortError> {
        match self.get_order(id, metadata).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// Blanket implementation for all OrderPort implementors
impl<T: OrderPort + ?Sized> OrderPortExt for T {}

/// Mock implementation of OrderPort for testing
///
/// This adapter stores orders in memory. Writes can be made to fail on
/// demand to exercise partial-failure paths.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use core_kernel::HealthCheckResult;

    /// In-memory mock implementation of OrderPort
    #[derive(Debug, Default)]
    pub struct MockOrderPort {
        orders: Arc<RwLock<HashMap<OrderId, Order>>>,
        lines: Arc<RwLock<HashMap<OrderId, Vec<OrderLine>>>>,
        fail_writes: AtomicBool,
        fail_line_writes: AtomicBool,
    }

    fn materialise_lines(
        id: OrderId,
        lines: Vec<NewOrderLine>,
    ) -> Result<Vec<OrderLine>, PortError> {
        lines
            .into_iter()
            .map(|l| l.into_line(id))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PortError::validation_field(e.to_string(), "lines"))
    }

    impl MockOrderPort {
        /// Creates a new mock port
        pub fn new() -> Self {
            Self::default()
        }

        /// Stores an order as-is, bypassing versioning
        pub async fn insert_order(&self, order: Order) {
            self.orders.write().await.insert(order.id, order);
        }

        /// Makes every subsequent write fail with `ServiceUnavailable`
        pub fn set_fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        /// Makes only line writes fail, leaving order rows writable
        pub fn set_fail_line_writes(&self, fail: bool) {
            self.fail_line_writes.store(fail, Ordering::SeqCst);
        }

        fn check_writable(&self) -> Result<(), PortError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(PortError::unavailable("mock-order-port"));
            }
            Ok(())
        }

        fn check_lines_writable(&self) -> Result<(), PortError> {
            self.check_writable()?;
            if self.fail_line_writes.load(Ordering::SeqCst) {
                return Err(PortError::unavailable("mock-order-port"));
            }
            Ok(())
        }
    }

    impl DomainPort for MockOrderPort {}

    #[async_trait]
    impl HealthCheckable for MockOrderPort {
        async fn health_check(&self) -> HealthCheckResult {
            let failing = self.fail_writes.load(Ordering::SeqCst)
                || self.fail_line_writes.load(Ordering::SeqCst);
            if failing {
                HealthCheckResult::degraded("mock-order-port", "writes disabled")
            } else {
                HealthCheckResult::healthy("mock-order-port")
            }
        }
    }

    #[async_trait]
    impl OrderPort for MockOrderPort {
        async fn get_order(
            &self,
            id: OrderId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Order, PortError> {
            // Give concurrent callers a chance to interleave, as real I/O would
            tokio::task::yield_now().await;
            self.orders
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Order", id))
        }

        async fn list_orders(
            &self,
            query: OrderQuery,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<Order>, PortError> {
            let orders = self.orders.read().await;
            let mut results: Vec<Order> = orders
                .values()
                .filter(|o| query.status.map_or(true, |s| o.status == s))
                .cloned()
                .collect();
            results.sort_by(|a, b| a.order_date.cmp(&b.order_date).then(a.id.cmp(&b.id)));

            // Apply pagination
            let offset = query.offset.unwrap_or(0) as usize;
            let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
            Ok(results.into_iter().skip(offset).take(limit).collect())
        }

        async fn create_order(
            &self,
            record: NewOrderRecord,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Order, PortError> {
            self.check_lines_writable()?;
            let order = Order::from_record(&record);
            let lines = materialise_lines(order.id, record.lines)?;

            self.orders.write().await.insert(order.id, order.clone());
            self.lines.write().await.insert(order.id, lines);
            Ok(order)
        }

        async fn update_order(
            &self,
            id: OrderId,
            fields: OrderFields,
            expected_version: Option<u64>,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Order, PortError> {
            self.check_writable()?;
            let mut orders = self.orders.write().await;
            let order = orders
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Order", id))?;

            if let Some(expected) = expected_version {
                if order.version != expected {
                    return Err(PortError::conflict(format!(
                        "Order {} is at version {}, expected {}",
                        id, order.version, expected
                    )));
                }
            }

            order.apply(fields);
            Ok(order.clone())
        }

        async fn update_order_with_lines(
            &self,
            id: OrderId,
            fields: OrderFields,
            lines: Vec<NewOrderLine>,
            expected_version: Option<u64>,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(Order, Vec<OrderLine>), PortError> {
            self.check_lines_writable()?;
            let stored = materialise_lines(id, lines)?;

            // Both maps stay locked so no reader sees the order without its lines
            let mut orders = self.orders.write().await;
            let mut all_lines = self.lines.write().await;
            let order = orders
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Order", id))?;

            if let Some(expected) = expected_version {
                if order.version != expected {
                    return Err(PortError::conflict(format!(
                        "Order {} is at version {}, expected {}",
                        id, order.version, expected
                    )));
                }
            }

            order.apply(fields);
            all_lines.insert(id, stored.clone());
            Ok((order.clone(), stored))
        }

        async fn delete_order(
            &self,
            id: OrderId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            self.check_writable()?;
            self.orders
                .write()
                .await
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("Order", id))
        }

        async fn list_lines_for_order(
            &self,
            id: OrderId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<OrderLine>, PortError> {
            Ok(self.lines.read().await.get(&id).cloned().unwrap_or_default())
        }

        async fn replace_lines_for_order(
            &self,
            id: OrderId,
            lines: Vec<NewOrderLine>,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<OrderLine>, PortError> {
            self.check_lines_writable()?;
            if !self.orders.read().await.contains_key(&id) {
                return Err(PortError::not_found("Order", id));
            }
            let stored = materialise_lines(id, lines)?;
            self.lines.write().await.insert(id, stored.clone());
            Ok(stored)
        }

        async fn delete_lines_for_order(
            &self,
            id: OrderId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<u64, PortError> {
            self.check_lines_writable()?;
            let removed = self.lines.write().await.remove(&id).unwrap_or_default();
            Ok(removed.len() as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::mock::MockOrderPort;
    use chrono::NaiveDate;
    use core_kernel::{Currency, Money, ProductId};
    use rust_decimal_macros::dec;

    fn create_test_record() -> NewOrderRecord {
        let lines = vec![NewOrderLine::new(
            ProductId::new(),
            dec!(4),
            Money::new(dec!(25), Currency::BRL),
        )];
        NewOrderRecord {
            customer_id: None,
            order_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            delivery_date: None,
            notes: Some("Tomatoes, crate of 20kg".to_string()),
            total_value: Money::new(dec!(100), Currency::BRL),
            lines,
        }
    }

    #[tokio::test]
    async fn test_mock_port_create_and_get() {
        let port = MockOrderPort::new();
        let order = port.create_order(create_test_record(), None).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.version, 1);

        let (retrieved, lines) = port.get_order_with_lines(order.id, None).await.unwrap();
        assert_eq!(retrieved.id, order.id);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].subtotal.amount(), dec!(100));
    }

    #[tokio::test]
    async fn test_mock_port_not_found() {
        let port = MockOrderPort::new();
        let result = port.get_order(OrderId::new_v7(), None).await;
        assert!(result.unwrap_err().is_not_found());
        assert!(!port.order_exists(OrderId::new_v7(), None).await.unwrap());
    }

    #[tokio::test]
    async fn test_mock_port_update_checks_version() {
        let port = MockOrderPort::new();
        let order = port.create_order(create_test_record(), None).await.unwrap();

        let mut fields = order.fields();
        fields.status = OrderStatus::Processing;
        let updated = port
            .update_order(order.id, fields.clone(), Some(1), None)
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.status, OrderStatus::Processing);

        let stale = port.update_order(order.id, fields, Some(1), None).await;
        assert!(stale.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_mock_port_delete() {
        let port = MockOrderPort::new();
        let order = port.create_order(create_test_record(), None).await.unwrap();

        assert_eq!(port.delete_lines_for_order(order.id, None).await.unwrap(), 1);
        port.delete_order(order.id, None).await.unwrap();

        let again = port.delete_order(order.id, None).await;
        assert!(again.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_mock_port_fail_writes() {
        let port = MockOrderPort::new();
        port.set_fail_writes(true);
        let result = port.create_order(create_test_record(), None).await;
        assert!(result.unwrap_err().is_transient());
    }

    #[tokio::test]
    async fn test_mock_port_update_with_lines_is_all_or_nothing() {
        let port = MockOrderPort::new();
        let order = port.create_order(create_test_record(), None).await.unwrap();

        let mut fields = order.fields();
        fields.total_value = Money::new(dec!(150), Currency::BRL);
        let lines = vec![NewOrderLine::new(
            ProductId::new(),
            dec!(6),
            Money::new(dec!(25), Currency::BRL),
        )];

        port.set_fail_line_writes(true);
        let failed = port
            .update_order_with_lines(order.id, fields.clone(), lines.clone(), Some(1), None)
            .await;
        assert!(failed.unwrap_err().is_transient());

        let (unchanged, old_lines) = port.get_order_with_lines(order.id, None).await.unwrap();
        assert_eq!(unchanged.version, 1);
        assert_eq!(unchanged.total_value.amount(), dec!(100));
        assert_eq!(old_lines[0].quantity, dec!(4));

        port.set_fail_line_writes(false);
        let (updated, stored) = port
            .update_order_with_lines(order.id, fields, lines, Some(1), None)
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.total_value.amount(), dec!(150));
        assert_eq!(stored[0].subtotal.amount(), dec!(150));
    }

    #[tokio::test]
    async fn test_mock_port_list_by_status() {
        let port = MockOrderPort::new();
        let a = port.create_order(create_test_record(), None).await.unwrap();
        port.create_order(create_test_record(), None).await.unwrap();

        let mut fields = a.fields();
        fields.status = OrderStatus::Delivered;
        port.update_order(a.id, fields, None, None).await.unwrap();

        let delivered = port
            .list_orders(OrderQuery::by_status(OrderStatus::Delivered), None)
            .await
            .unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].id, a.id);

        let page = port.list_orders(OrderQuery::all().paginate(1, 1), None).await.unwrap();
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_mock_port_health_check() {
        let port = MockOrderPort::new();
        assert_eq!(port.health_check().await.status, core_kernel::AdapterHealth::Healthy);

        port.set_fail_writes(true);
        let result = port.health_check().await;
        assert_eq!(result.status, core_kernel::AdapterHealth::Degraded);
        assert!(result.is_available());
    }
}
