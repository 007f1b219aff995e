//! PostgreSQL Order Adapter
//!
//! Implements `OrderPort` on top of [`OrderRepository`]. Identity, version
//! and timestamps for new orders are minted by the domain model; the
//! database owns the version bump on every later write.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    CustomerId, DomainPort, HealthCheckResult, HealthCheckable, Money, OperationMetadata,
    OrderId, OrderLineId, PortError, ProductId,
};
use domain_sales::{
    NewOrderLine, NewOrderRecord, Order, OrderFields, OrderLine, OrderPort, OrderQuery,
    OrderStatus,
};

use super::{parse_currency, ping};
use crate::error::DatabaseError;
use crate::repositories::orders::{
    OrderFieldsRow, OrderLineRow, OrderRepository, OrderRow, OrderStatus as DbOrderStatus,
};

/// PostgreSQL-backed implementation of the OrderPort trait
#[derive(Debug, Clone)]
pub struct PostgresOrderAdapter {
    repository: OrderRepository,
    pool: PgPool,
}

impl PostgresOrderAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: OrderRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &OrderRepository {
        &self.repository
    }
}

impl DomainPort for PostgresOrderAdapter {}

#[async_trait]
impl HealthCheckable for PostgresOrderAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-order-adapter").await
    }
}

#[async_trait]
impl OrderPort for PostgresOrderAdapter {
    #[instrument(skip_all, fields(order_id = %id))]
    async fn get_order(
        &self,
        id: OrderId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Order, PortError> {
        debug!("Fetching order");
        let row = self.repository.get_by_id(id.into()).await?;
        Ok(row_to_order(row)?)
    }

    #[instrument(skip_all, fields(status = ?query.status))]
    async fn list_orders(
        &self,
        query: OrderQuery,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Order>, PortError> {
        let rows = self
            .repository
            .list(
                query.status.map(domain_to_db_status),
                query.limit.map(i64::from),
                query.offset.map(i64::from).unwrap_or(0),
            )
            .await?;
        debug!(count = rows.len(), "Listed orders");

        rows.into_iter()
            .map(|row| row_to_order(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip_all, fields(lines = record.lines.len()))]
    async fn create_order(
        &self,
        record: NewOrderRecord,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Order, PortError> {
        let order = Order::from_record(&record);
        let (_, rows) = materialise_lines(order.id, record.lines)?;

        self.repository.insert(&order_to_row(&order), &rows).await?;
        debug!(order_id = %order.id, "Inserted order");
        Ok(order)
    }

    #[instrument(skip_all, fields(order_id = %id, status = %fields.status))]
    async fn update_order(
        &self,
        id: OrderId,
        fields: OrderFields,
        expected_version: Option<u64>,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Order, PortError> {
        let expected_version = to_db_version(expected_version)?;

        let row = self
            .repository
            .update(id.into(), &fields_to_row(&fields), expected_version)
            .await?;
        Ok(row_to_order(row)?)
    }

    #[instrument(skip_all, fields(order_id = %id, status = %fields.status, lines = lines.len()))]
    async fn update_order_with_lines(
        &self,
        id: OrderId,
        fields: OrderFields,
        lines: Vec<NewOrderLine>,
        expected_version: Option<u64>,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(Order, Vec<OrderLine>), PortError> {
        let expected_version = to_db_version(expected_version)?;
        let (stored, rows) = materialise_lines(id, lines)?;

        let row = self
            .repository
            .update_with_lines(id.into(), &fields_to_row(&fields), &rows, expected_version)
            .await?;
        debug!("Updated order and lines");
        Ok((row_to_order(row)?, stored))
    }

    #[instrument(skip_all, fields(order_id = %id))]
    async fn delete_order(
        &self,
        id: OrderId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        self.repository.delete(id.into()).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(order_id = %id))]
    async fn list_lines_for_order(
        &self,
        id: OrderId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<OrderLine>, PortError> {
        let rows = self.repository.get_lines(id.into()).await?;
        rows.into_iter()
            .map(|row| row_to_line(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip_all, fields(order_id = %id, lines = lines.len()))]
    async fn replace_lines_for_order(
        &self,
        id: OrderId,
        lines: Vec<NewOrderLine>,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<OrderLine>, PortError> {
        let (stored, rows) = materialise_lines(id, lines)?;

        self.repository.replace_lines(id.into(), &rows).await?;
        Ok(stored)
    }

    #[instrument(skip_all, fields(order_id = %id))]
    async fn delete_lines_for_order(
        &self,
        id: OrderId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<u64, PortError> {
        Ok(self.repository.delete_lines(id.into()).await?)
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn to_db_version(version: Option<u64>) -> Result<Option<i64>, PortError> {
    version
        .map(i64::try_from)
        .transpose()
        .map_err(|_| PortError::validation_field("Version out of range", "version"))
}

/// Prices the caller's lines and builds their rows, keeping submission order
fn materialise_lines(
    order_id: OrderId,
    lines: Vec<NewOrderLine>,
) -> Result<(Vec<OrderLine>, Vec<OrderLineRow>), PortError> {
    let stored = lines
        .into_iter()
        .map(|l| l.into_line(order_id))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| PortError::validation_field(e.to_string(), "lines"))?;
    let rows = stored
        .iter()
        .cloned()
        .enumerate()
        .map(|(position, line)| line_to_row(position, line))
        .collect();
    Ok((stored, rows))
}

fn domain_to_db_status(status: OrderStatus) -> DbOrderStatus {
    match status {
        OrderStatus::Pending => DbOrderStatus::Pending,
        OrderStatus::Processing => DbOrderStatus::Processing,
        OrderStatus::Delivered => DbOrderStatus::Delivered,
        OrderStatus::Cancelled => DbOrderStatus::Cancelled,
    }
}

fn db_to_domain_status(status: DbOrderStatus) -> OrderStatus {
    match status {
        DbOrderStatus::Pending => OrderStatus::Pending,
        DbOrderStatus::Processing => OrderStatus::Processing,
        DbOrderStatus::Delivered => OrderStatus::Delivered,
        DbOrderStatus::Cancelled => OrderStatus::Cancelled,
    }
}

fn order_to_row(order: &Order) -> OrderRow {
    OrderRow {
        order_id: order.id.into(),
        customer_id: order.customer_id.map(Into::into),
        order_date: order.order_date,
        delivery_date: order.delivery_date,
        status: domain_to_db_status(order.status),
        notes: order.notes.clone(),
        total_value: order.total_value.amount(),
        currency: order.total_value.currency().code().to_string(),
        version: order.version as i64,
        created_at: order.created_at,
        updated_at: order.updated_at,
    }
}

fn fields_to_row(fields: &OrderFields) -> OrderFieldsRow {
    OrderFieldsRow {
        customer_id: fields.customer_id.map(Into::into),
        order_date: fields.order_date,
        delivery_date: fields.delivery_date,
        status: domain_to_db_status(fields.status),
        notes: fields.notes.clone(),
        total_value: fields.total_value.amount(),
        currency: fields.total_value.currency().code().to_string(),
    }
}

fn row_to_order(row: OrderRow) -> Result<Order, DatabaseError> {
    let currency = parse_currency(&row.currency)?;
    let version = u64::try_from(row.version)
        .map_err(|_| DatabaseError::CorruptRow(format!("negative version {}", row.version)))?;

    Ok(Order {
        id: OrderId::from(row.order_id),
        customer_id: row.customer_id.map(CustomerId::from),
        order_date: row.order_date,
        delivery_date: row.delivery_date,
        status: db_to_domain_status(row.status),
        total_value: Money::new(row.total_value, currency),
        notes: row.notes,
        version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn line_to_row(position: usize, line: OrderLine) -> OrderLineRow {
    OrderLineRow {
        line_id: line.id.into(),
        order_id: line.order_id.into(),
        position: position as i32,
        product_id: line.product_id.into(),
        quantity: line.quantity,
        unit_price: line.unit_price.amount(),
        subtotal: line.subtotal.amount(),
        currency: line.unit_price.currency().code().to_string(),
    }
}

fn row_to_line(row: OrderLineRow) -> Result<OrderLine, DatabaseError> {
    let currency = parse_currency(&row.currency)?;
    Ok(OrderLine {
        id: OrderLineId::from(row.line_id),
        order_id: OrderId::from(row.order_id),
        product_id: ProductId::from(row.product_id),
        quantity: row.quantity,
        unit_price: Money::new(row.unit_price, currency),
        subtotal: Money::new(row.subtotal, currency),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn sample_record() -> NewOrderRecord {
        NewOrderRecord {
            customer_id: Some(CustomerId::new()),
            order_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            delivery_date: NaiveDate::from_ymd_opt(2024, 5, 13),
            notes: Some("Lettuce, 12 heads".to_string()),
            total_value: Money::new(dec!(36), Currency::BRL),
            lines: vec![NewOrderLine::new(
                ProductId::new(),
                dec!(12),
                Money::new(dec!(3), Currency::BRL),
            )],
        }
    }

    #[test]
    fn test_order_row_round_trip_keeps_fields() {
        let order = Order::from_record(&sample_record());
        let back = row_to_order(order_to_row(&order)).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn test_unpriceable_line_is_rejected_before_any_row_is_built() {
        let huge = dec!(100_000_000_000_000_000_000);
        let lines = vec![NewOrderLine::new(ProductId::new(), huge, Money::new(huge, Currency::BRL))];
        let err = materialise_lines(OrderId::new(), lines).unwrap_err();
        assert!(matches!(err, PortError::Validation { field: Some(ref f), .. } if f == "lines"));
    }

    #[test]
    fn test_status_mapping_is_total() {
        for status in OrderStatus::ALL {
            assert_eq!(db_to_domain_status(domain_to_db_status(status)), status);
        }
    }

    #[test]
    fn test_unknown_currency_is_corrupt_row() {
        let mut row = order_to_row(&Order::from_record(&sample_record()));
        row.currency = "XXX".to_string();
        assert!(matches!(row_to_order(row), Err(DatabaseError::CorruptRow(_))));
    }

    #[test]
    fn test_negative_version_is_corrupt_row() {
        let mut row = order_to_row(&Order::from_record(&sample_record()));
        row.version = -1;
        assert!(matches!(row_to_order(row), Err(DatabaseError::CorruptRow(_))));
    }

    #[test]
    fn test_line_rows_keep_position_and_subtotal() {
        let order_id = OrderId::new();
        let line = NewOrderLine::new(ProductId::new(), dec!(2.5), Money::new(dec!(4), Currency::BRL))
            .into_line(order_id)
            .unwrap();

        let row = line_to_row(3, line.clone());
        assert_eq!(row.position, 3);
        assert_eq!(row.subtotal, dec!(10));
        assert_eq!(row_to_line(row).unwrap(), line);
    }
}
