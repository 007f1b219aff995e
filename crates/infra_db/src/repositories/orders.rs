//! Order repository implementation
//!
//! Database access for the `orders` and `order_lines` tables. Every write
//! bumps `version`; line replacement runs inside one transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const ORDER_COLUMNS: &str = "order_id, customer_id, order_date, delivery_date, status, notes, \
     total_value, currency, version, created_at, updated_at";

const LINE_COLUMNS: &str =
    "line_id, order_id, position, product_id, quantity, unit_price, subtotal, currency";

/// Repository for orders and their line items
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Creates a new OrderRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Retrieves an order by its identifier
    ///
    /// # Returns
    ///
    /// The order row or a NotFound error
    pub async fn get_by_id(&self, order_id: Uuid) -> Result<OrderRow, DatabaseError> {
        let sql = format!("SELECT {} FROM orders WHERE order_id = $1", ORDER_COLUMNS);
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Order", order_id))
    }

    /// Lists orders, optionally filtered by status, ordered by date then id
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<OrderRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM orders \
             WHERE ($1::order_status IS NULL OR status = $1) \
             ORDER BY order_date, order_id \
             LIMIT $2 OFFSET $3",
            ORDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Inserts an order together with its lines
    pub async fn insert(
        &self,
        order: &OrderRow,
        lines: &[OrderLineRow],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                order_id, customer_id, order_date, delivery_date, status, notes,
                total_value, currency, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.order_id)
        .bind(order.customer_id)
        .bind(order.order_date)
        .bind(order.delivery_date)
        .bind(order.status)
        .bind(&order.notes)
        .bind(order.total_value)
        .bind(&order.currency)
        .bind(order.version)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for line in lines {
            insert_line(&mut tx, line).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Overwrites the writable fields of an order
    ///
    /// When `expected_version` is set the update only applies if the stored
    /// version still matches; a mismatch yields `VersionConflict`.
    pub async fn update(
        &self,
        order_id: Uuid,
        fields: &OrderFieldsRow,
        expected_version: Option<i64>,
    ) -> Result<OrderRow, DatabaseError> {
        match update_row(&self.pool, order_id, fields, expected_version).await? {
            Some(row) => Ok(row),
            None => Err(self.version_conflict(order_id, expected_version).await),
        }
    }

    /// Overwrites the writable fields of an order and replaces its lines
    ///
    /// Runs as one transaction; on any error neither the row nor the lines
    /// change. Version handling is the same as [`OrderRepository::update`].
    pub async fn update_with_lines(
        &self,
        order_id: Uuid,
        fields: &OrderFieldsRow,
        lines: &[OrderLineRow],
        expected_version: Option<i64>,
    ) -> Result<OrderRow, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let Some(row) = update_row(&mut *tx, order_id, fields, expected_version).await? else {
            tx.rollback().await?;
            return Err(self.version_conflict(order_id, expected_version).await);
        };

        sqlx::query("DELETE FROM order_lines WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        for line in lines {
            insert_line(&mut tx, line).await?;
        }

        tx.commit().await?;
        Ok(row)
    }

    /// Explains why a versioned update matched no row
    async fn version_conflict(
        &self,
        order_id: Uuid,
        expected_version: Option<i64>,
    ) -> DatabaseError {
        // Either the order is gone or the version moved on
        match self.get_by_id(order_id).await {
            Ok(current) => DatabaseError::VersionConflict(format!(
                "Order {} is at version {}, expected {}",
                order_id,
                current.version,
                expected_version.unwrap_or_default()
            )),
            Err(e) => e,
        }
    }

    /// Deletes an order row; its lines must already be gone
    pub async fn delete(&self, order_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM orders WHERE order_id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Order", order_id));
        }
        Ok(())
    }

    /// Lists the lines of an order in submission order
    pub async fn get_lines(&self, order_id: Uuid) -> Result<Vec<OrderLineRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM order_lines WHERE order_id = $1 ORDER BY position",
            LINE_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderLineRow>(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Replaces every line of an order in one transaction
    pub async fn replace_lines(
        &self,
        order_id: Uuid,
        lines: &[OrderLineRow],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, Uuid>(
            "SELECT order_id FROM orders WHERE order_id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_none() {
            return Err(DatabaseError::not_found("Order", order_id));
        }

        sqlx::query("DELETE FROM order_lines WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        for line in lines {
            insert_line(&mut tx, line).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Deletes every line of an order
    ///
    /// # Returns
    ///
    /// Number of lines removed
    pub async fn delete_lines(&self, order_id: Uuid) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM order_lines WHERE order_id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

async fn update_row<'e, E>(
    executor: E,
    order_id: Uuid,
    fields: &OrderFieldsRow,
    expected_version: Option<i64>,
) -> Result<Option<OrderRow>, DatabaseError>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!(
        "UPDATE orders SET \
             customer_id = $2, order_date = $3, delivery_date = $4, status = $5, \
             notes = $6, total_value = $7, currency = $8, \
             version = version + 1, updated_at = now() \
         WHERE order_id = $1 AND ($9::bigint IS NULL OR version = $9) \
         RETURNING {}",
        ORDER_COLUMNS
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(order_id)
        .bind(fields.customer_id)
        .bind(fields.order_date)
        .bind(fields.delivery_date)
        .bind(fields.status)
        .bind(&fields.notes)
        .bind(fields.total_value)
        .bind(&fields.currency)
        .bind(expected_version)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

async fn insert_line(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    line: &OrderLineRow,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO order_lines (
            line_id, order_id, position, product_id, quantity, unit_price, subtotal, currency
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(line.line_id)
    .bind(line.order_id)
    .bind(line.position)
    .bind(line.product_id)
    .bind(line.quantity)
    .bind(line.unit_price)
    .bind(line.subtotal)
    .bind(&line.currency)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ============================================================================
// Row types
// ============================================================================

/// Order status as stored in the `order_status` enum type
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Delivered,
    Cancelled,
}

/// A row of the `orders` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub order_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub total_value: Decimal,
    pub currency: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The writable columns of an order
#[derive(Debug, Clone)]
pub struct OrderFieldsRow {
    pub customer_id: Option<Uuid>,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub total_value: Decimal,
    pub currency: String,
}

/// A row of the `order_lines` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderLineRow {
    pub line_id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub currency: String,
}
