//! Order DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{Currency, CustomerId, Money, ProductId};
use domain_sales::{NewOrder, NewOrderLine, Order, OrderEdit, OrderLine, OrderStatus};
use domain_sync::{MutationOutcome, SyncAction};

/// A line item as submitted; prices are in the configured base currency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl OrderLineRequest {
    pub fn into_line(self, currency: Currency) -> NewOrderLine {
        NewOrderLine::new(
            ProductId::from(self.product_id),
            self.quantity,
            Money::new(self.unit_price, currency),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: Option<Uuid>,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[serde(default)]
    pub lines: Vec<OrderLineRequest>,
}

impl CreateOrderRequest {
    pub fn into_new_order(self, currency: Currency) -> NewOrder {
        NewOrder {
            customer_id: self.customer_id.map(CustomerId::from),
            order_date: self.order_date,
            delivery_date: self.delivery_date,
            notes: self.notes,
            lines: self.lines.into_iter().map(|l| l.into_line(currency)).collect(),
        }
    }
}

/// Full replacement of an order's editable fields and lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
    pub customer_id: Option<Uuid>,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub notes: Option<String>,
    #[serde(default)]
    pub lines: Vec<OrderLineRequest>,
    /// The status the caller last saw; a mismatch is rejected with 409
    pub previous_status: Option<OrderStatus>,
}

impl UpdateOrderRequest {
    /// Splits the request into the edit and the caller's expected status
    pub fn into_edit(self, currency: Currency) -> (OrderEdit, Option<OrderStatus>) {
        let edit = OrderEdit {
            customer_id: self.customer_id.map(CustomerId::from),
            order_date: self.order_date,
            delivery_date: self.delivery_date,
            status: self.status,
            notes: self.notes,
            lines: self.lines.into_iter().map(|l| l.into_line(currency)).collect(),
        };
        (edit, self.previous_status)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub total_value: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.into(),
            customer_id: order.customer_id.map(Into::into),
            order_date: order.order_date,
            delivery_date: order.delivery_date,
            status: order.status,
            total_value: order.total_value.amount(),
            currency: order.total_value.currency().code().to_string(),
            notes: order.notes,
            version: order.version,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            id: line.id.into(),
            product_id: line.product_id.into(),
            quantity: line.quantity,
            unit_price: line.unit_price.amount(),
            subtotal: line.subtotal.amount(),
        }
    }
}

/// An order with its lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub lines: Vec<OrderLineResponse>,
}

impl From<(Order, Vec<OrderLine>)> for OrderDetailResponse {
    fn from((order, lines): (Order, Vec<OrderLine>)) -> Self {
        Self {
            order: order.into(),
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result of a status change or edit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse {
    pub order: OrderResponse,
    pub previous_status: OrderStatus,
    pub ledger_action: SyncAction,
    pub ledger_entry_id: Option<Uuid>,
}

impl From<MutationOutcome> for MutationResponse {
    fn from(outcome: MutationOutcome) -> Self {
        Self {
            order: outcome.order.into(),
            previous_status: outcome.previous_status,
            ledger_action: outcome.action,
            ledger_entry_id: outcome.entry_id.map(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_create_request_uses_base_currency() {
        let request: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "customer_id": null,
            "order_date": "2024-05-10",
            "lines": [
                { "product_id": Uuid::new_v4(), "quantity": "4", "unit_price": "25.00" }
            ]
        }))
        .unwrap();

        let new_order = request.into_new_order(Currency::BRL);
        assert_eq!(new_order.lines.len(), 1);
        assert_eq!(new_order.lines[0].unit_price.currency(), Currency::BRL);
        assert_eq!(new_order.lines[0].subtotal().unwrap().amount(), dec!(100));
        assert!(new_order.delivery_date.is_none());
    }

    #[test]
    fn test_update_request_splits_previous_status() {
        let request: UpdateOrderRequest = serde_json::from_value(serde_json::json!({
            "order_date": "2024-05-10",
            "delivery_date": "2024-05-13",
            "status": "delivered",
            "previous_status": "processing"
        }))
        .unwrap();

        let (edit, previous) = request.into_edit(Currency::BRL);
        assert_eq!(edit.status, OrderStatus::Delivered);
        assert!(edit.lines.is_empty());
        assert_eq!(previous, Some(OrderStatus::Processing));
    }
}
