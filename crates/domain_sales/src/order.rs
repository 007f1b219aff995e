//! Sales orders and their line items

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{
    CustomerId, Currency, Money, MoneyError, OrderId, OrderLineId, ProductId, MAX_STORED_AMOUNT,
};
use crate::error::SalesError;

/// Order lifecycle status
///
/// Any status may follow any other; there is no enforced ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Newly created, not yet worked on
    Pending,
    /// Being prepared
    Processing,
    /// Handed to the customer; revenue is recognised
    Delivered,
    /// Abandoned
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Returns the storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Returns true for the status that triggers revenue recognition
    pub fn is_delivered(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = SalesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            other => Err(SalesError::UnknownStatus(other.to_string())),
        }
    }
}

/// A persisted order line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub unit_price: Money,
    /// `quantity * unit_price`, rounded to the currency
    pub subtotal: Money,
}

impl OrderLine {
    /// Returns the caller-side form of this line
    pub fn to_new_line(&self) -> NewOrderLine {
        NewOrderLine::new(self.product_id, self.quantity, self.unit_price)
    }
}

/// A line item supplied by the caller, before persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub unit_price: Money,
}

impl NewOrderLine {
    /// Creates a new line item
    pub fn new(product_id: ProductId, quantity: Decimal, unit_price: Money) -> Self {
        Self {
            product_id,
            quantity,
            unit_price,
        }
    }

    /// Computes the line subtotal
    ///
    /// Fails when the product overflows or cannot be stored.
    pub fn subtotal(&self) -> Result<Money, MoneyError> {
        self.unit_price
            .multiply(self.quantity)?
            .round_to_currency()
            .check_storable()
    }

    /// Validates the line against the order currency
    ///
    /// `index` is the position of the line in the submitted list and is
    /// only used for error reporting.
    pub fn validate(&self, index: usize, currency: Currency) -> Result<(), SalesError> {
        if self.quantity <= Decimal::ZERO {
            return Err(SalesError::InvalidQuantity {
                line: index,
                quantity: self.quantity,
            });
        }
        if self.unit_price.is_negative() {
            return Err(SalesError::NegativeUnitPrice {
                line: index,
                price: self.unit_price.amount(),
            });
        }
        if self.unit_price.currency() != currency {
            return Err(SalesError::LineCurrencyMismatch {
                line: index,
                expected: currency.to_string(),
                actual: self.unit_price.currency().to_string(),
            });
        }
        let out_of_range = |source| SalesError::LineAmount { line: index, source };
        if self.quantity > MAX_STORED_AMOUNT {
            return Err(out_of_range(MoneyError::OutOfRange(self.quantity)));
        }
        self.unit_price.check_storable().map_err(out_of_range)?;
        self.subtotal().map_err(out_of_range)?;
        Ok(())
    }

    /// Materialises the line for a given order
    pub fn into_line(self, order_id: OrderId) -> Result<OrderLine, MoneyError> {
        let subtotal = self.subtotal()?;
        Ok(OrderLine {
            id: OrderLineId::new_v7(),
            order_id,
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
            subtotal,
        })
    }
}

/// Validates every line and returns the sum of their subtotals
///
/// # Errors
///
/// Returns the first invalid line's error.
pub fn compute_total(currency: Currency, lines: &[NewOrderLine]) -> Result<Money, SalesError> {
    for (index, line) in lines.iter().enumerate() {
        line.validate(index, currency)?;
    }
    let subtotals = lines
        .iter()
        .map(NewOrderLine::subtotal)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Money::checked_sum(currency, &subtotals)?.check_storable()?)
}

/// The writable field set of an order
///
/// This is what an order write replaces wholesale; identity, version and
/// timestamps are managed by the accessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFields {
    pub customer_id: Option<CustomerId>,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub total_value: Money,
}

impl OrderFields {
    /// Checks the structural rules that do not depend on line items
    pub fn validate(&self) -> Result<(), SalesError> {
        if self.total_value.is_negative() {
            return Err(SalesError::NegativeTotal(self.total_value.amount()));
        }
        if let Some(delivery_date) = self.delivery_date {
            if delivery_date < self.order_date {
                return Err(SalesError::DeliveryBeforeOrder {
                    order_date: self.order_date,
                    delivery_date,
                });
            }
        }
        Ok(())
    }

    /// The date revenue is recognised on: delivery date if set, else order date
    pub fn effective_date(&self) -> NaiveDate {
        self.delivery_date.unwrap_or(self.order_date)
    }
}

/// Data needed to create an order
///
/// New orders always start in [`OrderStatus::Pending`].
#[derive(Debug, Clone)]
pub struct NewOrderRecord {
    pub customer_id: Option<CustomerId>,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub total_value: Money,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrderRecord {
    /// The field set the order will be created with
    pub fn fields(&self) -> OrderFields {
        OrderFields {
            customer_id: self.customer_id,
            order_date: self.order_date,
            delivery_date: self.delivery_date,
            status: OrderStatus::Pending,
            notes: self.notes.clone(),
            total_value: self.total_value,
        }
    }
}

/// A caller's request to create an order
///
/// The total is never supplied; it is derived from the lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: Option<CustomerId>,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    /// Validates the request and computes its total
    pub fn into_record(self, currency: Currency) -> Result<NewOrderRecord, SalesError> {
        let total_value = compute_total(currency, &self.lines)?;
        let record = NewOrderRecord {
            customer_id: self.customer_id,
            order_date: self.order_date,
            delivery_date: self.delivery_date,
            notes: self.notes,
            total_value,
            lines: self.lines,
        };
        record.fields().validate()?;
        Ok(record)
    }
}

/// A full edit of an existing order
///
/// Every writable field is replaced, including the line items; the total
/// is recomputed from the lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEdit {
    pub customer_id: Option<CustomerId>,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

impl OrderEdit {
    /// Starts an edit from an order's current state
    pub fn from_order(order: &Order, lines: &[OrderLine]) -> Self {
        Self {
            customer_id: order.customer_id,
            order_date: order.order_date,
            delivery_date: order.delivery_date,
            status: order.status,
            notes: order.notes.clone(),
            lines: lines.iter().map(OrderLine::to_new_line).collect(),
        }
    }

    /// Validates the edit and produces the field set to store
    pub fn to_fields(&self, currency: Currency) -> Result<OrderFields, SalesError> {
        let total_value = compute_total(currency, &self.lines)?;
        let fields = OrderFields {
            customer_id: self.customer_id,
            order_date: self.order_date,
            delivery_date: self.delivery_date,
            status: self.status,
            notes: self.notes.clone(),
            total_value,
        };
        fields.validate()?;
        Ok(fields)
    }
}

/// A sales order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier
    pub id: OrderId,
    /// Customer, owned by the customer module
    pub customer_id: Option<CustomerId>,
    /// Date the order was placed
    pub order_date: NaiveDate,
    /// Date the order was handed over, if known
    pub delivery_date: Option<NaiveDate>,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Sum of the line subtotals
    pub total_value: Money,
    /// Free text
    pub notes: Option<String>,
    /// Incremented on every write; used for optimistic concurrency
    pub version: u64,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a fresh pending order from a creation record
    pub fn from_record(record: &NewOrderRecord) -> Self {
        let now = Utc::now();
        let fields = record.fields();
        Self {
            id: OrderId::new_v7(),
            customer_id: fields.customer_id,
            order_date: fields.order_date,
            delivery_date: fields.delivery_date,
            status: fields.status,
            total_value: fields.total_value,
            notes: fields.notes,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// The date revenue is recognised on: delivery date if set, else order date
    pub fn effective_date(&self) -> NaiveDate {
        self.delivery_date.unwrap_or(self.order_date)
    }

    /// Returns the current writable field set
    pub fn fields(&self) -> OrderFields {
        OrderFields {
            customer_id: self.customer_id,
            order_date: self.order_date,
            delivery_date: self.delivery_date,
            status: self.status,
            notes: self.notes.clone(),
            total_value: self.total_value,
        }
    }

    /// Overwrites the writable fields and bumps the version
    pub fn apply(&mut self, fields: OrderFields) {
        self.customer_id = fields.customer_id;
        self.order_date = fields.order_date;
        self.delivery_date = fields.delivery_date;
        self.status = fields.status;
        self.notes = fields.notes;
        self.total_value = fields.total_value;
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(quantity: Decimal, price: Decimal) -> NewOrderLine {
        NewOrderLine::new(ProductId::new(), quantity, Money::new(price, Currency::BRL))
    }

    #[test]
    fn test_subtotal_rounds_to_currency() {
        let l = line(dec!(3), dec!(3.333));
        assert_eq!(l.subtotal().unwrap().amount(), dec!(10.00));
    }

    #[test]
    fn test_compute_total_sums_lines() {
        let lines = vec![line(dec!(2), dec!(25)), line(dec!(1), dec!(50))];
        let total = compute_total(Currency::BRL, &lines).unwrap();
        assert_eq!(total.amount(), dec!(100));
    }

    #[test]
    fn test_compute_total_rejects_zero_quantity() {
        let lines = vec![line(dec!(1), dec!(10)), line(dec!(0), dec!(10))];
        let err = compute_total(Currency::BRL, &lines).unwrap_err();
        assert_eq!(err.field(), "lines[1].quantity");
    }

    #[test]
    fn test_compute_total_rejects_overflowing_line() {
        let huge = dec!(100_000_000_000_000_000_000);
        let lines = vec![line(dec!(1), dec!(10)), line(huge, huge)];
        let err = compute_total(Currency::BRL, &lines).unwrap_err();
        assert!(matches!(
            err,
            SalesError::LineAmount { line: 1, source: MoneyError::OutOfRange(_) }
        ));
        assert_eq!(err.field(), "lines[1]");
    }

    #[test]
    fn test_compute_total_rejects_unstorable_subtotal() {
        // Each factor fits the column, the product does not
        let lines = vec![line(dec!(100_000_000), dec!(100_000_000))];
        let err = compute_total(Currency::BRL, &lines).unwrap_err();
        assert!(matches!(err, SalesError::LineAmount { line: 0, .. }));
    }

    #[test]
    fn test_compute_total_rejects_unstorable_sum() {
        let lines = vec![
            line(dec!(1), dec!(600_000_000_000_000)),
            line(dec!(1), dec!(600_000_000_000_000)),
        ];
        let err = compute_total(Currency::BRL, &lines).unwrap_err();
        assert_eq!(err, SalesError::Money(MoneyError::OutOfRange(dec!(1_200_000_000_000_000))));
        assert_eq!(err.field(), "total_value");
    }

    #[test]
    fn test_status_parse_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_effective_date_prefers_delivery() {
        let order_date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let delivery = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let mut fields = NewOrderRecord {
            customer_id: None,
            order_date,
            delivery_date: None,
            notes: None,
            total_value: Money::zero(Currency::BRL),
            lines: vec![],
        }
        .fields();
        assert_eq!(fields.effective_date(), order_date);
        fields.delivery_date = Some(delivery);
        assert_eq!(fields.effective_date(), delivery);
    }
}
