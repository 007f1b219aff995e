//! Sales domain errors

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::MoneyError;

/// Errors raised while validating order data
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SalesError {
    /// Line quantity must be strictly positive
    #[error("Invalid quantity on line {line}: {quantity}")]
    InvalidQuantity { line: usize, quantity: Decimal },

    /// Unit price must not be negative
    #[error("Negative unit price on line {line}: {price}")]
    NegativeUnitPrice { line: usize, price: Decimal },

    /// Line is priced in a currency other than the order's
    #[error("Line {line} is priced in {actual}, expected {expected}")]
    LineCurrencyMismatch {
        line: usize,
        expected: String,
        actual: String,
    },

    /// Line quantity, price or subtotal overflows or cannot be stored
    #[error("Line {line} amount rejected: {source}")]
    LineAmount { line: usize, source: MoneyError },

    /// Order total must not be negative
    #[error("Negative order total: {0}")]
    NegativeTotal(Decimal),

    /// Delivery date precedes the order date
    #[error("Delivery date {delivery_date} is before order date {order_date}")]
    DeliveryBeforeOrder {
        order_date: NaiveDate,
        delivery_date: NaiveDate,
    },

    /// Unrecognised order status string
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    /// Arithmetic error while computing totals
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}

impl SalesError {
    /// Name of the input field this error refers to
    pub fn field(&self) -> String {
        match self {
            SalesError::InvalidQuantity { line, .. } => format!("lines[{}].quantity", line),
            SalesError::LineAmount { line, .. } => format!("lines[{}]", line),
            SalesError::NegativeUnitPrice { line, .. }
            | SalesError::LineCurrencyMismatch { line, .. } => {
                format!("lines[{}].unit_price", line)
            }
            SalesError::NegativeTotal(_) | SalesError::Money(_) => "total_value".to_string(),
            SalesError::DeliveryBeforeOrder { .. } => "delivery_date".to_string(),
            SalesError::UnknownStatus(_) => "status".to_string(),
        }
    }
}
