//! Sales Domain - Orders and the Order Accessor
//!
//! This crate owns the sales order model and the port through which the
//! rest of the system reads and writes orders and their line items.
//!
//! # Order Lifecycle
//!
//! An order is created in `pending` and may move freely between
//! `pending`, `processing`, `delivered` and `cancelled`; manual
//! corrections such as un-delivering an order are allowed. Only the
//! `delivered` state has ledger consequences, and those are handled by
//! the synchronization services, never by this crate.
//!
//! # Totals
//!
//! An order's `total_value` is always the sum of its lines' subtotals.
//! Use [`compute_total`] when building the field set for a write.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_sales::{NewOrderLine, compute_total};
//!
//! let lines = vec![NewOrderLine::new(product_id, dec!(10), unit_price)];
//! let total = compute_total(Currency::BRL, &lines)?;
//! ```

pub mod order;
pub mod ports;
pub mod error;

pub use order::{
    Order, OrderLine, NewOrderLine, OrderFields, OrderStatus, NewOrderRecord,
    NewOrder, OrderEdit, compute_total,
};
pub use ports::{OrderPort, OrderPortExt, OrderQuery};
pub use error::SalesError;

#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockOrderPort;
