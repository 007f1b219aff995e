//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use chrono::NaiveDate;
use core_kernel::{Currency, CustomerId, Money};
use domain_ledger::{EntryKind, LedgerEntry, NewLedgerEntry};
use domain_sales::{NewOrder, NewOrderLine, Order, OrderEdit, OrderLine, OrderStatus};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::{DateFixtures, IdFixtures};

/// Builder for order creation requests
pub struct NewOrderBuilder {
    customer_id: Option<CustomerId>,
    order_date: NaiveDate,
    delivery_date: Option<NaiveDate>,
    notes: Option<String>,
    lines: Vec<NewOrderLine>,
}

impl Default for NewOrderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewOrderBuilder {
    /// Creates a builder for an order with no lines, dated on the standard order date
    pub fn new() -> Self {
        Self {
            customer_id: Some(IdFixtures::customer_id()),
            order_date: DateFixtures::order_date(),
            delivery_date: None,
            notes: None,
            lines: Vec::new(),
        }
    }

    /// Adds a BRL line
    pub fn with_line(mut self, quantity: Decimal, unit_price: Decimal) -> Self {
        self.lines.push(NewOrderLine::new(
            IdFixtures::product_id(),
            quantity,
            Money::new(unit_price, Currency::BRL),
        ));
        self
    }

    /// Replaces the lines with a single line totalling `total`
    pub fn with_total(mut self, total: Decimal) -> Self {
        self.lines = vec![NewOrderLine::new(
            IdFixtures::product_id(),
            dec!(1),
            Money::new(total, Currency::BRL),
        )];
        self
    }

    pub fn with_order_date(mut self, date: NaiveDate) -> Self {
        self.order_date = date;
        self
    }

    pub fn with_delivery_date(mut self, date: NaiveDate) -> Self {
        self.delivery_date = Some(date);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn without_customer(mut self) -> Self {
        self.customer_id = None;
        self
    }

    pub fn build(self) -> NewOrder {
        NewOrder {
            customer_id: self.customer_id,
            order_date: self.order_date,
            delivery_date: self.delivery_date,
            notes: self.notes,
            lines: self.lines,
        }
    }
}

/// Builder for full order edits, starting from an order's current state
pub struct OrderEditBuilder {
    edit: OrderEdit,
}

impl OrderEditBuilder {
    /// Starts from the stored order and its lines
    pub fn from_order(order: &Order, lines: &[OrderLine]) -> Self {
        Self {
            edit: OrderEdit::from_order(order, lines),
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.edit.status = status;
        self
    }

    /// Replaces the lines with a single line totalling `total`
    pub fn with_total(mut self, total: Decimal) -> Self {
        self.edit.lines = vec![NewOrderLine::new(
            IdFixtures::product_id(),
            dec!(1),
            Money::new(total, Currency::BRL),
        )];
        self
    }

    pub fn with_lines(mut self, lines: Vec<NewOrderLine>) -> Self {
        self.edit.lines = lines;
        self
    }

    pub fn with_order_date(mut self, date: NaiveDate) -> Self {
        self.edit.order_date = date;
        self
    }

    pub fn with_delivery_date(mut self, date: Option<NaiveDate>) -> Self {
        self.edit.delivery_date = date;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.edit.notes = Some(notes.into());
        self
    }

    pub fn with_customer(mut self, customer_id: Option<CustomerId>) -> Self {
        self.edit.customer_id = customer_id;
        self
    }

    pub fn build(self) -> OrderEdit {
        self.edit
    }
}

/// Builder for ledger entries, mainly for seeding drift
pub struct LedgerEntryBuilder {
    entry: NewLedgerEntry,
}

impl LedgerEntryBuilder {
    /// A revenue entry matching the order's current total and effective date
    pub fn revenue_for(order: &Order) -> Self {
        Self {
            entry: NewLedgerEntry::revenue_for_order(
                order.id,
                "Sales",
                order.total_value,
                order.effective_date(),
                "Seeded revenue",
            ),
        }
    }

    /// A manual expense with no order link
    pub fn manual_expense(amount: Decimal) -> Self {
        Self {
            entry: NewLedgerEntry {
                kind: EntryKind::Expense,
                category: "Supplies".to_string(),
                amount: Money::new(amount, Currency::BRL),
                transaction_date: DateFixtures::order_date(),
                description: "Manual entry".to_string(),
                order_ref: None,
            },
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.entry.amount = Money::new(amount, Currency::BRL);
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.entry.transaction_date = date;
        self
    }

    pub fn with_kind(mut self, kind: EntryKind) -> Self {
        self.entry.kind = kind;
        self
    }

    /// Returns the insertable form
    pub fn build_new(self) -> NewLedgerEntry {
        self.entry
    }

    /// Returns a stored entry with fresh id and timestamps
    pub fn build(self) -> LedgerEntry {
        LedgerEntry::from_new(self.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_order_builder_total() {
        let request = NewOrderBuilder::new().with_total(dec!(100)).build();
        let record = request.into_record(Currency::BRL).unwrap();
        assert_eq!(record.total_value.amount(), dec!(100));
    }

    #[test]
    fn test_edit_builder_keeps_unchanged_fields() {
        let request = NewOrderBuilder::new().with_total(dec!(100)).build();
        let record = request.into_record(Currency::BRL).unwrap();
        let order = Order::from_record(&record);

        let edit = OrderEditBuilder::from_order(&order, &[])
            .with_status(OrderStatus::Delivered)
            .build();
        assert_eq!(edit.order_date, order.order_date);
        assert_eq!(edit.status, OrderStatus::Delivered);
    }
}
