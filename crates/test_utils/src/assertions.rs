//! Custom Test Assertions
//!
//! Provides assertion helpers for the order/ledger invariant that give
//! more meaningful error messages than standard assertions.

use core_kernel::{Money, OrderId};
use domain_ledger::{LedgerEntry, LedgerPortExt, MockLedgerPort};
use domain_sales::Order;

/// Asserts two Money values are equal in amount and currency
pub fn assert_money_eq(actual: &Money, expected: &Money) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );
    assert_eq!(
        actual.amount(),
        expected.amount(),
        "Amount mismatch: actual={}, expected={}",
        actual,
        expected
    );
}

/// Asserts the order has exactly one revenue entry matching its total and
/// effective date, and returns it
pub async fn assert_single_revenue_entry(ledger: &MockLedgerPort, order: &Order) -> LedgerEntry {
    let revenue = ledger
        .revenue_entries_for_order(order.id, None)
        .await
        .expect("ledger read failed");
    assert_eq!(
        revenue.len(),
        1,
        "Expected exactly one revenue entry for {}, found {}",
        order.id,
        revenue.len()
    );

    let entry = revenue.into_iter().next().expect("checked above");
    assert_money_eq(&entry.amount, &order.total_value);
    assert_eq!(
        entry.transaction_date,
        order.effective_date(),
        "Revenue entry date does not match the order's effective date"
    );
    entry
}

/// Asserts the order has no revenue entry
pub async fn assert_no_revenue_entry(ledger: &MockLedgerPort, order_id: OrderId) {
    let revenue = ledger
        .revenue_entries_for_order(order_id, None)
        .await
        .expect("ledger read failed");
    assert!(
        revenue.is_empty(),
        "Expected no revenue entry for {}, found {}",
        order_id,
        revenue.len()
    );
}

/// Asserts nothing in the ledger references the order
pub async fn assert_no_entries_for(ledger: &MockLedgerPort, order_id: OrderId) {
    let leftovers: Vec<LedgerEntry> = ledger
        .all_entries()
        .await
        .into_iter()
        .filter(|e| e.order_ref == Some(order_id))
        .collect();
    assert!(
        leftovers.is_empty(),
        "Expected no ledger entries referencing {}, found {}",
        order_id,
        leftovers.len()
    );
}
