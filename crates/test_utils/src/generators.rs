//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random order data and
//! sequences of order mutations.

use core_kernel::{Currency, Money, ProductId};
use domain_sales::{NewOrderLine, OrderStatus};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for generating any order status
pub fn status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Pending),
        Just(OrderStatus::Processing),
        Just(OrderStatus::Delivered),
        Just(OrderStatus::Cancelled),
    ]
}

/// Strategy for generating non-negative BRL amounts in minor units
///
/// Zero is weighted up so the zero-total edge case shows up often.
pub fn total_minor_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![
        1 => Just(0i64),
        4 => 1i64..10_000_000i64,
    ]
}

/// Strategy for generating a valid BRL order line
pub fn line_strategy() -> impl Strategy<Value = NewOrderLine> {
    (1i64..50i64, 0i64..500_000i64).prop_map(|(quantity, price_minor)| {
        NewOrderLine::new(
            ProductId::new(),
            Decimal::new(quantity, 0),
            Money::from_minor(price_minor, Currency::BRL),
        )
    })
}

/// Strategy for generating zero to five valid lines
pub fn lines_strategy() -> impl Strategy<Value = Vec<NewOrderLine>> {
    prop::collection::vec(line_strategy(), 0..5)
}

/// One step applied to an order by a property test
#[derive(Debug, Clone)]
pub enum OrderMutation {
    /// `change_status` to the given status
    ChangeStatus(OrderStatus),
    /// `update_order` with a full edit
    Edit {
        status: OrderStatus,
        total_minor: i64,
        /// Delivery date offset from the order date, in days
        delivery_offset_days: Option<u32>,
        touch_notes: bool,
    },
    /// `resync`, which must be a no-op on a consistent order
    Resync,
}

/// Strategy for generating a single mutation
pub fn mutation_strategy() -> impl Strategy<Value = OrderMutation> {
    prop_oneof![
        3 => status_strategy().prop_map(OrderMutation::ChangeStatus),
        3 => (
            status_strategy(),
            total_minor_strategy(),
            prop::option::of(0u32..30u32),
            any::<bool>(),
        )
            .prop_map(|(status, total_minor, delivery_offset_days, touch_notes)| {
                OrderMutation::Edit { status, total_minor, delivery_offset_days, touch_notes }
            }),
        1 => Just(OrderMutation::Resync),
    ]
}

/// Strategy for generating a sequence of one to twenty mutations
pub fn mutation_sequence_strategy() -> impl Strategy<Value = Vec<OrderMutation>> {
    prop::collection::vec(mutation_strategy(), 1..20)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_generated_lines_are_valid() {
        let mut runner = TestRunner::default();
        for _ in 0..50 {
            let lines = lines_strategy().new_tree(&mut runner).unwrap().current();
            for (i, line) in lines.iter().enumerate() {
                assert!(line.validate(i, Currency::BRL).is_ok());
            }
        }
    }
}
