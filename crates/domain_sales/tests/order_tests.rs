//! Tests for the sales order model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{Currency, CustomerId, Money, ProductId};
use domain_sales::{
    compute_total, NewOrderLine, NewOrderRecord, Order, OrderStatus, SalesError,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn brl(amount: Decimal) -> Money {
    Money::new(amount, Currency::BRL)
}

fn record(lines: Vec<NewOrderLine>) -> NewOrderRecord {
    let total = compute_total(Currency::BRL, &lines).unwrap();
    NewOrderRecord {
        customer_id: Some(CustomerId::new()),
        order_date: date(2024, 6, 1),
        delivery_date: None,
        notes: None,
        total_value: total,
        lines,
    }
}

// ============================================================================
// Status Tests
// ============================================================================

mod status_tests {
    use super::*;

    #[test]
    fn test_only_delivered_recognises_revenue() {
        assert!(OrderStatus::Delivered.is_delivered());
        assert!(!OrderStatus::Pending.is_delivered());
        assert!(!OrderStatus::Processing.is_delivered());
        assert!(!OrderStatus::Cancelled.is_delivered());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Delivered).unwrap();
        assert_eq!(json, "\"delivered\"");

        let parsed: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, OrderStatus::Cancelled);
    }

    #[test]
    fn test_status_parse_accepts_american_spelling() {
        assert_eq!("Canceled".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_unknown_status_reports_field() {
        let err = "shipped".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err, SalesError::UnknownStatus("shipped".to_string()));
        assert_eq!(err.field(), "status");
    }
}

// ============================================================================
// Line and Total Tests
// ============================================================================

mod total_tests {
    use super::*;

    #[test]
    fn test_empty_order_totals_zero() {
        let total = compute_total(Currency::BRL, &[]).unwrap();
        assert!(total.is_zero());
    }

    #[test]
    fn test_fractional_quantity() {
        let lines = vec![NewOrderLine::new(ProductId::new(), dec!(2.5), brl(dec!(8.00)))];
        assert_eq!(compute_total(Currency::BRL, &lines).unwrap().amount(), dec!(20.00));
    }

    #[test]
    fn test_free_line_is_allowed() {
        let lines = vec![NewOrderLine::new(ProductId::new(), dec!(1), brl(dec!(0)))];
        assert!(compute_total(Currency::BRL, &lines).unwrap().is_zero());
    }

    #[test]
    fn test_negative_unit_price_rejected() {
        let lines = vec![NewOrderLine::new(ProductId::new(), dec!(1), brl(dec!(-5)))];
        let err = compute_total(Currency::BRL, &lines).unwrap_err();
        assert!(matches!(err, SalesError::NegativeUnitPrice { line: 0, .. }));
        assert_eq!(err.field(), "lines[0].unit_price");
    }

    #[test]
    fn test_foreign_currency_line_rejected() {
        let lines = vec![NewOrderLine::new(
            ProductId::new(),
            dec!(1),
            Money::new(dec!(5), Currency::USD),
        )];
        let err = compute_total(Currency::BRL, &lines).unwrap_err();
        assert!(matches!(err, SalesError::LineCurrencyMismatch { .. }));
    }

    #[test]
    fn test_into_line_keeps_subtotal() {
        let order = Order::from_record(&record(vec![]));
        let line = NewOrderLine::new(ProductId::new(), dec!(3), brl(dec!(1.10)))
            .into_line(order.id)
            .unwrap();
        assert_eq!(line.order_id, order.id);
        assert_eq!(line.subtotal.amount(), dec!(3.30));
    }
}

// ============================================================================
// Order Tests
// ============================================================================

mod order_tests {
    use super::*;

    #[test]
    fn test_new_order_is_pending_version_one() {
        let rec = record(vec![NewOrderLine::new(ProductId::new(), dec!(2), brl(dec!(50)))]);
        let order = Order::from_record(&rec);

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.version, 1);
        assert_eq!(order.total_value.amount(), dec!(100));
        assert_eq!(order.created_at, order.updated_at);
    }

    #[test]
    fn test_apply_overwrites_fields_and_bumps_version() {
        let mut order = Order::from_record(&record(vec![]));
        let mut fields = order.fields();
        fields.status = OrderStatus::Delivered;
        fields.delivery_date = Some(date(2024, 6, 3));

        order.apply(fields);

        assert_eq!(order.version, 2);
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.effective_date(), date(2024, 6, 3));
    }

    #[test]
    fn test_delivery_before_order_rejected() {
        let order = Order::from_record(&record(vec![]));
        let mut fields = order.fields();
        fields.delivery_date = Some(date(2024, 5, 31));

        let err = fields.validate().unwrap_err();
        assert_eq!(err.field(), "delivery_date");
    }

    #[test]
    fn test_same_day_delivery_is_valid() {
        let order = Order::from_record(&record(vec![]));
        let mut fields = order.fields();
        fields.delivery_date = Some(order.order_date);
        assert!(fields.validate().is_ok());
    }

    #[test]
    fn test_negative_total_rejected() {
        let order = Order::from_record(&record(vec![]));
        let mut fields = order.fields();
        fields.total_value = brl(dec!(-1));
        assert!(matches!(fields.validate(), Err(SalesError::NegativeTotal(_))));
    }
}

// ============================================================================
// Request Tests
// ============================================================================

mod request_tests {
    use super::*;
    use domain_sales::{NewOrder, OrderEdit};

    #[test]
    fn test_new_order_computes_total() {
        let request = NewOrder {
            customer_id: None,
            order_date: date(2024, 6, 1),
            delivery_date: None,
            notes: Some("Lettuce".to_string()),
            lines: vec![
                NewOrderLine::new(ProductId::new(), dec!(10), brl(dec!(3.50))),
                NewOrderLine::new(ProductId::new(), dec!(2), brl(dec!(40))),
            ],
        };
        let record = request.into_record(Currency::BRL).unwrap();
        assert_eq!(record.total_value.amount(), dec!(115.00));
        assert_eq!(record.fields().status, OrderStatus::Pending);
    }

    #[test]
    fn test_new_order_rejects_early_delivery() {
        let request = NewOrder {
            customer_id: None,
            order_date: date(2024, 6, 1),
            delivery_date: Some(date(2024, 5, 1)),
            notes: None,
            lines: vec![],
        };
        let err = request.into_record(Currency::BRL).unwrap_err();
        assert!(matches!(err, SalesError::DeliveryBeforeOrder { .. }));
    }

    #[test]
    fn test_edit_from_order_round_trips_fields() {
        let rec = record(vec![NewOrderLine::new(ProductId::new(), dec!(4), brl(dec!(25)))]);
        let order = Order::from_record(&rec);
        let lines: Vec<_> = rec.lines.iter().cloned().map(|l| l.into_line(order.id).unwrap()).collect();

        let edit = OrderEdit::from_order(&order, &lines);
        let fields = edit.to_fields(Currency::BRL).unwrap();
        assert_eq!(fields, order.fields());
    }

    #[test]
    fn test_edit_recomputes_total_from_lines() {
        let order = Order::from_record(&record(vec![]));
        let mut edit = OrderEdit::from_order(&order, &[]);
        edit.lines.push(NewOrderLine::new(ProductId::new(), dec!(3), brl(dec!(50))));

        let fields = edit.to_fields(Currency::BRL).unwrap();
        assert_eq!(fields.total_value.amount(), dec!(150));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn line_strategy() -> impl Strategy<Value = NewOrderLine> {
        (1i64..1_000i64, 0i64..100_000i64).prop_map(|(qty, cents)| {
            NewOrderLine::new(
                ProductId::new(),
                Decimal::new(qty, 0),
                Money::from_minor(cents, Currency::BRL),
            )
        })
    }

    proptest! {
        #[test]
        fn total_equals_sum_of_subtotals(lines in prop::collection::vec(line_strategy(), 0..10)) {
            let total = compute_total(Currency::BRL, &lines).unwrap();
            let expected: Decimal = lines.iter().map(|l| l.subtotal().unwrap().amount()).sum();
            prop_assert_eq!(total.amount(), expected);
            prop_assert!(!total.is_negative());
        }

        #[test]
        fn total_is_independent_of_line_order(lines in prop::collection::vec(line_strategy(), 0..10)) {
            let forward = compute_total(Currency::BRL, &lines).unwrap();
            let mut reversed = lines.clone();
            reversed.reverse();
            let backward = compute_total(Currency::BRL, &reversed).unwrap();
            prop_assert_eq!(forward, backward);
        }
    }
}
