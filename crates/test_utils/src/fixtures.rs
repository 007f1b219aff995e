//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data. Values are fixed so unit tests stay
//! predictable; only free text is randomised.

use chrono::NaiveDate;
use core_kernel::{Currency, CustomerId, Money, ProductId};
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Creates a BRL amount
    pub fn brl(amount: Decimal) -> Money {
        Money::new(amount, Currency::BRL)
    }

    /// The order total used by the walkthrough scenarios
    pub fn brl_100() -> Money {
        Money::new(dec!(100.00), Currency::BRL)
    }

    /// The edited order total used by the walkthrough scenarios
    pub fn brl_150() -> Money {
        Money::new(dec!(150.00), Currency::BRL)
    }

    /// Creates a zero amount
    pub fn brl_zero() -> Money {
        Money::zero(Currency::BRL)
    }

    /// Creates a USD amount for currency mismatch tests
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }
}

/// Fixture for calendar dates
pub struct DateFixtures;

impl DateFixtures {
    /// Standard order date
    pub fn order_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    /// Standard delivery date, three days after the order date
    pub fn delivery_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 13).unwrap()
    }

    /// A date before the standard order date
    pub fn before_order() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }
}

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    pub fn customer_id() -> CustomerId {
        CustomerId::new_v7()
    }

    pub fn product_id() -> ProductId {
        ProductId::new_v7()
    }
}

/// Fixture for free text
pub struct StringFixtures;

impl StringFixtures {
    /// A random short sentence for order notes
    pub fn notes() -> String {
        Sentence(3..8).fake()
    }
}
