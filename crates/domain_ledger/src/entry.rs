//! Ledger entries
//!
//! A ledger entry records one revenue or expense transaction. Entries
//! derived from sales orders carry an `order_ref` back to the order; those
//! are created, updated and deleted only by the synchronization services.
//! Manually entered entries have no `order_ref`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{LedgerEntryId, Money, OrderId};
use crate::error::LedgerError;

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Money in
    Revenue,
    /// Money out
    Expense,
}

impl EntryKind {
    /// Returns the storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Revenue => "revenue",
            EntryKind::Expense => "expense",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "revenue" => Ok(EntryKind::Revenue),
            "expense" => Ok(EntryKind::Expense),
            other => Err(LedgerError::UnknownKind(other.to_string())),
        }
    }
}

/// A persisted ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier
    pub id: LedgerEntryId,
    /// Revenue or expense
    pub kind: EntryKind,
    /// Free-text classification, e.g. "Sales"
    pub category: String,
    /// Non-negative amount
    pub amount: Money,
    /// Date the transaction is booked on
    pub transaction_date: NaiveDate,
    /// Human-readable reference
    pub description: String,
    /// Originating order, if any
    pub order_ref: Option<OrderId>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Materialises a new entry
    pub fn from_new(entry: NewLedgerEntry) -> Self {
        let now = Utc::now();
        Self {
            id: LedgerEntryId::new_v7(),
            kind: entry.kind,
            category: entry.category,
            amount: entry.amount,
            transaction_date: entry.transaction_date,
            description: entry.description,
            order_ref: entry.order_ref,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if this is a revenue entry linked to `order_id`
    pub fn is_revenue_for(&self, order_id: OrderId) -> bool {
        self.kind == EntryKind::Revenue && self.order_ref == Some(order_id)
    }

    /// Applies an amount/date change
    pub fn apply(&mut self, update: LedgerEntryUpdate) {
        self.amount = update.amount;
        self.transaction_date = update.transaction_date;
        self.updated_at = Utc::now();
    }
}

/// Data needed to insert a ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    pub kind: EntryKind,
    pub category: String,
    pub amount: Money,
    pub transaction_date: NaiveDate,
    pub description: String,
    pub order_ref: Option<OrderId>,
}

impl NewLedgerEntry {
    /// Builds a revenue entry linked to an order
    pub fn revenue_for_order(
        order_id: OrderId,
        category: impl Into<String>,
        amount: Money,
        transaction_date: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind: EntryKind::Revenue,
            category: category.into(),
            amount,
            transaction_date,
            description: description.into(),
            order_ref: Some(order_id),
        }
    }

    /// Checks storage constraints
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.amount.is_negative() {
            return Err(LedgerError::NegativeAmount(self.amount.amount()));
        }
        self.amount.check_storable()?;
        if self.category.trim().is_empty() {
            return Err(LedgerError::EmptyCategory);
        }
        Ok(())
    }
}

/// The fields the synchronization services may change on a linked entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntryUpdate {
    pub amount: Money,
    pub transaction_date: NaiveDate,
}

impl LedgerEntryUpdate {
    /// Checks storage constraints
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.amount.is_negative() {
            return Err(LedgerError::NegativeAmount(self.amount.amount()));
        }
        self.amount.check_storable()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{Currency, MoneyError};
    use rust_decimal_macros::dec;

    fn revenue(order_id: OrderId) -> NewLedgerEntry {
        NewLedgerEntry::revenue_for_order(
            order_id,
            "Sales",
            Money::new(dec!(100), Currency::BRL),
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            "Sales order #0000abcd",
        )
    }

    #[test]
    fn test_revenue_for_order_links_entry() {
        let order_id = OrderId::new();
        let entry = LedgerEntry::from_new(revenue(order_id));
        assert!(entry.is_revenue_for(order_id));
        assert!(!entry.is_revenue_for(OrderId::new()));
    }

    #[test]
    fn test_expense_is_never_revenue_for_order() {
        let order_id = OrderId::new();
        let mut new = revenue(order_id);
        new.kind = EntryKind::Expense;
        assert!(!LedgerEntry::from_new(new).is_revenue_for(order_id));
    }

    #[test]
    fn test_validate_rejects_negative_amount() {
        let mut new = revenue(OrderId::new());
        new.amount = Money::new(dec!(-1), Currency::BRL);
        assert_eq!(new.validate().unwrap_err().field(), "amount");
    }

    #[test]
    fn test_validate_rejects_unstorable_amount() {
        let mut new = revenue(OrderId::new());
        new.amount = Money::new(dec!(1_000_000_000_000_000), Currency::BRL);
        let err = new.validate().unwrap_err();
        assert!(matches!(err, LedgerError::Money(MoneyError::OutOfRange(_))));
        assert_eq!(err.field(), "amount");

        let update = LedgerEntryUpdate {
            amount: new.amount,
            transaction_date: new.transaction_date,
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_category() {
        let mut new = revenue(OrderId::new());
        new.category = "  ".to_string();
        assert_eq!(new.validate(), Err(LedgerError::EmptyCategory));
    }

    #[test]
    fn test_apply_update() {
        let mut entry = LedgerEntry::from_new(revenue(OrderId::new()));
        let date = NaiveDate::from_ymd_opt(2024, 5, 12).unwrap();
        entry.apply(LedgerEntryUpdate {
            amount: Money::new(dec!(150), Currency::BRL),
            transaction_date: date,
        });
        assert_eq!(entry.amount.amount(), dec!(150));
        assert_eq!(entry.transaction_date, date);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("Revenue".parse::<EntryKind>().unwrap(), EntryKind::Revenue);
        assert!(matches!("refund".parse::<EntryKind>(), Err(LedgerError::UnknownKind(_))));
    }
}
