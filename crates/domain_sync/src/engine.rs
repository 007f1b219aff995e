//! Synchronization Engine
//!
//! Pure decision logic: given an order's previous and new state and the
//! revenue entry currently linked to it, decide which single ledger
//! operation brings the ledger back in line with the order.
//!
//! # Decision Table
//!
//! Evaluated in priority order:
//!
//! | # | Condition | Action |
//! |---|-----------|--------|
//! | 1 | becomes delivered, no entry, total > 0 | `Create` |
//! | 2 | leaves delivered, entry present | `Delete` |
//! | 3 | delivered, entry present, amount or date differs | `Update` |
//! | 3b | stays delivered, no entry, total > 0 | `Create` |
//! | 4 | anything else | `NoOp` |
//!
//! Row 3b covers an edit that raises a delivered order's total from zero;
//! without it such an order would stay delivered with no revenue.
//!
//! The engine never touches storage.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{LedgerEntryId, Money, OrderId};
use domain_ledger::LedgerEntry;
use domain_sales::OrderStatus;

use crate::config::SyncConfig;

/// Everything the engine looks at for one decision
#[derive(Debug, Clone, Copy)]
pub struct SyncInput<'a> {
    pub order_id: OrderId,
    pub previous_status: OrderStatus,
    pub new_status: OrderStatus,
    pub total_value: Money,
    /// Delivery date if set, else order date
    pub effective_date: NaiveDate,
    pub existing_entry: Option<&'a LedgerEntry>,
}

/// The ledger operation an order change requires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SyncAction {
    /// The ledger already agrees with the order
    NoOp,
    /// Insert a revenue entry linked to the order
    Create {
        amount: Money,
        date: NaiveDate,
        description: String,
    },
    /// Change the amount and date of the linked entry
    Update {
        entry_id: LedgerEntryId,
        amount: Money,
        date: NaiveDate,
    },
    /// Remove the linked entry
    Delete { entry_id: LedgerEntryId },
}

impl SyncAction {
    /// Returns the action's kind without its payload
    pub fn kind(&self) -> LedgerActionKind {
        match self {
            SyncAction::NoOp => LedgerActionKind::NoOp,
            SyncAction::Create { .. } => LedgerActionKind::Create,
            SyncAction::Update { .. } => LedgerActionKind::Update,
            SyncAction::Delete { .. } => LedgerActionKind::Delete,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, SyncAction::NoOp)
    }
}

/// Payload-free form of [`SyncAction`], used in events and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerActionKind {
    NoOp,
    Create,
    Update,
    Delete,
}

/// The synchronization engine
#[derive(Debug, Clone)]
pub struct SyncEngine {
    revenue_category: String,
    description_prefix: String,
}

impl SyncEngine {
    /// Creates an engine using the configured category and description prefix
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            revenue_category: config.revenue_category.clone(),
            description_prefix: config.description_prefix.clone(),
        }
    }

    /// Category written on derived revenue entries
    pub fn revenue_category(&self) -> &str {
        &self.revenue_category
    }

    /// Description written on an order's revenue entry
    pub fn describe(&self, order_id: OrderId) -> String {
        format!("{} #{}", self.description_prefix, order_id.short_suffix(8))
    }

    /// Decides the ledger operation for an order change
    pub fn decide(&self, input: SyncInput<'_>) -> SyncAction {
        let was_delivered = input.previous_status.is_delivered();
        let is_delivered = input.new_status.is_delivered();

        match input.existing_entry {
            // Rules 1 and 3b
            None if is_delivered && input.total_value.is_positive() => SyncAction::Create {
                amount: input.total_value,
                date: input.effective_date,
                description: self.describe(input.order_id),
            },
            // Rule 2
            Some(entry) if was_delivered && !is_delivered => SyncAction::Delete { entry_id: entry.id },
            // Rule 3
            Some(entry)
                if is_delivered
                    && (entry.amount != input.total_value
                        || entry.transaction_date != input.effective_date) =>
            {
                SyncAction::Update {
                    entry_id: entry.id,
                    amount: input.total_value,
                    date: input.effective_date,
                }
            }
            _ => SyncAction::NoOp,
        }
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(&SyncConfig::default())
    }
}
