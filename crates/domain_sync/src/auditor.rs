//! Consistency Auditor
//!
//! Read-only diagnostics comparing an order with the ledger entries that
//! reference it. The auditor never writes; repairing drift is the job of
//! `OrderMutationService::resync`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use core_kernel::{Money, OperationMetadata, OrderId};
use domain_ledger::{LedgerEntry, LedgerPort, LedgerPortExt};
use domain_sales::{Order, OrderPort, OrderQuery, OrderStatus};

use crate::error::{SyncError, SyncStage};

/// A detected violation of the order/ledger invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ConsistencyProblem {
    /// Delivered with a positive total but no revenue entry
    DeliveredWithoutRevenue,
    /// A revenue entry exists but the order is not delivered
    RevenueWithoutDelivery,
    /// The revenue entry's amount differs from the order total
    AmountMismatch { expected: Money, actual: Money },
    /// More than one revenue entry references the order
    DuplicateRevenue { count: usize },
    /// The revenue entry's date differs from the order's effective date
    DateMismatch { expected: NaiveDate, actual: NaiveDate },
}

impl ConsistencyProblem {
    /// Stable problem code
    pub fn code(&self) -> &'static str {
        match self {
            ConsistencyProblem::DeliveredWithoutRevenue => "delivered_without_revenue",
            ConsistencyProblem::RevenueWithoutDelivery => "revenue_without_delivery",
            ConsistencyProblem::AmountMismatch { .. } => "amount_mismatch",
            ConsistencyProblem::DuplicateRevenue { .. } => "duplicate_revenue",
            ConsistencyProblem::DateMismatch { .. } => "date_mismatch",
        }
    }
}

/// The result of auditing one order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub consistent: bool,
    pub problems: Vec<ConsistencyProblem>,
    /// Number of revenue entries found for the order
    pub revenue_entries: usize,
    pub audited_at: DateTime<Utc>,
}

impl AuditReport {
    /// Converts a report with findings into a [`ConsistencyError`]
    pub fn into_result(self) -> Result<AuditReport, ConsistencyError> {
        if self.consistent {
            Ok(self)
        } else {
            Err(ConsistencyError {
                order_id: self.order_id,
                problems: self.problems,
            })
        }
    }
}

/// Drift found by the auditor
///
/// This is a finding, not a fault: nothing failed while producing it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Order {order_id} is out of sync with the ledger: {}", codes(.problems))]
pub struct ConsistencyError {
    pub order_id: OrderId,
    pub problems: Vec<ConsistencyProblem>,
}

fn codes(problems: &[ConsistencyProblem]) -> String {
    problems.iter().map(ConsistencyProblem::code).collect::<Vec<_>>().join(", ")
}

/// Compares an order with its revenue entries
///
/// `revenue` must hold only revenue entries linked to the order, oldest
/// first. Amount and date checks look at the oldest entry.
pub fn evaluate(order: &Order, revenue: &[LedgerEntry]) -> Vec<ConsistencyProblem> {
    let mut problems = Vec::new();

    if order.status.is_delivered() {
        if revenue.is_empty() && order.total_value.is_positive() {
            problems.push(ConsistencyProblem::DeliveredWithoutRevenue);
        }
    } else if !revenue.is_empty() {
        problems.push(ConsistencyProblem::RevenueWithoutDelivery);
    }

    if revenue.len() > 1 {
        problems.push(ConsistencyProblem::DuplicateRevenue { count: revenue.len() });
    }

    if let Some(entry) = revenue.first() {
        if entry.amount != order.total_value {
            problems.push(ConsistencyProblem::AmountMismatch {
                expected: order.total_value,
                actual: entry.amount,
            });
        }
        if order.status.is_delivered() && entry.transaction_date != order.effective_date() {
            problems.push(ConsistencyProblem::DateMismatch {
                expected: order.effective_date(),
                actual: entry.transaction_date,
            });
        }
    }

    problems
}

/// The consistency auditor
pub struct ConsistencyAuditor {
    orders: Arc<dyn OrderPort>,
    ledger: Arc<dyn LedgerPort>,
}

impl ConsistencyAuditor {
    pub fn new(orders: Arc<dyn OrderPort>, ledger: Arc<dyn LedgerPort>) -> Self {
        Self { orders, ledger }
    }

    /// Audits one order
    ///
    /// # Errors
    ///
    /// An accessor failure, including `NotFound` for an unknown order.
    #[instrument(skip(self, metadata), fields(order_id = %order_id))]
    pub async fn audit(
        &self,
        order_id: OrderId,
        metadata: Option<OperationMetadata>,
    ) -> Result<AuditReport, SyncError> {
        let order = self
            .orders
            .get_order(order_id, metadata.clone())
            .await
            .map_err(SyncError::at(SyncStage::OrderRead))?;
        self.audit_order(&order, metadata).await
    }

    /// Audits a page of orders, returning only the inconsistent ones
    #[instrument(skip(self, metadata))]
    pub async fn sweep(
        &self,
        query: OrderQuery,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<AuditReport>, SyncError> {
        let orders = self
            .orders
            .list_orders(query, metadata.clone())
            .await
            .map_err(SyncError::at(SyncStage::OrderRead))?;

        let mut drifted = Vec::new();
        for order in &orders {
            let report = self.audit_order(order, metadata.clone()).await?;
            if !report.consistent {
                drifted.push(report);
            }
        }

        info!(audited = orders.len(), drifted = drifted.len(), "Consistency sweep finished");
        Ok(drifted)
    }

    async fn audit_order(
        &self,
        order: &Order,
        metadata: Option<OperationMetadata>,
    ) -> Result<AuditReport, SyncError> {
        let revenue = self
            .ledger
            .revenue_entries_for_order(order.id, metadata)
            .await
            .map_err(SyncError::at(SyncStage::LedgerRead))?;

        let problems = evaluate(order, &revenue);
        if !problems.is_empty() {
            warn!(order_id = %order.id, problems = %codes(&problems), "Order has drifted from the ledger");
        }

        Ok(AuditReport {
            order_id: order.id,
            status: order.status,
            consistent: problems.is_empty(),
            problems,
            revenue_entries: revenue.len(),
            audited_at: Utc::now(),
        })
    }
}
