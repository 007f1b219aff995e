//! Mutation Orchestrator
//!
//! Coordinates every mutation that touches both the order and the ledger
//! collections. Each operation runs in a fixed order:
//!
//! 1. Take the per-order lock
//! 2. Read the order (the authoritative previous state)
//! 3. Record a sync intent
//! 4. Write the order side
//! 5. Ask the engine what the ledger needs and apply it
//! 6. Resolve the intent and publish `OrderChanged`
//!
//! A failure before step 4 commits leaves nothing behind. A failure after
//! it returns [`SyncError::PartiallyApplied`] and leaves the intent pending
//! for [`OrderMutationService::recover_pending`]. Nothing is rolled back.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use core_kernel::{
    HealthCheckResult, LedgerEntryId, OperationMetadata, OrderId, PortError, SyncIntentId,
};
use domain_ledger::{LedgerEntryUpdate, LedgerPort, LedgerPortExt, NewLedgerEntry};
use domain_sales::{NewOrder, Order, OrderEdit, OrderLine, OrderPort, OrderPortExt, OrderStatus};

use crate::config::SyncConfig;
use crate::engine::{LedgerActionKind, SyncAction, SyncEngine, SyncInput};
use crate::error::{SyncError, SyncStage};
use crate::events::{EventPublisher, OrderChange, OrderChanged};
use crate::journal::{SyncIntent, SyncJournalPort, SyncOperation};
use crate::locks::OrderLocks;

/// Result of a status change or edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    /// The order as stored after the operation
    pub order: Order,
    /// Status the order had before the operation
    pub previous_status: OrderStatus,
    /// What was done to the ledger
    pub action: SyncAction,
    /// The order's revenue entry after the operation, if any
    pub entry_id: Option<LedgerEntryId>,
}

/// Result of deleting an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionOutcome {
    pub order_id: OrderId,
    pub entries_removed: u64,
    pub lines_removed: u64,
}

/// Result of re-deriving an order's ledger state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ResyncOutcome {
    /// The order exists and its revenue entry now matches it
    Synced {
        order: Order,
        duplicates_removed: u64,
        action: SyncAction,
        entry_id: Option<LedgerEntryId>,
    },
    /// The order no longer exists; its leftovers were removed
    Purged {
        order_id: OrderId,
        entries_removed: u64,
        lines_removed: u64,
    },
}

/// An intent that could not be replayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryFailure {
    pub intent_id: SyncIntentId,
    pub order_id: OrderId,
    pub error: String,
}

/// Summary of a recovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Pending intents found
    pub examined: usize,
    /// Orders whose ledger state was re-derived
    pub resynced: Vec<OrderId>,
    /// Deleted orders whose leftovers were removed
    pub purged: Vec<OrderId>,
    /// Intents left pending
    pub failed: Vec<RecoveryFailure>,
}

/// The mutation orchestrator
pub struct OrderMutationService {
    orders: Arc<dyn OrderPort>,
    ledger: Arc<dyn LedgerPort>,
    journal: Arc<dyn SyncJournalPort>,
    events: Arc<dyn EventPublisher>,
    engine: SyncEngine,
    config: SyncConfig,
    locks: OrderLocks,
}

impl OrderMutationService {
    /// Creates a new service
    pub fn new(
        orders: Arc<dyn OrderPort>,
        ledger: Arc<dyn LedgerPort>,
        journal: Arc<dyn SyncJournalPort>,
        events: Arc<dyn EventPublisher>,
        config: SyncConfig,
    ) -> Self {
        Self {
            orders,
            ledger,
            journal,
            events,
            engine: SyncEngine::new(&config),
            config,
            locks: OrderLocks::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    // ========================================================================
    // Caller-facing operations
    // ========================================================================

    /// Creates an order in `pending`
    ///
    /// No ledger step: a pending order never has revenue.
    #[instrument(skip_all, fields(order_date = %new_order.order_date))]
    pub async fn create_order(
        &self,
        new_order: NewOrder,
        metadata: Option<OperationMetadata>,
    ) -> Result<Order, SyncError> {
        let record = new_order.into_record(self.config.base_currency)?;
        let order = self
            .orders
            .create_order(record, metadata)
            .await
            .map_err(SyncError::at(SyncStage::OrderWrite))?;

        info!(order_id = %order.id, total = %order.total_value, "Order created");
        self.publish(order.id, OrderChange::Created, LedgerActionKind::NoOp);
        Ok(order)
    }

    /// Loads an order with its lines
    pub async fn get_order(
        &self,
        order_id: OrderId,
        metadata: Option<OperationMetadata>,
    ) -> Result<(Order, Vec<OrderLine>), SyncError> {
        self.orders
            .get_order_with_lines(order_id, metadata)
            .await
            .map_err(SyncError::at(SyncStage::OrderRead))
    }

    /// Moves an order to `new_status` and brings its revenue entry in line
    ///
    /// Changing to the current status writes nothing on the order side; the
    /// ledger step still runs and is normally a `NoOp`.
    #[instrument(skip_all, fields(order_id = %order_id, status = %new_status))]
    pub async fn change_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        metadata: Option<OperationMetadata>,
    ) -> Result<MutationOutcome, SyncError> {
        let _guard = self.locks.lock(order_id).await;
        let current = self.read_order(order_id, &metadata).await?;
        let previous_status = current.status;

        if previous_status == new_status {
            let (action, entry_id) = self
                .sync_ledger(&current, previous_status, &metadata)
                .await
                .map_err(|(stage, source)| SyncError::Accessor { stage, source })?;
            self.publish(
                order_id,
                OrderChange::StatusChanged { from: previous_status, to: new_status },
                action.kind(),
            );
            return Ok(MutationOutcome { order: current, previous_status, action, entry_id });
        }

        let intent = self.record_intent(order_id, SyncOperation::ChangeStatus, &metadata).await?;

        let mut fields = current.fields();
        fields.status = new_status;
        let updated = match self
            .orders
            .update_order(order_id, fields, Some(current.version), metadata.clone())
            .await
        {
            Ok(order) => order,
            Err(source) => {
                self.abandon_intent(&intent, &metadata).await;
                return Err(SyncError::Accessor { stage: SyncStage::OrderWrite, source });
            }
        };

        let (action, entry_id) = self
            .sync_ledger(&updated, previous_status, &metadata)
            .await
            .map_err(partially_applied(order_id, intent.id))?;

        self.resolve_intent(&intent, &metadata).await;
        info!(from = %previous_status, action = ?action.kind(), "Order status changed");
        self.publish(
            order_id,
            OrderChange::StatusChanged { from: previous_status, to: new_status },
            action.kind(),
        );

        Ok(MutationOutcome { order: updated, previous_status, action, entry_id })
    }

    /// Replaces every writable field of an order, including its lines
    ///
    /// `previous_status` is what the caller believes the order's status is.
    /// When given and wrong the call fails with
    /// [`SyncError::StalePreviousStatus`] before any write; the stored
    /// status is always what the engine sees.
    #[instrument(skip_all, fields(order_id = %order_id, status = %edit.status))]
    pub async fn update_order(
        &self,
        order_id: OrderId,
        edit: OrderEdit,
        previous_status: Option<OrderStatus>,
        metadata: Option<OperationMetadata>,
    ) -> Result<MutationOutcome, SyncError> {
        let fields = edit.to_fields(self.config.base_currency)?;

        let _guard = self.locks.lock(order_id).await;
        let current = self.read_order(order_id, &metadata).await?;

        if let Some(expected) = previous_status {
            if expected != current.status {
                return Err(SyncError::StalePreviousStatus {
                    order_id,
                    expected,
                    actual: current.status,
                });
            }
        }

        let intent = self.record_intent(order_id, SyncOperation::UpdateOrder, &metadata).await?;

        // Fields and lines land together so the stored total always matches the lines
        let (updated, _) = match self
            .orders
            .update_order_with_lines(
                order_id,
                fields,
                edit.lines,
                Some(current.version),
                metadata.clone(),
            )
            .await
        {
            Ok(stored) => stored,
            Err(source) => {
                self.abandon_intent(&intent, &metadata).await;
                return Err(SyncError::Accessor { stage: SyncStage::OrderWrite, source });
            }
        };

        let (action, entry_id) = self
            .sync_ledger(&updated, current.status, &metadata)
            .await
            .map_err(partially_applied(order_id, intent.id))?;

        self.resolve_intent(&intent, &metadata).await;
        info!(total = %updated.total_value, action = ?action.kind(), "Order updated");
        self.publish(order_id, OrderChange::Edited, action.kind());

        Ok(MutationOutcome {
            order: updated,
            previous_status: current.status,
            action,
            entry_id,
        })
    }

    /// Deletes an order, its ledger entries and its lines, in that order
    ///
    /// Deleting an unknown order fails at the order-read stage.
    #[instrument(skip_all, fields(order_id = %order_id))]
    pub async fn delete_order(
        &self,
        order_id: OrderId,
        metadata: Option<OperationMetadata>,
    ) -> Result<DeletionOutcome, SyncError> {
        let _guard = self.locks.lock(order_id).await;
        self.read_order(order_id, &metadata).await?;

        let intent = self.record_intent(order_id, SyncOperation::DeleteOrder, &metadata).await?;

        let entries_removed = match self
            .ledger
            .delete_all_entries_for_order(order_id, metadata.clone())
            .await
        {
            Ok(count) => count,
            Err(source) => {
                self.abandon_intent(&intent, &metadata).await;
                return Err(SyncError::Accessor { stage: SyncStage::LedgerWrite, source });
            }
        };

        let lines_removed = self
            .orders
            .delete_lines_for_order(order_id, metadata.clone())
            .await
            .map_err(|source| partially_applied(order_id, intent.id)((SyncStage::LineWrite, source)))?;

        self.orders
            .delete_order(order_id, metadata.clone())
            .await
            .map_err(|source| partially_applied(order_id, intent.id)((SyncStage::OrderWrite, source)))?;

        self.resolve_intent(&intent, &metadata).await;
        info!(entries_removed, lines_removed, "Order deleted");
        let ledger_action = if entries_removed > 0 {
            LedgerActionKind::Delete
        } else {
            LedgerActionKind::NoOp
        };
        self.publish(order_id, OrderChange::Deleted, ledger_action);

        Ok(DeletionOutcome { order_id, entries_removed, lines_removed })
    }

    // ========================================================================
    // Self-heal
    // ========================================================================

    /// Re-derives an order's ledger state from the order as stored
    ///
    /// Removes duplicate revenue entries, then applies the engine with the
    /// existing entry standing in for the previous status. If the order no
    /// longer exists, every entry and line referencing it is removed.
    #[instrument(skip_all, fields(order_id = %order_id))]
    pub async fn resync(
        &self,
        order_id: OrderId,
        metadata: Option<OperationMetadata>,
    ) -> Result<ResyncOutcome, SyncError> {
        let _guard = self.locks.lock(order_id).await;
        self.resync_locked(order_id, &metadata).await
    }

    /// Replays every pending sync intent
    #[instrument(skip_all)]
    pub async fn recover_pending(
        &self,
        metadata: Option<OperationMetadata>,
    ) -> Result<RecoveryReport, SyncError> {
        let intents = self
            .journal
            .list_pending(metadata.clone())
            .await
            .map_err(SyncError::at(SyncStage::Journal))?;

        let mut report = RecoveryReport {
            examined: intents.len(),
            ..Default::default()
        };

        for intent in intents {
            let result = {
                let _guard = self.locks.lock(intent.order_id).await;
                self.resync_locked(intent.order_id, &metadata).await
            };

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(intent_id = %intent.id, order_id = %intent.order_id, error = %err, "Sync intent replay failed");
                    report.failed.push(RecoveryFailure {
                        intent_id: intent.id,
                        order_id: intent.order_id,
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            if let Err(err) = self.journal.resolve(intent.id, metadata.clone()).await {
                warn!(intent_id = %intent.id, error = %err, "Failed to resolve replayed sync intent");
                report.failed.push(RecoveryFailure {
                    intent_id: intent.id,
                    order_id: intent.order_id,
                    error: err.to_string(),
                });
                continue;
            }

            match outcome {
                ResyncOutcome::Synced { order, .. } => report.resynced.push(order.id),
                ResyncOutcome::Purged { order_id, .. } => report.purged.push(order_id),
            }
        }

        info!(
            examined = report.examined,
            resynced = report.resynced.len(),
            purged = report.purged.len(),
            failed = report.failed.len(),
            "Sync recovery finished"
        );
        Ok(report)
    }

    /// Health of every port the service depends on
    pub async fn health(&self) -> Vec<HealthCheckResult> {
        vec![
            self.orders.health_check().await,
            self.ledger.health_check().await,
            self.journal.health_check().await,
        ]
    }

    // ========================================================================
    // Steps
    // ========================================================================

    async fn read_order(
        &self,
        order_id: OrderId,
        metadata: &Option<OperationMetadata>,
    ) -> Result<Order, SyncError> {
        self.orders
            .get_order(order_id, metadata.clone())
            .await
            .map_err(SyncError::at(SyncStage::OrderRead))
    }

    async fn record_intent(
        &self,
        order_id: OrderId,
        operation: SyncOperation,
        metadata: &Option<OperationMetadata>,
    ) -> Result<SyncIntent, SyncError> {
        self.journal
            .record(order_id, operation, metadata.clone())
            .await
            .map_err(SyncError::at(SyncStage::Journal))
    }

    async fn resolve_intent(&self, intent: &SyncIntent, metadata: &Option<OperationMetadata>) {
        // Both writes are committed; a pending intent only costs a redundant replay
        if let Err(err) = self.journal.resolve(intent.id, metadata.clone()).await {
            warn!(intent_id = %intent.id, error = %err, "Failed to resolve sync intent");
        }
    }

    async fn abandon_intent(&self, intent: &SyncIntent, metadata: &Option<OperationMetadata>) {
        // Nothing was written, so the intent has nothing left to replay
        if let Err(err) = self.journal.resolve(intent.id, metadata.clone()).await {
            warn!(intent_id = %intent.id, error = %err, "Failed to resolve abandoned sync intent");
        }
    }

    /// Runs the engine for `order` and applies its decision
    async fn sync_ledger(
        &self,
        order: &Order,
        previous_status: OrderStatus,
        metadata: &Option<OperationMetadata>,
    ) -> Result<(SyncAction, Option<LedgerEntryId>), (SyncStage, PortError)> {
        let existing = self
            .ledger
            .find_revenue_entry_by_order(order.id, metadata.clone())
            .await
            .map_err(|e| (SyncStage::LedgerRead, e))?;

        // A revenue entry on an undelivered order is left over from a failed
        // cancellation and must be removed, whatever the stored status was
        let previous_status = if existing.is_some() && !order.status.is_delivered() {
            OrderStatus::Delivered
        } else {
            previous_status
        };

        let action = self.engine.decide(SyncInput {
            order_id: order.id,
            previous_status,
            new_status: order.status,
            total_value: order.total_value,
            effective_date: order.effective_date(),
            existing_entry: existing.as_ref(),
        });
        debug!(?action, "Engine decision");

        let entry_id = self
            .apply_action(order.id, &action, existing.map(|e| e.id), metadata)
            .await
            .map_err(|e| (SyncStage::LedgerWrite, e))?;
        Ok((action, entry_id))
    }

    async fn apply_action(
        &self,
        order_id: OrderId,
        action: &SyncAction,
        existing: Option<LedgerEntryId>,
        metadata: &Option<OperationMetadata>,
    ) -> Result<Option<LedgerEntryId>, PortError> {
        match action {
            SyncAction::NoOp => Ok(existing),
            SyncAction::Create { amount, date, description } => {
                let entry = NewLedgerEntry::revenue_for_order(
                    order_id,
                    self.engine.revenue_category(),
                    *amount,
                    *date,
                    description.clone(),
                );
                self.ledger.insert_entry(entry, metadata.clone()).await.map(Some)
            }
            SyncAction::Update { entry_id, amount, date } => {
                let update = LedgerEntryUpdate { amount: *amount, transaction_date: *date };
                self.ledger.update_entry(*entry_id, update, metadata.clone()).await?;
                Ok(Some(*entry_id))
            }
            SyncAction::Delete { entry_id } => {
                self.ledger.delete_entry(*entry_id, metadata.clone()).await?;
                Ok(None)
            }
        }
    }

    async fn resync_locked(
        &self,
        order_id: OrderId,
        metadata: &Option<OperationMetadata>,
    ) -> Result<ResyncOutcome, SyncError> {
        let order = match self.orders.get_order(order_id, metadata.clone()).await {
            Ok(order) => order,
            Err(err) if err.is_not_found() => return self.purge_leftovers(order_id, metadata).await,
            Err(err) => return Err(SyncError::Accessor { stage: SyncStage::OrderRead, source: err }),
        };

        let revenue = self
            .ledger
            .revenue_entries_for_order(order_id, metadata.clone())
            .await
            .map_err(SyncError::at(SyncStage::LedgerRead))?;

        let mut duplicates_removed = 0;
        for duplicate in revenue.iter().skip(1) {
            self.ledger
                .delete_entry(duplicate.id, metadata.clone())
                .await
                .map_err(SyncError::at(SyncStage::LedgerWrite))?;
            duplicates_removed += 1;
        }

        let existing = revenue.first();
        // The derived-entry state stands in for the previous status
        let previous_status = if existing.is_some() {
            OrderStatus::Delivered
        } else {
            OrderStatus::Pending
        };

        let action = self.engine.decide(SyncInput {
            order_id,
            previous_status,
            new_status: order.status,
            total_value: order.total_value,
            effective_date: order.effective_date(),
            existing_entry: existing,
        });
        let entry_id = self
            .apply_action(order_id, &action, existing.map(|e| e.id), metadata)
            .await
            .map_err(SyncError::at(SyncStage::LedgerWrite))?;

        if duplicates_removed > 0 || !action.is_noop() {
            warn!(duplicates_removed, action = ?action.kind(), "Repaired ledger drift");
        }
        let ledger_action = if action.is_noop() && duplicates_removed > 0 {
            LedgerActionKind::Delete
        } else {
            action.kind()
        };
        self.publish(order_id, OrderChange::Resynced, ledger_action);

        Ok(ResyncOutcome::Synced { order, duplicates_removed, action, entry_id })
    }

    async fn purge_leftovers(
        &self,
        order_id: OrderId,
        metadata: &Option<OperationMetadata>,
    ) -> Result<ResyncOutcome, SyncError> {
        let entries_removed = self
            .ledger
            .delete_all_entries_for_order(order_id, metadata.clone())
            .await
            .map_err(SyncError::at(SyncStage::LedgerWrite))?;
        let lines_removed = self
            .orders
            .delete_lines_for_order(order_id, metadata.clone())
            .await
            .map_err(SyncError::at(SyncStage::LineWrite))?;

        if entries_removed > 0 || lines_removed > 0 {
            warn!(entries_removed, lines_removed, "Purged leftovers of a deleted order");
            let ledger_action = if entries_removed > 0 {
                LedgerActionKind::Delete
            } else {
                LedgerActionKind::NoOp
            };
            self.publish(order_id, OrderChange::Deleted, ledger_action);
        }
        Ok(ResyncOutcome::Purged { order_id, entries_removed, lines_removed })
    }

    fn publish(&self, order_id: OrderId, change: OrderChange, ledger_action: LedgerActionKind) {
        self.events.publish(OrderChanged::new(order_id, change, ledger_action));
    }
}

fn partially_applied(
    order_id: OrderId,
    intent_id: SyncIntentId,
) -> impl FnOnce((SyncStage, PortError)) -> SyncError {
    move |(stage, source)| {
        warn!(%order_id, %stage, %intent_id, error = %source, "Order mutation partially applied");
        SyncError::PartiallyApplied { order_id, stage, intent_id, source }
    }
}
