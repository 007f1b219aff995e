//! Order-Ledger Synchronization
//!
//! Keeps each sales order's lifecycle status consistent with the revenue
//! entry derived from it in the ledger.
//!
//! # Invariant
//!
//! After every successful orchestrated operation, for every order:
//!
//! - delivered with a positive total: exactly one revenue entry references
//!   it, with the order's total as amount and its effective date (delivery
//!   date, else order date) as transaction date
//! - not delivered: no revenue entry references it
//! - deleted: no entry of any kind references it
//!
//! # Components
//!
//! - [`SyncEngine`]: pure decision logic
//! - [`OrderMutationService`]: runs status changes, edits and deletions
//!   against the order and ledger ports
//! - [`ConsistencyAuditor`]: read-only drift detection
//! - [`SyncJournalPort`]: durable sync intents replayed after partial failure
//!
//! # Example
//!
//! ```rust,ignore
//! let service = OrderMutationService::new(orders, ledger, journal, events, SyncConfig::default());
//! let outcome = service.change_status(order_id, OrderStatus::Delivered, None).await?;
//! assert!(matches!(outcome.action, SyncAction::Create { .. }));
//! ```

pub mod auditor;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod journal;
pub mod locks;
pub mod orchestrator;

pub use auditor::{AuditReport, ConsistencyAuditor, ConsistencyError, ConsistencyProblem};
pub use config::SyncConfig;
pub use engine::{LedgerActionKind, SyncAction, SyncEngine, SyncInput};
pub use error::{SyncError, SyncStage};
pub use events::{BroadcastPublisher, EventPublisher, OrderChange, OrderChanged};
pub use journal::{InMemorySyncJournal, SyncIntent, SyncJournalPort, SyncOperation};
pub use locks::OrderLocks;
pub use orchestrator::{
    DeletionOutcome, MutationOutcome, OrderMutationService, RecoveryFailure, RecoveryReport,
    ResyncOutcome,
};
