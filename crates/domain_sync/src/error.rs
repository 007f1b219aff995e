//! Synchronization errors

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use core_kernel::{OrderId, PortError, SyncIntentId};
use domain_sales::{OrderStatus, SalesError};

/// The step of an orchestrated operation at which an accessor call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    OrderRead,
    OrderWrite,
    LineWrite,
    LedgerRead,
    LedgerWrite,
    Journal,
}

impl SyncStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStage::OrderRead => "order_read",
            SyncStage::OrderWrite => "order_write",
            SyncStage::LineWrite => "line_write",
            SyncStage::LedgerRead => "ledger_read",
            SyncStage::LedgerWrite => "ledger_write",
            SyncStage::Journal => "journal",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the synchronization services
#[derive(Debug, Error)]
pub enum SyncError {
    /// Caller-supplied fields are structurally invalid; nothing was written
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    /// An accessor call failed before anything was written, or the failed
    /// step left both collections consistent
    #[error("Accessor failed at {stage}: {source}")]
    Accessor {
        stage: SyncStage,
        #[source]
        source: PortError,
    },

    /// The order write committed but a later step failed
    ///
    /// The sync intent stays pending so a recovery pass can finish the job.
    #[error("Order {order_id} partially applied, failed at {stage} (intent {intent_id}): {source}")]
    PartiallyApplied {
        order_id: OrderId,
        stage: SyncStage,
        intent_id: SyncIntentId,
        #[source]
        source: PortError,
    },

    /// The caller's view of the order's status is out of date
    #[error("Order {order_id} is {actual}, caller expected {expected}")]
    StalePreviousStatus {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },
}

impl SyncError {
    /// Creates a Validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns a closure wrapping a port error as an Accessor error at `stage`
    pub fn at(stage: SyncStage) -> impl FnOnce(PortError) -> SyncError {
        move |source| SyncError::Accessor { stage, source }
    }

    /// The stage an accessor failure happened at, if any
    pub fn stage(&self) -> Option<SyncStage> {
        match self {
            SyncError::Accessor { stage, .. } | SyncError::PartiallyApplied { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }

    /// Returns the underlying port error, if any
    pub fn port_error(&self) -> Option<&PortError> {
        match self {
            SyncError::Accessor { source, .. } | SyncError::PartiallyApplied { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }

    /// Returns true if the order (or a linked record) does not exist
    pub fn is_not_found(&self) -> bool {
        self.port_error().is_some_and(PortError::is_not_found)
    }

    /// Returns true if the call lost a race with another writer
    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncError::StalePreviousStatus { .. })
            || self.port_error().is_some_and(PortError::is_conflict)
    }

    /// Returns true if some writes committed before the failure
    pub fn is_partially_applied(&self) -> bool {
        matches!(self, SyncError::PartiallyApplied { .. })
    }
}

impl From<SalesError> for SyncError {
    fn from(err: SalesError) -> Self {
        SyncError::Validation {
            field: err.field(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sales_error_becomes_validation() {
        let err: SyncError = SalesError::InvalidQuantity { line: 2, quantity: dec!(0) }.into();
        match err {
            SyncError::Validation { field, .. } => assert_eq!(field, "lines[2].quantity"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_partial_error_reports_stage() {
        let err = SyncError::PartiallyApplied {
            order_id: OrderId::new(),
            stage: SyncStage::LedgerWrite,
            intent_id: SyncIntentId::new(),
            source: PortError::connection("down"),
        };
        assert!(err.is_partially_applied());
        assert_eq!(err.stage(), Some(SyncStage::LedgerWrite));
        assert!(err.to_string().contains("ledger_write"));
    }

    #[test]
    fn test_conflict_detection() {
        let stale = SyncError::StalePreviousStatus {
            order_id: OrderId::new(),
            expected: OrderStatus::Pending,
            actual: OrderStatus::Delivered,
        };
        assert!(stale.is_conflict());

        let version = SyncError::at(SyncStage::OrderWrite)(PortError::conflict("version"));
        assert!(version.is_conflict());
        assert!(!version.is_not_found());
    }
}
