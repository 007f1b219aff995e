//! Ports and Adapters Infrastructure
//!
//! Shared vocabulary for the accessor ports. The synchronization services
//! talk to storage only through traits built on these types:
//!
//! ```text
//!   OrderMutationService / ConsistencyAuditor
//!                  │
//!                  ▼
//!   OrderPort · LedgerPort · SyncJournalPort     (one per domain crate)
//!          ▲                      ▲
//!          │                      │
//!   Postgres adapters        in-memory mocks
//!      (infra_db)            (`mock` feature)
//! ```
//!
//! Every port method returns [`PortError`] and accepts optional
//! [`OperationMetadata`] so a request's correlation id reaches the adapter
//! spans.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single accessor call
#[derive(Debug, Error)]
pub enum PortError {
    #[error("Not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    /// Input rejected by the adapter or the store's constraints
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Stale version or duplicate key
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout { operation: String, duration_ms: u64 },

    #[error("Service unavailable: {service}")]
    ServiceUnavailable { service: String },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Validation error pointing at one input field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn unavailable(service: impl Into<String>) -> Self {
        PortError::ServiceUnavailable {
            service: service.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// True when the same call may succeed later without any change
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortError::Connection { .. }
                | PortError::Timeout { .. }
                | PortError::ServiceUnavailable { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }

    /// True when another writer got there first
    pub fn is_conflict(&self) -> bool {
        matches!(self, PortError::Conflict { .. })
    }
}

/// Marker trait for all domain ports
///
/// Ports are shared as `Arc<dyn Port>` across request tasks.
pub trait DomainPort: Send + Sync + 'static {}

/// Health status for an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    /// Answers reads but cannot be relied on for writes
    Degraded,
    Unhealthy,
}

/// Health check result for an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter_id: String,
    pub status: AdapterHealth,
    pub latency_ms: u64,
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthCheckResult {
    fn new(adapter_id: impl Into<String>, status: AdapterHealth, message: Option<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status,
            latency_ms: 0,
            message,
            checked_at: Utc::now(),
        }
    }

    pub fn healthy(adapter_id: impl Into<String>) -> Self {
        Self::new(adapter_id, AdapterHealth::Healthy, None)
    }

    pub fn degraded(adapter_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(adapter_id, AdapterHealth::Degraded, Some(message.into()))
    }

    pub fn unhealthy(adapter_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(adapter_id, AdapterHealth::Unhealthy, Some(message.into()))
    }

    /// Records how long the probe took
    pub fn with_latency(mut self, elapsed: Duration) -> Self {
        self.latency_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// False only for `Unhealthy`; a degraded adapter still serves traffic
    pub fn is_available(&self) -> bool {
        self.status != AdapterHealth::Unhealthy
    }
}

/// Trait for adapters that support health checks
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}

/// Per-call context passed down from the transport layer
#[derive(Debug, Clone, Default)]
pub struct OperationMetadata {
    /// Request id of the HTTP call that triggered the operation
    pub correlation_id: Option<String>,
    pub context: HashMap<String, String>,
}

impl OperationMetadata {
    pub fn with_correlation_id(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(correlation_id.into()),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_entity_and_id() {
        let error = PortError::not_found("Order", "123");
        assert!(error.is_not_found());
        assert!(!error.is_transient());
        assert_eq!(error.to_string(), "Not found: Order with id 123");
    }

    #[test]
    fn test_transient_errors() {
        assert!(PortError::Timeout {
            operation: "get_order".to_string(),
            duration_ms: 5000,
        }
        .is_transient());
        assert!(PortError::unavailable("ledger").is_transient());
        assert!(PortError::connection("refused").is_transient());

        let conflict = PortError::conflict("version mismatch");
        assert!(conflict.is_conflict());
        assert!(!conflict.is_transient());
    }

    #[test]
    fn test_health_results() {
        let ok = HealthCheckResult::healthy("orders").with_latency(Duration::from_millis(7));
        assert_eq!(ok.latency_ms, 7);
        assert!(ok.is_available());

        assert!(HealthCheckResult::degraded("ledger", "writes disabled").is_available());
        let down = HealthCheckResult::unhealthy("ledger", "connection refused");
        assert!(!down.is_available());
        assert_eq!(down.message.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_operation_metadata() {
        let metadata = OperationMetadata::with_correlation_id("req-123")
            .with_context("path", "/api/v1/orders");

        assert_eq!(metadata.correlation_id.as_deref(), Some("req-123"));
        assert_eq!(metadata.context["path"], "/api/v1/orders");
    }
}
