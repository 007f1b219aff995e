//! Core Kernel - Foundational types shared by the order and ledger domains
//!
//! This crate provides the building blocks used across the workspace:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers for orders, lines, and ledger entries
//! - Port infrastructure (errors, health checks, operation metadata)

pub mod money;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use money::{Money, Currency, MoneyError, MAX_STORED_AMOUNT};
pub use identifiers::{
    OrderId, OrderLineId, LedgerEntryId, CustomerId, ProductId, SyncIntentId,
};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
    OperationMetadata,
};
pub use error::CoreError;
