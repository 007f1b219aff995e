//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! order-ledger test suites.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for common values
//! - `builders`: Builder patterns for order requests, edits and ledger entries
//! - `assertions`: Assertion helpers for the order/ledger invariant
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
