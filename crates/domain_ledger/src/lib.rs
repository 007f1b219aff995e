//! Ledger Domain - Financial entries and the Ledger Accessor
//!
//! This crate owns the revenue/expense entry model and the port through
//! which entries are stored. Entries may carry a back-reference to the
//! sales order they were derived from.
//!
//! # Linked Entries
//!
//! For every order in `delivered` with a positive total there is exactly
//! one revenue entry whose `order_ref` is that order. Keeping that true is
//! the job of the synchronization services; this crate only stores what
//! it is given.

pub mod entry;
pub mod ports;
pub mod error;

pub use entry::{LedgerEntry, NewLedgerEntry, LedgerEntryUpdate, EntryKind};
pub use ports::{LedgerPort, LedgerPortExt};
pub use error::LedgerError;

#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockLedgerPort;
