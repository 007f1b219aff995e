//! Repository implementations
//!
//! Each repository wraps the SQL for one table group and speaks in row
//! types; translation to domain models happens in the adapters.
//!
//! Queries are built at runtime (`sqlx::query_as::<_, Row>`), so the crate
//! compiles without a live database.

pub mod orders;
pub mod ledger;
pub mod sync_intents;

pub use orders::OrderRepository;
pub use ledger::LedgerRepository;
pub use sync_intents::SyncIntentRepository;
