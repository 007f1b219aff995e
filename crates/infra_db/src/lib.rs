//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for orders, the ledger, and the sync-intent
//! journal, using SQLx.
//!
//! # Architecture
//!
//! - [`repositories`] hold the SQL and speak in row types
//! - [`adapters`] implement the domain ports (`OrderPort`, `LedgerPort`,
//!   `SyncJournalPort`) on top of the repositories and map
//!   [`DatabaseError`] into `PortError`
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresOrderAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/farm")).await?;
//! run_migrations(&pool).await?;
//! let orders = PostgresOrderAdapter::new(pool.clone());
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, DatabaseConfig, create_pool, run_migrations};
pub use error::DatabaseError;
pub use adapters::{PostgresOrderAdapter, PostgresLedgerAdapter, PostgresSyncJournal};
