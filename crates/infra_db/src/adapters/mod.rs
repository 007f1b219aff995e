//! Domain Adapters
//!
//! PostgreSQL implementations of the domain ports. Each adapter:
//! - Implements the domain's port trait
//! - Translates between domain models and database row types
//! - Uses the repository layer for database operations
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::{PostgresOrderAdapter, PostgresLedgerAdapter, PostgresSyncJournal};
//! use std::sync::Arc;
//!
//! let orders = Arc::new(PostgresOrderAdapter::new(pool.clone()));
//! let ledger = Arc::new(PostgresLedgerAdapter::new(pool.clone()));
//! let journal = Arc::new(PostgresSyncJournal::new(pool));
//! ```

pub mod orders;
pub mod ledger;
pub mod journal;

pub use orders::PostgresOrderAdapter;
pub use ledger::PostgresLedgerAdapter;
pub use journal::PostgresSyncJournal;

use std::time::Instant;

use sqlx::PgPool;

use core_kernel::{Currency, HealthCheckResult};

use crate::error::DatabaseError;

/// Runs `SELECT 1` and reports the round-trip latency
pub(crate) async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = Instant::now();
    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;

    let health = match result {
        Ok(_) => HealthCheckResult::healthy(adapter_id),
        Err(e) => HealthCheckResult::unhealthy(adapter_id, format!("Database error: {}", e)),
    };
    health.with_latency(start.elapsed())
}

/// Parses a stored currency code
pub(crate) fn parse_currency(code: &str) -> Result<Currency, DatabaseError> {
    code.parse::<Currency>()
        .map_err(|e| DatabaseError::CorruptRow(e.to_string()))
}
