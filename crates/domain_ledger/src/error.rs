//! Ledger domain errors

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::MoneyError;

/// Errors that can occur in the ledger domain
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Entry amounts are never negative; the kind carries the sign
    #[error("Negative entry amount: {0}")]
    NegativeAmount(Decimal),

    /// Category is required
    #[error("Entry category must not be empty")]
    EmptyCategory,

    /// Unrecognised entry kind string
    #[error("Unknown entry kind: {0}")]
    UnknownKind(String),

    /// Amount arithmetic failed
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}

impl LedgerError {
    /// Name of the input field this error refers to
    pub fn field(&self) -> &'static str {
        match self {
            LedgerError::NegativeAmount(_) | LedgerError::Money(_) => "amount",
            LedgerError::EmptyCategory => "category",
            LedgerError::UnknownKind(_) => "kind",
        }
    }
}
