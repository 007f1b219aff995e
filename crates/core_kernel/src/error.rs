//! Core error types used across the workspace

use thiserror::Error;
use crate::money::MoneyError;

/// Core error type for the kernel
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// A string could not be parsed into an identifier
    #[error("Invalid {kind} '{value}': {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        reason: String,
    },
}

impl CoreError {
    pub fn invalid_identifier(
        kind: &'static str,
        value: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        CoreError::InvalidIdentifier {
            kind,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}
