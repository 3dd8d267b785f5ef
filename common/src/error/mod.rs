//! Error types for the exchange simulation
//!
//! This module provides a unified error handling system for every crate in
//! the workspace. Business-rule failures (insufficient funds, unknown
//! instrument, ...) are reported back to the requester as human-readable
//! messages; the remaining variants are system faults.

use std::fmt::Display;
use thiserror::Error;

/// Exchange error type
#[derive(Debug, Error)]
pub enum Error {
    /// Trade quantity was not a positive whole number
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Error when an account cannot pay for a purchase or installment
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Error when an instrument has fewer unsold shares than requested
    #[error("Insufficient supply: {0}")]
    InsufficientSupply(String),

    /// Error when an account sells more shares than it holds
    #[error("Insufficient holdings: {0}")]
    InsufficientHoldings(String),

    /// Error when an instrument code is unknown
    #[error("Instrument not found: {0}")]
    InstrumentNotFound(String),

    /// Error when an account cannot be found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Unique key collision (username, instrument code or name)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Account already took the maximum number of loans
    #[error("Loan limit reached: {0}")]
    LoanLimitReached(String),

    /// Installment cannot be paid
    #[error("Installment rejected: {0}")]
    InstallmentRejected(String),

    /// Request arrived outside the trading window
    #[error("Market closed: {0}")]
    MarketClosed(String),

    /// Generic validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Decimal conversion error
    #[error("Decimal conversion error: {0}")]
    DecimalError(String),
}

impl Error {
    /// Whether this error is a rejected request rather than a system fault
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            Error::ConfigurationError(_)
                | Error::Internal(_)
                | Error::Database(_)
                | Error::Migration(_)
                | Error::Serialization(_)
                | Error::DecimalError(_)
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait to add context to error results
pub trait ErrorExt<T> {
    /// Add context information to an error
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display;
}

impl<T> ErrorExt<T> for Result<T> {
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display,
    {
        self.map_err(|e| {
            let context = context_fn().to_string();
            match e {
                Error::Internal(msg) => Error::Internal(format!("{}: {}", context, msg)),
                Error::ConfigurationError(msg) => Error::ConfigurationError(format!("{}: {}", context, msg)),
                Error::DecimalError(msg) => Error::DecimalError(format!("{}: {}", context, msg)),
                // User-facing messages are shown verbatim, system errors keep their source
                other => other,
            }
        })
    }
}

/// Convert string messages into an error
impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Internal(message)
    }
}

/// Convert static string references into an error
impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::Internal(message.to_string())
    }
}

/// From rust_decimal::Error
impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::DecimalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_prefixed_on_internal_errors_only() {
        let internal: Result<()> = Err(Error::Internal("boom".into()));
        let err = internal.with_context(|| "loading account").unwrap_err();
        assert_eq!(err.to_string(), "Internal error: loading account: boom");

        let user: Result<()> = Err(Error::InsufficientFunds("need 10".into()));
        let err = user.with_context(|| "trading").unwrap_err();
        assert_eq!(err.to_string(), "Insufficient funds: need 10");
    }

    #[test]
    fn user_errors_are_classified() {
        assert!(Error::MarketClosed("x".into()).is_user_error());
        assert!(!Error::Internal("x".into()).is_user_error());
    }
}
