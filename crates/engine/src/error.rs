//! The module contains the errors the engine can throw.
//!
//! Validation failures are detected before any I/O; the remaining variants
//! surface store-side conditions. Nothing here retries automatically: a caller
//! that re-invokes an operation re-derives every increment from current state,
//! so manual retry is always safe.

use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed input (non-positive amount, missing category, empty name).
    #[error("Invalid input: {0}")]
    Validation(String),
    /// Referenced wallet or transaction does not exist at mutation time.
    #[error("\"{0}\" not found!")]
    NotFound(String),
    /// A mutation would drive a wallet balance below zero while the
    /// `forbid_negative_balance` policy is on.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    /// The atomic commit lost to a concurrent writer after the store's retry
    /// budget; the caller may re-invoke the same operation.
    #[error("Conflicting update: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Folds lock-contention database errors into [`EngineError::Conflict`].
    ///
    /// SQLite reports a busy/locked condition once its internal retry budget
    /// is spent; every other database error passes through untouched.
    pub(crate) fn classify(self) -> Self {
        match self {
            EngineError::Database(err) if is_lock_contention(&err) => {
                EngineError::Conflict(err.to_string())
            }
            other => other,
        }
    }
}

fn is_lock_contention(err: &DbErr) -> bool {
    let text = err.to_string();
    text.contains("database is locked") || text.contains("database table is locked")
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
