//! Stable, sum-typed error codes for the banking engine.
//!
//! Every variant carries a human-readable message and round-trips through
//! `code()` to the machine-readable string a caller on the other side of a
//! process boundary would match on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The result type returned by every fallible operation in this crate.
pub type BankResult<T> = Result<T, BankError>;

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum BankError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("unauthorized access to account {0}")]
    UnauthorizedAccess(String),

    #[error("account {0} is frozen")]
    AccountFrozen(String),

    #[error("account {0} is closed")]
    AccountClosed(String),

    #[error("source and destination accounts must differ")]
    SelfTransfer,

    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: String, requested: String },

    #[error("duplicate operation for key {0}")]
    DuplicateOperation(String),

    #[error("concurrency conflict after {attempts} attempts")]
    ConcurrencyConflict { attempts: u32 },

    #[error("storage error: {0}")]
    StorageError(String),
}

impl BankError {
    /// The stable, machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            BankError::InvalidAmount(_) => "INVALID_AMOUNT",
            BankError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            BankError::UnauthorizedAccess(_) => "UNAUTHORIZED_ACCESS",
            BankError::AccountFrozen(_) => "ACCOUNT_FROZEN",
            BankError::AccountClosed(_) => "ACCOUNT_CLOSED",
            BankError::SelfTransfer => "SELF_TRANSFER",
            BankError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            BankError::DuplicateOperation(_) => "DUPLICATE_OPERATION",
            BankError::ConcurrencyConflict { .. } => "CONCURRENCY_CONFLICT",
            BankError::StorageError(_) => "STORAGE_ERROR",
        }
    }
}
