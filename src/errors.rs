//! Unified error type for `BudgetBuddy`.
//!
//! Every fallible operation in the crate returns [`Result`]. Not-found and ownership
//! failures are surfaced to the caller as-is; persistence failures are propagated
//! unchanged from `SeaORM`.

use thiserror::Error;

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// No budget exists for the requested user and period
    #[error("Budget not found for {user_id} in {year}-{month:02}")]
    BudgetNotFound {
        /// Owner of the requested budget
        user_id: String,
        /// Requested month (1-12)
        month: u32,
        /// Requested year
        year: i32,
    },

    /// No budget exists with the given id
    #[error("Budget not found: {id}")]
    BudgetIdNotFound {
        /// Requested budget id
        id: i64,
    },

    /// Transaction is missing or has been soft-deleted
    #[error("Transaction not found: {id}")]
    TransactionNotFound {
        /// Requested transaction id
        id: i64,
    },

    /// The record belongs to a different user
    #[error("Not authorized to access {resource} {id}")]
    Unauthorized {
        /// Kind of record, e.g. `"budget"` or `"transaction"`
        resource: &'static str,
        /// Id of the record
        id: i64,
    },

    /// Input rejected at the boundary
    #[error("Validation failed for {field}: {message}")]
    Validation {
        /// Name of the offending field
        field: &'static str,
        /// Human readable reason
        message: String,
    },

    /// Amount is not a finite, strictly positive number
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Settings could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the failure
        message: String,
    },

    /// Database failure, propagated from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Settings file exists but could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
