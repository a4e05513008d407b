//! Ledger error types for posting validation and storage failures.

use rust_decimal::Decimal;
use thiserror::Error;

use super::types::SourceKey;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Debit and credit totals differ beyond tolerance.
    #[error("Batch is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// A posting must carry at least one entry.
    #[error("Batch must have at least one entry")]
    EmptyBatch,

    /// Entry amount cannot be negative.
    #[error("Entry amount cannot be negative on account {0}")]
    NegativeAmount(String),

    /// Entry must set exactly one of debit or credit.
    #[error("Entry on account {0} must specify either debit or credit, not both or neither")]
    InvalidEntrySide(String),

    /// Entry amount has more decimal places than the ledger stores.
    #[error("Entry amount on account {0} exceeds 4 decimal places")]
    ExcessPrecision(String),

    // ========== Account Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Account is inactive and cannot be used.
    #[error("Account {0} is inactive")]
    AccountInactive(String),

    // ========== Concurrency Errors ==========
    /// A concurrent writer kept winning the natural-key race.
    #[error("Duplicate posting for {0}")]
    DuplicatePosting(SourceKey),

    /// Concurrent modification detected.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== Storage Errors ==========
    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns the error code for callers.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unbalanced { .. } => "UNBALANCED_BATCH",
            Self::EmptyBatch => "EMPTY_BATCH",
            Self::NegativeAmount(_) => "NEGATIVE_AMOUNT",
            Self::InvalidEntrySide(_) => "INVALID_ENTRY_SIDE",
            Self::ExcessPrecision(_) => "EXCESS_PRECISION",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::DuplicatePosting(_) => "DUPLICATE_POSTING",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns true if the error is a missing or inactive account.
    #[must_use]
    pub fn is_missing_account(&self) -> bool {
        matches!(self, Self::AccountNotFound(_) | Self::AccountInactive(_))
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}

impl From<LedgerError> for tally_shared::AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Unbalanced { .. }
            | LedgerError::EmptyBatch
            | LedgerError::NegativeAmount(_)
            | LedgerError::InvalidEntrySide(_)
            | LedgerError::ExcessPrecision(_)
            | LedgerError::AccountInactive(_) => Self::Validation(err.to_string()),
            LedgerError::AccountNotFound(_) => Self::NotFound(err.to_string()),
            LedgerError::DuplicatePosting(_) | LedgerError::ConcurrentModification => {
                Self::Conflict(err.to_string())
            }
            LedgerError::Storage(msg) => Self::Database(msg),
        }
    }
}
