//! Timeline error types.

use thiserror::Error;

use crate::currency::FxError;
use crate::ledger::LedgerError;
use crate::party::PartyRef;

/// Errors that can occur while building a balance timeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    /// The party directory has no record of the party.
    #[error("Party not found: {0}")]
    PartyNotFound(PartyRef),

    /// A checkpoint settlement cannot seed this timeline.
    #[error("Invalid checkpoint: {0}")]
    InvalidCheckpoint(String),

    /// Strict currency conversion failed.
    #[error(transparent)]
    Fx(#[from] FxError),

    /// Reading journal batches failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The document feed or party directory failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TimelineError {
    /// Returns the error code for callers.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PartyNotFound(_) => "PARTY_NOT_FOUND",
            Self::InvalidCheckpoint(_) => "INVALID_CHECKPOINT",
            Self::Fx(e) => e.error_code(),
            Self::Ledger(e) => e.error_code(),
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<TimelineError> for tally_shared::AppError {
    fn from(err: TimelineError) -> Self {
        match err {
            TimelineError::PartyNotFound(_) => Self::NotFound(err.to_string()),
            TimelineError::InvalidCheckpoint(_) => Self::BusinessRule(err.to_string()),
            TimelineError::Fx(e) => e.into(),
            TimelineError::Ledger(e) => e.into(),
            TimelineError::Storage(msg) => Self::Database(msg),
        }
    }
}
