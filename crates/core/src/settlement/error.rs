//! Settlement error types.

use chrono::NaiveDate;
use tally_shared::types::SettlementId;
use thiserror::Error;

use crate::party::PartyRef;
use crate::timeline::TimelineError;

/// Errors that can occur while computing or approving settlements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    /// Approved settlements are immutable.
    #[error("Settlement {0} is already approved")]
    AlreadyApproved(SettlementId),

    /// Settlement not found.
    #[error("Settlement not found: {0}")]
    NotFound(SettlementId),

    /// Only an approved settlement can seed the next one.
    #[error("Previous settlement {0} is not approved")]
    PreviousNotApproved(SettlementId),

    /// The previous settlement belongs to another party.
    #[error("Previous settlement belongs to {actual}, expected {expected}")]
    PartyMismatch {
        /// Party being settled.
        expected: PartyRef,
        /// Party of the previous settlement.
        actual: PartyRef,
    },

    /// Period end precedes its start.
    #[error("Invalid period: {start} to {end}")]
    InvalidPeriod {
        /// First day.
        start: NaiveDate,
        /// Last day.
        end: NaiveDate,
    },

    /// The new period does not start after the previous one ends.
    #[error("Period starting {start} overlaps previous settlement ending {previous_end}")]
    OverlapsPrevious {
        /// New period start.
        start: NaiveDate,
        /// Previous period end.
        previous_end: NaiveDate,
    },

    /// Days between the previous period and the new one would go unsettled.
    #[error("Period starting {start} leaves a gap after previous settlement ending {previous_end}")]
    GapAfterPrevious {
        /// New period start.
        start: NaiveDate,
        /// Previous period end.
        previous_end: NaiveDate,
    },

    /// The party's chain already continues past the given previous
    /// settlement, or a first settlement is requested for a party that has one.
    #[error("Settlement chain head is {head}; the new period would branch the chain")]
    BranchesChain {
        /// The party's latest settlement.
        head: SettlementId,
    },

    /// Gathering or pricing the period's events failed.
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl SettlementError {
    /// Returns the error code for callers.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyApproved(_) => "SETTLEMENT_ALREADY_APPROVED",
            Self::NotFound(_) => "SETTLEMENT_NOT_FOUND",
            Self::PreviousNotApproved(_) => "PREVIOUS_NOT_APPROVED",
            Self::PartyMismatch { .. } => "PARTY_MISMATCH",
            Self::InvalidPeriod { .. } => "INVALID_PERIOD",
            Self::OverlapsPrevious { .. } => "OVERLAPS_PREVIOUS",
            Self::GapAfterPrevious { .. } => "GAP_AFTER_PREVIOUS",
            Self::BranchesChain { .. } => "BRANCHES_CHAIN",
            Self::Timeline(e) => e.error_code(),
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<SettlementError> for tally_shared::AppError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::NotFound(_) => Self::NotFound(err.to_string()),
            SettlementError::AlreadyApproved(_) => Self::Conflict(err.to_string()),
            SettlementError::PreviousNotApproved(_)
            | SettlementError::PartyMismatch { .. }
            | SettlementError::OverlapsPrevious { .. }
            | SettlementError::GapAfterPrevious { .. }
            | SettlementError::BranchesChain { .. } => Self::BusinessRule(err.to_string()),
            SettlementError::InvalidPeriod { .. } => Self::Validation(err.to_string()),
            SettlementError::Timeline(e) => e.into(),
            SettlementError::Storage(msg) => Self::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SettlementError::AlreadyApproved(SettlementId::new(4)).error_code(),
            "SETTLEMENT_ALREADY_APPROVED"
        );
        let err: SettlementError = TimelineError::PartyNotFound(PartyRef::customer(1)).into();
        assert_eq!(err.error_code(), "PARTY_NOT_FOUND");
        assert_eq!(
            SettlementError::BranchesChain { head: SettlementId::new(2) }.error_code(),
            "BRANCHES_CHAIN"
        );
    }

    #[test]
    fn test_display() {
        let err = SettlementError::PartyMismatch {
            expected: PartyRef::customer(1),
            actual: PartyRef::supplier(1),
        };
        assert_eq!(
            err.to_string(),
            "Previous settlement belongs to SUPPLIER#1, expected CUSTOMER#1"
        );
    }

    #[test]
    fn test_app_error_mapping() {
        let app: tally_shared::AppError = SettlementError::AlreadyApproved(SettlementId::new(1)).into();
        assert_eq!(app.status_code(), 409);

        let gap: tally_shared::AppError = SettlementError::GapAfterPrevious {
            start: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            previous_end: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        }
        .into();
        assert_eq!(gap.status_code(), 422);
    }
}
