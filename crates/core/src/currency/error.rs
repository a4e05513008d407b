//! Exchange rate error types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_shared::types::{CurrencyCode, InvalidCurrencyCode};
use thiserror::Error;

/// Errors that can occur while recording or resolving exchange rates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FxError {
    /// No direct, inverse or cross path exists for the pair.
    #[error("No exchange rate found for {base} to {quote} as of {as_of}")]
    MissingRate {
        /// Base currency code.
        base: CurrencyCode,
        /// Quote currency code.
        quote: CurrencyCode,
        /// Instant the rate was requested for.
        as_of: DateTime<Utc>,
    },

    /// Exchange rate must be positive.
    #[error("Exchange rate must be positive, got {0}")]
    InvalidRate(Decimal),

    /// An observation cannot map a currency to itself.
    #[error("Base and quote currencies must be different, got {0} twice")]
    SameCurrency(CurrencyCode),

    /// A currency code in configuration or input is malformed.
    #[error(transparent)]
    InvalidCurrency(#[from] InvalidCurrencyCode),
}

impl FxError {
    /// Returns the error code for callers.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingRate { .. } => "MISSING_RATE",
            Self::InvalidRate(_) => "INVALID_RATE",
            Self::SameCurrency(_) => "SAME_CURRENCY",
            Self::InvalidCurrency(_) => "INVALID_CURRENCY",
        }
    }

    /// Returns true if this is a missing conversion path.
    #[must_use]
    pub fn is_missing_rate(&self) -> bool {
        matches!(self, Self::MissingRate { .. })
    }
}

impl From<FxError> for tally_shared::AppError {
    fn from(err: FxError) -> Self {
        match err {
            FxError::MissingRate { .. } => Self::BusinessRule(err.to_string()),
            FxError::InvalidRate(_) | FxError::SameCurrency(_) | FxError::InvalidCurrency(_) => {
                Self::Validation(err.to_string())
            }
        }
    }
}
