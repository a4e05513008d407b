//! Exchange rate observations and resolved quotes.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::CurrencyCode;

use super::error::FxError;

/// Where an exchange rate observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    /// Entered by an operator.
    Manual,
    /// Imported from an external feed.
    External,
}

impl RateSource {
    /// Priority when two observations share a validity instant; higher wins.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Manual => 1,
            Self::External => 0,
        }
    }
}

/// A point-in-time exchange rate observation.
///
/// `1 base = rate quote`, valid from `valid_from` until superseded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateObservation {
    /// Base currency code.
    pub base: CurrencyCode,
    /// Quote currency code.
    pub quote: CurrencyCode,
    /// Exchange rate (must be positive).
    pub rate: Decimal,
    /// Start of validity.
    pub valid_from: DateTime<Utc>,
    /// Origin of the observation.
    pub source: RateSource,
    /// Inactive observations are ignored by resolution.
    pub is_active: bool,
}

impl RateObservation {
    /// Creates a new active, manually entered observation.
    #[must_use]
    pub const fn new(
        base: CurrencyCode,
        quote: CurrencyCode,
        rate: Decimal,
        valid_from: DateTime<Utc>,
    ) -> Self {
        Self {
            base,
            quote,
            rate,
            valid_from,
            source: RateSource::Manual,
            is_active: true,
        }
    }

    /// Sets the observation source.
    #[must_use]
    pub fn with_source(mut self, source: RateSource) -> Self {
        self.source = source;
        self
    }

    /// Checks that the observation can be resolved against.
    ///
    /// # Errors
    ///
    /// Returns `FxError::InvalidRate` if the rate is not positive and
    /// `FxError::SameCurrency` if base and quote are equal.
    pub fn validate(&self) -> Result<(), FxError> {
        if self.rate <= Decimal::ZERO {
            return Err(FxError::InvalidRate(self.rate));
        }
        if self.base == self.quote {
            return Err(FxError::SameCurrency(self.base.clone()));
        }
        Ok(())
    }

    /// Ordering used to pick the authoritative observation: latest validity,
    /// then source priority, then the larger rate.
    #[must_use]
    pub fn precedence(&self, other: &Self) -> Ordering {
        self.valid_from
            .cmp(&other.valid_from)
            .then_with(|| self.source.priority().cmp(&other.source.priority()))
            .then_with(|| self.rate.cmp(&other.rate))
    }
}

/// How a rate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateMethod {
    /// Base and quote are the same currency.
    Identity,
    /// Direct observation for (base, quote).
    Direct,
    /// Observation for (quote, base), inverted.
    Inverse,
    /// Cross-converted through the anchor currency.
    Cross,
    /// No path found; a caller-supplied fallback was used.
    Unpriced,
}

/// A resolved conversion rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuote {
    /// Base currency code.
    pub base: CurrencyCode,
    /// Quote currency code.
    pub quote: CurrencyCode,
    /// `1 base = rate quote`.
    pub rate: Decimal,
    /// How the rate was obtained.
    pub method: RateMethod,
    /// Validity instant of the (oldest) observation used, if any.
    pub observed_at: Option<DateTime<Utc>>,
    /// The instant the rate was requested for.
    pub as_of: DateTime<Utc>,
}

impl RateQuote {
    /// Returns true unless the quote is a fallback value.
    #[must_use]
    pub fn is_priced(&self) -> bool {
        self.method != RateMethod::Unpriced
    }
}

/// What to do when no conversion path exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnMissingRate {
    /// Fail with `FxError::MissingRate`.
    #[default]
    Raise,
    /// Return this rate, flagged as unpriced.
    Fallback(Decimal),
}

impl OnMissingRate {
    /// The common fallback: rate 1, flagged as unpriced.
    #[must_use]
    pub const fn unpriced_one() -> Self {
        Self::Fallback(Decimal::ONE)
    }
}
