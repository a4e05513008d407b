//! Point-in-time exchange rate resolution.
//!
//! Lookup order for a (base, quote, as-of) request:
//! 1. Identity when base == quote
//! 2. Direct observation (base -> quote), most recent at or before as-of
//! 3. Inverse observation (quote -> base), inverted
//! 4. Cross through the anchor currency, each leg direct or inverse
//! 5. The caller's `OnMissingRate` policy
//!
//! Resolutions are memoized per resolver in a moka cache keyed by the exact
//! request. Recording or deactivating an observation evicts every memoized
//! quote that mentions either currency of the pair.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use rust_decimal::Decimal;
use tally_shared::types::CurrencyCode;
use tally_shared::{FxCacheConfig, LedgerConfig};
use tracing::{debug, warn};

use super::conversion::convert;
use super::error::FxError;
use super::exchange::{OnMissingRate, RateMethod, RateObservation, RateQuote};

type PairKey = (CurrencyCode, CurrencyCode);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct QuoteKey {
    base: CurrencyCode,
    quote: CurrencyCode,
    as_of: DateTime<Utc>,
}

impl QuoteKey {
    fn mentions(&self, currency: &CurrencyCode) -> bool {
        &self.base == currency || &self.quote == currency
    }
}

/// One leg of a resolution: the rate and the instant it was observed.
#[derive(Debug, Clone, Copy)]
struct Leg {
    rate: Decimal,
    method: RateMethod,
    observed_at: DateTime<Utc>,
}

/// Exchange rate resolver over an in-memory observation book.
pub struct FxResolver {
    anchor: CurrencyCode,
    book: RwLock<HashMap<PairKey, Vec<RateObservation>>>,
    cache: Cache<QuoteKey, RateQuote>,
}

impl std::fmt::Debug for FxResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FxResolver")
            .field("anchor", &self.anchor)
            .field("cached", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl FxResolver {
    /// Creates an empty resolver with the default cache settings.
    #[must_use]
    pub fn new(anchor: CurrencyCode) -> Self {
        Self::with_cache_config(anchor, &FxCacheConfig::default())
    }

    /// Creates an empty resolver with a custom cache configuration.
    #[must_use]
    pub fn with_cache_config(anchor: CurrencyCode, cache_config: &FxCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(cache_config.max_capacity)
            .time_to_live(Duration::from_secs(cache_config.ttl_secs))
            .build();

        Self {
            anchor,
            book: RwLock::new(HashMap::new()),
            cache,
        }
    }

    /// Creates an empty resolver from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns `FxError::InvalidCurrency` if the anchor code is malformed.
    pub fn from_config(
        ledger: &LedgerConfig,
        cache_config: &FxCacheConfig,
    ) -> Result<Self, FxError> {
        Ok(Self::with_cache_config(ledger.anchor_currency()?, cache_config))
    }

    /// Returns the anchor currency used for cross rates.
    #[must_use]
    pub fn anchor(&self) -> &CurrencyCode {
        &self.anchor
    }

    /// Records a new observation.
    ///
    /// # Errors
    ///
    /// Returns `FxError::InvalidRate` if the rate is not positive and
    /// `FxError::SameCurrency` if base and quote are equal.
    pub fn record(&self, observation: RateObservation) -> Result<(), FxError> {
        observation.validate()?;

        let mut book = self.book.write().unwrap_or_else(PoisonError::into_inner);
        let base = observation.base.clone();
        let quote = observation.quote.clone();
        book.entry((base.clone(), quote.clone()))
            .or_default()
            .push(observation);
        self.evict_pair(&base, &quote);
        Ok(())
    }

    /// Records many observations, stopping at the first invalid one.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn extend<I>(&self, observations: I) -> Result<(), FxError>
    where
        I: IntoIterator<Item = RateObservation>,
    {
        for observation in observations {
            self.record(observation)?;
        }
        Ok(())
    }

    /// Marks the observation for `(base, quote)` valid from `valid_from` as
    /// inactive. Returns false if no such active observation exists.
    pub fn deactivate(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        valid_from: DateTime<Utc>,
    ) -> bool {
        let mut book = self.book.write().unwrap_or_else(PoisonError::into_inner);
        let Some(observations) = book.get_mut(&(base.clone(), quote.clone())) else {
            return false;
        };

        let mut changed = false;
        for observation in observations
            .iter_mut()
            .filter(|o| o.is_active && o.valid_from == valid_from)
        {
            observation.is_active = false;
            changed = true;
        }

        if changed {
            self.evict_pair(base, quote);
        }
        changed
    }

    /// Resolves a rate, failing when no path exists.
    ///
    /// # Errors
    ///
    /// Returns `FxError::MissingRate` if neither a direct, inverse nor cross
    /// path exists at `as_of`.
    pub fn resolve(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        as_of: DateTime<Utc>,
    ) -> Result<RateQuote, FxError> {
        self.rate(base, quote, as_of, OnMissingRate::Raise)
    }

    /// Resolves a rate, applying `on_missing` when no path exists.
    ///
    /// # Errors
    ///
    /// Returns `FxError::MissingRate` only under `OnMissingRate::Raise`.
    pub fn rate(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        as_of: DateTime<Utc>,
        on_missing: OnMissingRate,
    ) -> Result<RateQuote, FxError> {
        if base == quote {
            return Ok(RateQuote {
                base: base.clone(),
                quote: quote.clone(),
                rate: Decimal::ONE,
                method: RateMethod::Identity,
                observed_at: None,
                as_of,
            });
        }

        let key = QuoteKey {
            base: base.clone(),
            quote: quote.clone(),
            as_of,
        };
        if let Some(hit) = self.cache.get(&key) {
            debug!(%base, %quote, %as_of, "fx cache hit");
            return Ok(hit);
        }

        // Compute and memoize under the read lock so a concurrent writer
        // cannot evict before a stale quote is inserted.
        let book = self.book.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(leg) = self.find_path(&book, base, quote, as_of) {
            let quote_value = RateQuote {
                base: base.clone(),
                quote: quote.clone(),
                rate: leg.rate,
                method: leg.method,
                observed_at: Some(leg.observed_at),
                as_of,
            };
            self.cache.insert(key, quote_value.clone());
            return Ok(quote_value);
        }
        drop(book);

        match on_missing {
            OnMissingRate::Raise => Err(FxError::MissingRate {
                base: base.clone(),
                quote: quote.clone(),
                as_of,
            }),
            OnMissingRate::Fallback(rate) => {
                warn!(%base, %quote, %as_of, %rate, "no exchange rate path, using fallback");
                Ok(RateQuote {
                    base: base.clone(),
                    quote: quote.clone(),
                    rate,
                    method: RateMethod::Unpriced,
                    observed_at: None,
                    as_of,
                })
            }
        }
    }

    /// Converts `amount` from `from` into `to` at `as_of`, rounded to ledger
    /// precision.
    ///
    /// # Errors
    ///
    /// Returns `FxError::MissingRate` if no strict path exists.
    pub fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: DateTime<Utc>,
    ) -> Result<(Decimal, RateQuote), FxError> {
        let quote = self.resolve(from, to, as_of)?;
        Ok((quote.convert(amount), quote))
    }

    /// Returns a snapshot of every recorded observation, active or not,
    /// ordered by pair then validity.
    #[must_use]
    pub fn observations(&self) -> Vec<RateObservation> {
        let book = self.book.read().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<RateObservation> = book.values().flatten().cloned().collect();
        all.sort_by(|a, b| {
            (&a.base, &a.quote, a.valid_from).cmp(&(&b.base, &b.quote, b.valid_from))
        });
        all
    }

    /// Returns the number of memoized resolutions after flushing pending
    /// cache maintenance.
    #[must_use]
    pub fn cached_entries(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    fn evict_pair(&self, base: &CurrencyCode, quote: &CurrencyCode) {
        let stale: Vec<_> = self
            .cache
            .iter()
            .filter(|(key, _)| key.mentions(base) || key.mentions(quote))
            .map(|(key, _)| key)
            .collect();
        for key in stale {
            self.cache.invalidate(key.as_ref());
        }
    }

    fn find_path(
        &self,
        book: &HashMap<PairKey, Vec<RateObservation>>,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        as_of: DateTime<Utc>,
    ) -> Option<Leg> {
        if let Some(leg) = Self::find_leg(book, base, quote, as_of) {
            return Some(leg);
        }

        if base == &self.anchor || quote == &self.anchor {
            return None;
        }

        let first = Self::find_leg(book, base, &self.anchor, as_of)?;
        let second = Self::find_leg(book, &self.anchor, quote, as_of)?;
        Some(Leg {
            rate: first.rate.checked_mul(second.rate)?,
            method: RateMethod::Cross,
            observed_at: first.observed_at.min(second.observed_at),
        })
    }

    /// Direct first, then inverse.
    fn find_leg(
        book: &HashMap<PairKey, Vec<RateObservation>>,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        as_of: DateTime<Utc>,
    ) -> Option<Leg> {
        if let Some(direct) = Self::latest(book, base, quote, as_of) {
            return Some(Leg {
                rate: direct.rate,
                method: RateMethod::Direct,
                observed_at: direct.valid_from,
            });
        }

        let inverse = Self::latest(book, quote, base, as_of)?;
        Some(Leg {
            rate: Decimal::ONE.checked_div(inverse.rate)?,
            method: RateMethod::Inverse,
            observed_at: inverse.valid_from,
        })
    }

    fn latest<'a>(
        book: &'a HashMap<PairKey, Vec<RateObservation>>,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        as_of: DateTime<Utc>,
    ) -> Option<&'a RateObservation> {
        book.get(&(base.clone(), quote.clone()))?
            .iter()
            .filter(|o| o.is_active && o.valid_from <= as_of)
            .max_by(|a, b| a.precedence(b))
    }
}

impl RateQuote {
    /// Converts an amount of `base` into `quote`, rounded to ledger precision.
    #[must_use]
    pub fn convert(&self, amount: Decimal) -> Decimal {
        convert(amount, self.rate)
    }
}
