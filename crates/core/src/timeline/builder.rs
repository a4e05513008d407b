//! Pure replay of a party's events into a running balance.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{CurrencyCode, PageRequest, PageResponse};

use super::events::LedgerEvent;
use crate::currency::{FxError, FxResolver, OnMissingRate, RateMethod};
use crate::party::PartyRef;

/// One replayed event with its base-currency effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// The source event.
    pub event: LedgerEvent,
    /// Rate applied at the event's own instant.
    pub rate: Decimal,
    /// How the rate was resolved.
    pub rate_method: RateMethod,
    /// Event amount in base currency.
    pub base_amount: Decimal,
    /// Signed effect on the balance.
    pub signed_amount: Decimal,
    /// Balance after this event.
    pub balance_after: Decimal,
}

impl TimelineEntry {
    /// Returns true if the conversion used a fallback rate.
    #[must_use]
    pub fn is_unpriced(&self) -> bool {
        self.rate_method == RateMethod::Unpriced
    }
}

/// Non-fatal report that a stored balance disagrees with its replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDriftWarning {
    /// The party.
    pub party: PartyRef,
    /// Replayed balance.
    pub running_balance: Decimal,
    /// Cached balance.
    pub stored_balance: Decimal,
    /// `running - stored`.
    pub drift: Decimal,
    /// Tolerance that was exceeded.
    pub tolerance: Decimal,
}

impl std::fmt::Display for BalanceDriftWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Balance drift for {}: replayed {} vs stored {} (drift {})",
            self.party, self.running_balance, self.stored_balance, self.drift
        )
    }
}

/// The replayed history of one party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceTimeline {
    /// The party.
    pub party: PartyRef,
    /// Currency every amount below is expressed in.
    pub base_currency: CurrencyCode,
    /// Balance the replay started from.
    pub opening_balance: Decimal,
    /// Chronological entries.
    pub entries: Vec<TimelineEntry>,
    /// Balance after the last entry.
    pub running_balance: Decimal,
    /// The party's cached balance.
    pub stored_balance: Decimal,
    /// `running_balance - stored_balance`.
    pub drift: Decimal,
    /// Present when drift exceeds tolerance.
    pub drift_warning: Option<BalanceDriftWarning>,
    /// Entries converted with a fallback rate.
    pub unpriced_count: usize,
}

impl BalanceTimeline {
    /// Returns true if the replay agrees with the stored balance.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.drift_warning.is_none()
    }

    /// Returns one page of entries.
    #[must_use]
    pub fn page(&self, request: PageRequest) -> PageResponse<TimelineEntry> {
        PageResponse::from_slice(&self.entries, request)
    }

    /// Instant of the last entry, if any.
    #[must_use]
    pub fn last_event_at(&self) -> Option<DateTime<Utc>> {
        self.entries.last().map(|e| e.event.occurred_at)
    }
}

/// Builds timelines by pricing and ordering events.
#[derive(Debug, Clone, Copy)]
pub struct TimelineBuilder<'a> {
    fx: &'a FxResolver,
    base_currency: &'a CurrencyCode,
    tolerance: Decimal,
    on_missing: OnMissingRate,
}

impl<'a> TimelineBuilder<'a> {
    /// Creates a builder converting into `base_currency`.
    #[must_use]
    pub const fn new(
        fx: &'a FxResolver,
        base_currency: &'a CurrencyCode,
        tolerance: Decimal,
        on_missing: OnMissingRate,
    ) -> Self {
        Self {
            fx,
            base_currency,
            tolerance,
            on_missing,
        }
    }

    /// Replays `events` from `opening_balance` and compares the result with
    /// `stored_balance`.
    ///
    /// The input order does not matter: entries are sorted by instant, then
    /// by event id.
    ///
    /// # Errors
    ///
    /// Returns `FxError::MissingRate` only under `OnMissingRate::Raise`.
    pub fn build(
        &self,
        party: PartyRef,
        opening_balance: Decimal,
        stored_balance: Decimal,
        mut events: Vec<LedgerEvent>,
    ) -> Result<BalanceTimeline, FxError> {
        events.sort_by(LedgerEvent::chronological);

        let mut running = opening_balance;
        let mut unpriced_count = 0;
        let mut entries = Vec::with_capacity(events.len());

        for event in events {
            let quote = self.fx.rate(
                &event.currency,
                self.base_currency,
                event.occurred_at,
                self.on_missing,
            )?;
            if !quote.is_priced() {
                unpriced_count += 1;
            }

            let base_amount = quote.convert(event.amount);
            let signed_amount = event.flow.signed(base_amount);
            running += signed_amount;

            entries.push(TimelineEntry {
                event,
                rate: quote.rate,
                rate_method: quote.method,
                base_amount,
                signed_amount,
                balance_after: running,
            });
        }

        let drift = running - stored_balance;
        let drift_warning = (drift.abs() > self.tolerance).then(|| BalanceDriftWarning {
            party,
            running_balance: running,
            stored_balance,
            drift,
            tolerance: self.tolerance,
        });

        Ok(BalanceTimeline {
            party,
            base_currency: self.base_currency.clone(),
            opening_balance,
            entries,
            running_balance: running,
            stored_balance,
            drift,
            drift_warning,
            unpriced_count,
        })
    }
}
