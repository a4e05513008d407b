//! Balance timeline service.
//!
//! Gathers a party's documents and journal batches, normalizes them into
//! events and replays them. Building never writes; only [`reconcile`]
//! updates the cached balance.
//!
//! [`reconcile`]: BalanceService::reconcile

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::LedgerConfig;
use tally_shared::types::CurrencyCode;
use tracing::{info, instrument, warn};

use super::builder::{BalanceTimeline, TimelineBuilder, TimelineEntry};
use super::documents::{SourceDocument, journal_events};
use super::error::TimelineError;
use super::events::{EventWindow, LedgerEvent};
use crate::currency::{FxResolver, OnMissingRate};
use crate::ledger::LedgerStore;
use crate::party::{PartyBalances, PartyRef};
use crate::settlement::Settlement;

/// Read-only feed of business documents.
#[async_trait::async_trait]
pub trait DocumentFeed: Send + Sync {
    /// Documents touching `party` with any effective instant inside `window`.
    ///
    /// Returning extra documents is allowed; events outside the window are
    /// dropped after normalization.
    async fn documents(
        &self,
        party: PartyRef,
        window: EventWindow,
    ) -> Result<Vec<SourceDocument>, TimelineError>;
}

/// Source of the balance fields carried by each party.
#[async_trait::async_trait]
pub trait PartyDirectory: Send + Sync {
    /// Opening and cached balances, or `None` for an unknown party.
    async fn balances(&self, party: PartyRef) -> Result<Option<PartyBalances>, TimelineError>;

    /// Overwrites the cached balance.
    async fn set_cached_balance(
        &self,
        party: PartyRef,
        balance: Decimal,
    ) -> Result<(), TimelineError>;
}

/// Settings shared by every timeline build.
#[derive(Debug, Clone)]
pub struct TimelineConfig {
    /// Currency balances are expressed in.
    pub base_currency: CurrencyCode,
    /// Drift tolerance.
    pub tolerance: Decimal,
    /// Source type of manual journal batches.
    pub journal_source_type: String,
    /// Control accounts whose net movement is a journal adjustment.
    pub control_accounts: Vec<String>,
    /// Policy for events without a conversion path.
    pub on_missing: OnMissingRate,
}

impl TimelineConfig {
    /// Builds the settings from the ledger configuration.
    ///
    /// Events without a conversion path are converted at rate 1 and counted
    /// as unpriced, unless `strict_rates` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base currency is malformed.
    pub fn from_ledger(config: &LedgerConfig) -> Result<Self, TimelineError> {
        Ok(Self {
            base_currency: config
                .base_currency()
                .map_err(crate::currency::FxError::from)?,
            tolerance: config.balance_tolerance,
            journal_source_type: config.journal_source_type.clone(),
            control_accounts: config.control_accounts.clone(),
            on_missing: if config.strict_rates {
                OnMissingRate::Raise
            } else {
                OnMissingRate::unpriced_one()
            },
        })
    }

    /// Sets the missing-rate policy.
    #[must_use]
    pub fn with_missing_rate(mut self, on_missing: OnMissingRate) -> Self {
        self.on_missing = on_missing;
        self
    }
}

/// Outcome of an explicit reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// The party.
    pub party: PartyRef,
    /// Cached balance before reconciling.
    pub previous_balance: Decimal,
    /// Cached balance after reconciling.
    pub reconciled_balance: Decimal,
    /// True if the cached balance was rewritten.
    pub updated: bool,
}

/// Builds and reconciles party balance timelines.
pub struct BalanceService<F, P, L>
where
    F: DocumentFeed,
    P: PartyDirectory,
    L: LedgerStore,
{
    feed: Arc<F>,
    parties: Arc<P>,
    ledger: Arc<L>,
    fx: Arc<FxResolver>,
    config: TimelineConfig,
}

impl<F, P, L> BalanceService<F, P, L>
where
    F: DocumentFeed,
    P: PartyDirectory,
    L: LedgerStore,
{
    /// Creates a new balance service.
    #[must_use]
    pub fn new(
        feed: Arc<F>,
        parties: Arc<P>,
        ledger: Arc<L>,
        fx: Arc<FxResolver>,
        config: TimelineConfig,
    ) -> Self {
        Self {
            feed,
            parties,
            ledger,
            fx,
            config,
        }
    }

    /// Returns the timeline settings.
    #[must_use]
    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    fn builder(&self) -> TimelineBuilder<'_> {
        TimelineBuilder::new(
            &self.fx,
            &self.config.base_currency,
            self.config.tolerance,
            self.config.on_missing,
        )
    }

    /// Returns the party's balance fields.
    ///
    /// # Errors
    ///
    /// Returns `TimelineError::PartyNotFound` for an unknown party.
    pub async fn party_balances(&self, party: PartyRef) -> Result<PartyBalances, TimelineError> {
        self.parties
            .balances(party)
            .await?
            .ok_or(TimelineError::PartyNotFound(party))
    }

    /// Normalized events for `party` inside `window`, unordered.
    ///
    /// # Errors
    ///
    /// Returns a feed or ledger storage error.
    pub async fn events(
        &self,
        party: PartyRef,
        window: EventWindow,
    ) -> Result<Vec<LedgerEvent>, TimelineError> {
        let documents = self.feed.documents(party, window).await?;
        let batches = self.ledger.batches_for_party(party, window).await?;

        let mut events: Vec<LedgerEvent> = documents
            .iter()
            .flat_map(|doc| doc.events_for(party))
            .collect();
        events.extend(journal_events(
            party,
            &batches,
            &self.config.journal_source_type,
            &self.config.control_accounts,
        ));
        events.retain(|e| window.contains(e.occurred_at));
        Ok(events)
    }

    /// Replays events in `window` starting from `opening_balance`.
    ///
    /// # Errors
    ///
    /// Returns a storage error, or `Fx` under a strict missing-rate policy.
    pub async fn replay(
        &self,
        party: PartyRef,
        opening_balance: Decimal,
        stored_balance: Decimal,
        window: EventWindow,
    ) -> Result<BalanceTimeline, TimelineError> {
        let events = self.events(party, window).await?;
        let timeline = self
            .builder()
            .build(party, opening_balance, stored_balance, events)?;

        if timeline.unpriced_count > 0 {
            warn!(%party, unpriced = timeline.unpriced_count, "timeline contains unpriced events");
        }
        if let Some(warning) = &timeline.drift_warning {
            warn!(
                %party,
                running = %warning.running_balance,
                stored = %warning.stored_balance,
                drift = %warning.drift,
                "balance drift detected"
            );
        }
        Ok(timeline)
    }

    /// Priced events in `window`, in chronological order, without a drift
    /// comparison.
    ///
    /// # Errors
    ///
    /// Returns a storage error, or `Fx` under a strict missing-rate policy.
    pub async fn priced_entries(
        &self,
        party: PartyRef,
        window: EventWindow,
    ) -> Result<Vec<TimelineEntry>, TimelineError> {
        let events = self.events(party, window).await?;
        let timeline = self
            .builder()
            .build(party, Decimal::ZERO, Decimal::ZERO, events)?;
        if timeline.unpriced_count > 0 {
            warn!(%party, unpriced = timeline.unpriced_count, "period contains unpriced events");
        }
        Ok(timeline.entries)
    }

    /// Replays the party's full history from its opening balance.
    ///
    /// # Errors
    ///
    /// Returns `PartyNotFound`, a storage error, or `Fx` under a strict
    /// missing-rate policy.
    #[instrument(skip(self), fields(party = %party))]
    pub async fn build_timeline(&self, party: PartyRef) -> Result<BalanceTimeline, TimelineError> {
        let balances = self.party_balances(party).await?;
        self.replay(
            party,
            balances.opening_balance,
            balances.cached_balance,
            EventWindow::all(),
        )
        .await
    }

    /// Replays only events after an approved settlement, starting from its
    /// closing balance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCheckpoint` if the settlement belongs to another party
    /// or is still a draft.
    #[instrument(skip(self, checkpoint), fields(party = %party, checkpoint = %checkpoint.id))]
    pub async fn build_timeline_from_checkpoint(
        &self,
        party: PartyRef,
        checkpoint: &Settlement,
    ) -> Result<BalanceTimeline, TimelineError> {
        if checkpoint.party != party {
            return Err(TimelineError::InvalidCheckpoint(format!(
                "settlement {} belongs to {}",
                checkpoint.id, checkpoint.party
            )));
        }
        if !checkpoint.is_approved() {
            return Err(TimelineError::InvalidCheckpoint(format!(
                "settlement {} is not approved",
                checkpoint.id
            )));
        }

        let balances = self.party_balances(party).await?;
        self.replay(
            party,
            checkpoint.closing_balance,
            balances.cached_balance,
            EventWindow::since(checkpoint.period.end_exclusive()),
        )
        .await
    }

    /// Rewrites the cached balance to the replayed value.
    ///
    /// # Errors
    ///
    /// Returns any error from building the timeline or writing the balance.
    #[instrument(skip(self), fields(party = %party))]
    pub async fn reconcile(&self, party: PartyRef) -> Result<Reconciliation, TimelineError> {
        let timeline = self.build_timeline(party).await?;
        let updated = timeline.drift != Decimal::ZERO;
        if updated {
            self.parties
                .set_cached_balance(party, timeline.running_balance)
                .await?;
            info!(
                previous = %timeline.stored_balance,
                reconciled = %timeline.running_balance,
                "cached balance reconciled"
            );
        }

        Ok(Reconciliation {
            party,
            previous_balance: timeline.stored_balance,
            reconciled_balance: timeline.running_balance,
            updated,
        })
    }
}
