//! Settlement service.
//!
//! Computes a party's settlement for a period, chained to the previous
//! approved settlement, and drives the draft-to-approved transition.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tally_shared::types::{SettlementId, UserId};
use tracing::{info, instrument};

use super::calculator::PeriodTotals;
use super::error::SettlementError;
use super::store::SettlementStore;
use super::types::{Settlement, SettlementDraft, SettlementPeriod};
use crate::ledger::LedgerStore;
use crate::party::PartyRef;
use crate::timeline::{BalanceService, DocumentFeed, PartyDirectory};

/// Settlement service over a balance service and a settlement store.
pub struct SettlementService<F, P, L, S>
where
    F: DocumentFeed,
    P: PartyDirectory,
    L: LedgerStore,
    S: SettlementStore,
{
    balances: Arc<BalanceService<F, P, L>>,
    store: Arc<S>,
}

impl<F, P, L, S> SettlementService<F, P, L, S>
where
    F: DocumentFeed,
    P: PartyDirectory,
    L: LedgerStore,
    S: SettlementStore,
{
    /// Creates a new settlement service.
    #[must_use]
    pub fn new(balances: Arc<BalanceService<F, P, L>>, store: Arc<S>) -> Self {
        Self { balances, store }
    }

    /// Computes and saves the draft settlement for `party` over the
    /// inclusive days `start..=end`.
    ///
    /// The opening balance is the closing balance of `previous`, or the
    /// party's opening balance when there is none. Recomputing an existing
    /// draft for the same period replaces it in place.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriod`, a chaining error for `previous`
    /// (`NotFound`, `PartyMismatch`, `PreviousNotApproved`,
    /// `OverlapsPrevious`, `GapAfterPrevious`), `BranchesChain` unless the
    /// period extends the party's latest settlement, `AlreadyApproved` if
    /// the period is already frozen, or a timeline error.
    #[instrument(skip(self), fields(party = %party))]
    pub async fn compute_settlement(
        &self,
        party: PartyRef,
        start: NaiveDate,
        end: NaiveDate,
        previous: Option<SettlementId>,
    ) -> Result<Settlement, SettlementError> {
        let period = SettlementPeriod::new(start, end)?;
        let opening_balance = match previous {
            Some(id) => self.chained_opening(party, period, id).await?,
            None => self.balances.party_balances(party).await?.opening_balance,
        };
        self.check_chain_head(party, period, previous).await?;

        let entries = self.balances.priced_entries(party, period.window()).await?;
        let totals = PeriodTotals::from_entries(&entries);
        let closing_balance = totals.closing_from(opening_balance);

        let saved = self
            .store
            .save_draft(SettlementDraft {
                party,
                previous_settlement_id: previous,
                period,
                opening_balance,
                rights: totals.rights,
                obligations: totals.obligations,
                payments: totals.payments,
                adjustments: totals.adjustments,
                closing_balance,
                computed_at: Utc::now(),
            })
            .await?;

        info!(
            settlement = %saved.id,
            events = entries.len(),
            opening = %saved.opening_balance,
            closing = %saved.closing_balance,
            "settlement computed"
        );
        Ok(saved)
    }

    async fn chained_opening(
        &self,
        party: PartyRef,
        period: SettlementPeriod,
        previous: SettlementId,
    ) -> Result<Decimal, SettlementError> {
        let prior = self
            .store
            .get(previous)
            .await?
            .ok_or(SettlementError::NotFound(previous))?;

        if prior.party != party {
            return Err(SettlementError::PartyMismatch {
                expected: party,
                actual: prior.party,
            });
        }
        if !prior.is_approved() {
            return Err(SettlementError::PreviousNotApproved(previous));
        }
        if prior.period.end >= period.start {
            return Err(SettlementError::OverlapsPrevious {
                start: period.start,
                previous_end: prior.period.end,
            });
        }
        if prior.period.end.succ_opt() != Some(period.start) {
            return Err(SettlementError::GapAfterPrevious {
                start: period.start,
                previous_end: prior.period.end,
            });
        }
        Ok(prior.closing_balance)
    }

    /// The new period must extend the party's chain from its head. The only
    /// other accepted head is a draft for the same period and predecessor,
    /// which is being recomputed.
    async fn check_chain_head(
        &self,
        party: PartyRef,
        period: SettlementPeriod,
        previous: Option<SettlementId>,
    ) -> Result<(), SettlementError> {
        let Some(head) = self.store.latest_for_party(party).await? else {
            return Ok(());
        };
        let extends_head = previous == Some(head.id);
        let recomputes_head = head.period == period && head.previous_settlement_id == previous;
        if extends_head || recomputes_head {
            Ok(())
        } else {
            Err(SettlementError::BranchesChain { head: head.id })
        }
    }

    /// Recomputes a draft from current data.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `AlreadyApproved`, or any error from
    /// [`compute_settlement`](Self::compute_settlement).
    #[instrument(skip(self), fields(settlement = %id))]
    pub async fn recompute(&self, id: SettlementId) -> Result<Settlement, SettlementError> {
        let existing = self.get(id).await?;
        if existing.is_approved() {
            return Err(SettlementError::AlreadyApproved(id));
        }
        self.compute_settlement(
            existing.party,
            existing.period.start,
            existing.period.end,
            existing.previous_settlement_id,
        )
        .await
    }

    /// Approves a draft on behalf of `approver`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `AlreadyApproved`.
    #[instrument(skip(self), fields(settlement = %id, approver = %approver))]
    pub async fn approve(
        &self,
        id: SettlementId,
        approver: UserId,
    ) -> Result<Settlement, SettlementError> {
        let approved = self.store.approve(id, approver, Utc::now()).await?;
        info!(
            party = %approved.party,
            closing = %approved.closing_balance,
            "settlement approved"
        );
        Ok(approved)
    }

    /// Gets a settlement by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn get(&self, id: SettlementId) -> Result<Settlement, SettlementError> {
        self.store
            .get(id)
            .await?
            .ok_or(SettlementError::NotFound(id))
    }

    /// The settlement with the latest period end for `party`.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn latest_for_party(
        &self,
        party: PartyRef,
    ) -> Result<Option<Settlement>, SettlementError> {
        self.store.latest_for_party(party).await
    }
}
