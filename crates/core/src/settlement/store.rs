//! Settlement storage trait.

use chrono::{DateTime, Utc};
use tally_shared::types::{SettlementId, UserId};

use super::error::SettlementError;
use super::types::{Settlement, SettlementDraft};
use crate::party::PartyRef;

/// Persistence for settlements.
#[async_trait::async_trait]
pub trait SettlementStore: Send + Sync {
    /// Gets a settlement by id.
    async fn get(&self, id: SettlementId) -> Result<Option<Settlement>, SettlementError>;

    /// The settlement with the latest period end for `party`.
    async fn latest_for_party(
        &self,
        party: PartyRef,
    ) -> Result<Option<Settlement>, SettlementError>;

    /// Inserts a draft, or replaces the draft with the same party and period
    /// in place, keeping its id.
    ///
    /// Fails with `AlreadyApproved` if the existing row is approved.
    async fn save_draft(&self, draft: SettlementDraft) -> Result<Settlement, SettlementError>;

    /// Freezes a draft.
    ///
    /// Fails with `NotFound` or `AlreadyApproved`.
    async fn approve(
        &self,
        id: SettlementId,
        approved_by: UserId,
        approved_at: DateTime<Utc>,
    ) -> Result<Settlement, SettlementError>;
}
