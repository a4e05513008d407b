//! In-memory settlement store.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use tally_shared::types::{SettlementId, UserId};
use tokio::sync::Mutex;

use super::error::SettlementError;
use super::store::SettlementStore;
use super::types::{Settlement, SettlementDraft};
use crate::party::PartyRef;

type NaturalKey = (PartyRef, NaiveDate, NaiveDate);

#[derive(Debug, Default)]
struct SettlementState {
    rows: BTreeMap<SettlementId, Settlement>,
    by_key: HashMap<NaturalKey, SettlementId>,
    last_id: i64,
}

/// Settlements held behind one mutex.
#[derive(Debug, Default)]
pub struct InMemorySettlements {
    state: Mutex<SettlementState>,
}

impl InMemorySettlements {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored settlements.
    pub async fn len(&self) -> usize {
        self.state.lock().await.rows.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.rows.is_empty()
    }
}

#[async_trait::async_trait]
impl SettlementStore for InMemorySettlements {
    async fn get(&self, id: SettlementId) -> Result<Option<Settlement>, SettlementError> {
        Ok(self.state.lock().await.rows.get(&id).cloned())
    }

    async fn latest_for_party(
        &self,
        party: PartyRef,
    ) -> Result<Option<Settlement>, SettlementError> {
        let state = self.state.lock().await;
        Ok(state
            .rows
            .values()
            .filter(|s| s.party == party)
            .max_by_key(|s| (s.period.end, s.id))
            .cloned())
    }

    async fn save_draft(&self, draft: SettlementDraft) -> Result<Settlement, SettlementError> {
        let mut state = self.state.lock().await;
        let key = (draft.party, draft.period.start, draft.period.end);

        let id = match state.by_key.get(&key).copied() {
            Some(id) => {
                if state.rows.get(&id).is_some_and(Settlement::is_approved) {
                    return Err(SettlementError::AlreadyApproved(id));
                }
                id
            }
            None => {
                state.last_id += 1;
                let id = SettlementId::new(state.last_id);
                state.by_key.insert(key, id);
                id
            }
        };

        let settlement = Settlement::from_draft(id, draft);
        state.rows.insert(id, settlement.clone());
        Ok(settlement)
    }

    async fn approve(
        &self,
        id: SettlementId,
        approved_by: UserId,
        approved_at: DateTime<Utc>,
    ) -> Result<Settlement, SettlementError> {
        let mut state = self.state.lock().await;
        let settlement = state
            .rows
            .get_mut(&id)
            .ok_or(SettlementError::NotFound(id))?;
        settlement.approve(approved_by, approved_at)?;
        Ok(settlement.clone())
    }
}
