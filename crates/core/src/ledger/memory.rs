//! In-memory ledger store.
//!
//! All operations run under one mutex, so concurrent postings for the same
//! key serialize and the last writer wins.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use tally_shared::types::{BatchId, EntryId};
use tokio::sync::Mutex;

use super::error::LedgerError;
use super::store::LedgerStore;
use super::types::{Account, GlBatch, GlEntry, PostedBatch, PostingRequest, SourceKey};
use super::validation::check_accounts;
use crate::party::PartyRef;
use crate::timeline::EventWindow;

/// Formats a batch sequence number as a human-readable code.
#[must_use]
pub fn batch_code(seq: i64) -> String {
    format!("GL-{seq:06}")
}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<String, Account>,
    batches: BTreeMap<BatchId, PostedBatch>,
    by_key: HashMap<SourceKey, BatchId>,
    last_batch_id: i64,
    last_entry_id: i64,
}

impl LedgerState {
    fn next_batch_id(&mut self) -> BatchId {
        self.last_batch_id += 1;
        BatchId::new(self.last_batch_id)
    }

    fn next_entry_id(&mut self) -> EntryId {
        self.last_entry_id += 1;
        EntryId::new(self.last_entry_id)
    }
}

/// Ledger store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with a chart of accounts.
    #[must_use]
    pub fn with_accounts<I>(accounts: I) -> Self
    where
        I: IntoIterator<Item = Account>,
    {
        let state = LedgerState {
            accounts: accounts.into_iter().map(|a| (a.code.clone(), a)).collect(),
            ..LedgerState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Number of batches held.
    pub async fn batch_count(&self) -> usize {
        self.state.lock().await.batches.len()
    }

    /// Number of entry rows held across all batches.
    pub async fn entry_count(&self) -> usize {
        self.state
            .lock()
            .await
            .batches
            .values()
            .map(|b| b.entries.len())
            .sum()
    }
}

#[async_trait::async_trait]
impl LedgerStore for InMemoryLedger {
    async fn find_account(&self, code: &str) -> Result<Option<Account>, LedgerError> {
        Ok(self.state.lock().await.accounts.get(code).cloned())
    }

    async fn upsert_account(&self, account: Account) -> Result<Account, LedgerError> {
        let mut state = self.state.lock().await;
        state.accounts.insert(account.code.clone(), account.clone());
        Ok(account)
    }

    async fn replace_batch(&self, request: &PostingRequest) -> Result<PostedBatch, LedgerError> {
        let mut state = self.state.lock().await;
        check_accounts(&request.lines, &state.accounts)?;

        let now = Utc::now();
        let existing = state
            .by_key
            .get(&request.key)
            .and_then(|id| state.batches.get(id))
            .map(|b| b.batch.clone());

        let replaced = existing.is_some();
        let batch = match existing {
            Some(previous) => GlBatch {
                currency: request.currency.clone(),
                memo: request.memo.clone(),
                counterparty: request.counterparty,
                fx_audit: request.fx_audit.clone(),
                updated_at: now,
                ..previous
            },
            None => {
                let id = state.next_batch_id();
                GlBatch {
                    id,
                    key: request.key.clone(),
                    currency: request.currency.clone(),
                    memo: request.memo.clone(),
                    counterparty: request.counterparty,
                    code: batch_code(id.into_inner()),
                    fx_audit: request.fx_audit.clone(),
                    created_at: now,
                    updated_at: now,
                }
            }
        };

        let entries = request
            .lines
            .iter()
            .map(|line| GlEntry {
                id: state.next_entry_id(),
                batch_id: batch.id,
                account_code: line.account_code.clone(),
                debit: line.debit,
                credit: line.credit,
            })
            .collect();

        let posted = PostedBatch {
            batch,
            entries,
            replaced,
        };
        state.by_key.insert(request.key.clone(), posted.batch.id);
        state.batches.insert(posted.batch.id, posted.clone());
        Ok(posted)
    }

    async fn find_batch(&self, key: &SourceKey) -> Result<Option<PostedBatch>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .by_key
            .get(key)
            .and_then(|id| state.batches.get(id))
            .map(|b| PostedBatch {
                replaced: false,
                ..b.clone()
            }))
    }

    async fn delete_batch(&self, key: &SourceKey) -> Result<bool, LedgerError> {
        let mut state = self.state.lock().await;
        let Some(id) = state.by_key.remove(key) else {
            return Ok(false);
        };
        Ok(state.batches.remove(&id).is_some())
    }

    async fn batches_for_party(
        &self,
        party: PartyRef,
        window: EventWindow,
    ) -> Result<Vec<PostedBatch>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .batches
            .values()
            .filter(|b| b.batch.counterparty == Some(party) && window.contains(b.batch.created_at))
            .map(|b| PostedBatch {
                replaced: false,
                ..b.clone()
            })
            .collect())
    }
}
