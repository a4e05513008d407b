//! Storage abstraction for batches and the chart of accounts.

use super::error::LedgerError;
use super::types::{Account, PostedBatch, PostingRequest, SourceKey};
use crate::party::PartyRef;
use crate::timeline::EventWindow;

/// Repository trait for ledger persistence.
///
/// Implemented by the db crate over PostgreSQL and by
/// [`InMemoryLedger`](super::memory::InMemoryLedger) for tests.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    /// Looks up one account by code.
    async fn find_account(&self, code: &str) -> Result<Option<Account>, LedgerError>;

    /// Inserts an account or replaces the one with the same code.
    async fn upsert_account(&self, account: Account) -> Result<Account, LedgerError>;

    /// Writes the batch for `request.key`, replacing the entries of an
    /// existing batch with the same key.
    ///
    /// Implementations must check every referenced account with
    /// [`check_accounts`](super::validation::check_accounts) inside the same
    /// atomic unit as the write, and persist nothing on failure. A replaced
    /// batch keeps its id and code.
    async fn replace_batch(&self, request: &PostingRequest) -> Result<PostedBatch, LedgerError>;

    /// Finds the batch for a natural key.
    async fn find_batch(&self, key: &SourceKey) -> Result<Option<PostedBatch>, LedgerError>;

    /// Deletes the batch and its entries. Returns false if none existed.
    async fn delete_batch(&self, key: &SourceKey) -> Result<bool, LedgerError>;

    /// Lists batches whose counterparty is `party` and whose `created_at`
    /// falls inside `window`, oldest first.
    async fn batches_for_party(
        &self,
        party: PartyRef,
        window: EventWindow,
    ) -> Result<Vec<PostedBatch>, LedgerError>;
}
