//! Ledger posting service.
//!
//! Validates a posting request and hands it to the store for an atomic
//! insert-or-replace by natural key. Validation failures persist nothing.

use std::sync::Arc;

use rust_decimal::Decimal;
use tally_shared::LedgerConfig;
use tracing::{info, instrument};

use super::error::LedgerError;
use super::store::LedgerStore;
use super::types::{BatchTotals, PostedBatch, PostingRequest, SourceKey};
use super::validation::validate_lines;
use crate::party::PartyRef;
use crate::timeline::EventWindow;

/// Posting service over a ledger store.
pub struct PostingService<S: LedgerStore> {
    store: Arc<S>,
    tolerance: Decimal,
}

impl<S: LedgerStore> Clone for PostingService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tolerance: self.tolerance,
        }
    }
}

impl<S: LedgerStore> PostingService<S> {
    /// Creates a new posting service.
    #[must_use]
    pub fn new(store: Arc<S>, tolerance: Decimal) -> Self {
        Self { store, tolerance }
    }

    /// Creates a posting service using the configured balance tolerance.
    #[must_use]
    pub fn from_config(store: Arc<S>, config: &LedgerConfig) -> Self {
        Self::new(store, config.balance_tolerance)
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Creates or replaces the batch for `request.key`.
    ///
    /// Posting the same key again replaces the previous entries and keeps
    /// the batch id and code.
    ///
    /// # Errors
    ///
    /// Returns a validation error (`EmptyBatch`, `NegativeAmount`,
    /// `InvalidEntrySide`, `ExcessPrecision`, `Unbalanced`), an account error
    /// (`AccountNotFound`, `AccountInactive`) or a storage error.
    #[instrument(skip(self, request), fields(key = %request.key))]
    pub async fn post(&self, request: PostingRequest) -> Result<PostedBatch, LedgerError> {
        let totals = validate_lines(&request.lines, self.tolerance)?;
        let posted = self.store.replace_batch(&request).await?;

        info!(
            code = %posted.batch.code,
            debit = %totals.debit,
            entries = posted.entries.len(),
            replaced = posted.replaced,
            "batch posted"
        );
        Ok(posted)
    }

    /// Deletes the batch for a source document that was reversed.
    ///
    /// Returns false if nothing was posted for the key.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn reverse(&self, key: &SourceKey) -> Result<bool, LedgerError> {
        let deleted = self.store.delete_batch(key).await?;
        if deleted {
            info!("batch reversed");
        }
        Ok(deleted)
    }

    /// Finds the batch for a natural key.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn find(&self, key: &SourceKey) -> Result<Option<PostedBatch>, LedgerError> {
        self.store.find_batch(key).await
    }

    /// Lists batches whose counterparty is `party`, created inside `window`.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn batches_for_party(
        &self,
        party: PartyRef,
        window: EventWindow,
    ) -> Result<Vec<PostedBatch>, LedgerError> {
        self.store.batches_for_party(party, window).await
    }

    /// Re-checks that a persisted batch balances.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Unbalanced` if it does not.
    pub fn verify_batch_balanced(&self, batch: &PostedBatch) -> Result<BatchTotals, LedgerError> {
        let totals = batch.totals();
        if totals.is_balanced(self.tolerance) {
            Ok(totals)
        } else {
            Err(LedgerError::Unbalanced {
                debit: totals.debit,
                credit: totals.credit,
            })
        }
    }
}
