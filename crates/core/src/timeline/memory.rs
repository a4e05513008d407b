//! In-memory document feed and party directory.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::documents::SourceDocument;
use super::error::TimelineError;
use super::events::EventWindow;
use super::service::{DocumentFeed, PartyDirectory};
use crate::party::{PartyBalances, PartyRef};

/// Documents held per party. Ignores the window; the service filters events.
#[derive(Debug, Default)]
pub struct InMemoryFeed {
    documents: RwLock<HashMap<PartyRef, Vec<SourceDocument>>>,
}

impl InMemoryFeed {
    /// Creates an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document for `party`.
    pub async fn push(&self, party: PartyRef, document: SourceDocument) {
        self.documents
            .write()
            .await
            .entry(party)
            .or_default()
            .push(document);
    }
}

#[async_trait::async_trait]
impl DocumentFeed for InMemoryFeed {
    async fn documents(
        &self,
        party: PartyRef,
        _window: EventWindow,
    ) -> Result<Vec<SourceDocument>, TimelineError> {
        Ok(self
            .documents
            .read()
            .await
            .get(&party)
            .cloned()
            .unwrap_or_default())
    }
}

/// Party balance fields held in memory.
#[derive(Debug, Default)]
pub struct InMemoryParties {
    parties: RwLock<HashMap<PartyRef, PartyBalances>>,
}

impl InMemoryParties {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a party with its opening and cached balances.
    pub async fn insert(&self, party: PartyRef, opening_balance: Decimal, cached_balance: Decimal) {
        self.parties.write().await.insert(
            party,
            PartyBalances {
                party,
                opening_balance,
                cached_balance,
            },
        );
    }
}

#[async_trait::async_trait]
impl PartyDirectory for InMemoryParties {
    async fn balances(&self, party: PartyRef) -> Result<Option<PartyBalances>, TimelineError> {
        Ok(self.parties.read().await.get(&party).cloned())
    }

    async fn set_cached_balance(
        &self,
        party: PartyRef,
        balance: Decimal,
    ) -> Result<(), TimelineError> {
        let mut parties = self.parties.write().await;
        let record = parties
            .get_mut(&party)
            .ok_or(TimelineError::PartyNotFound(party))?;
        record.cached_balance = balance;
        Ok(())
    }
}
