//! General-ledger repository over PostgreSQL.
//!
//! Each posting is one database transaction. The batch row is locked by
//! natural key before its entries are replaced; the unique index on
//! `(source_type, source_id, purpose)` catches a concurrent first insert,
//! which is retried once as a replace. A second collision surfaces as
//! `ConcurrentModification`.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, Statement,
    TransactionTrait,
};
use tally_core::ledger::{
    Account, GlBatch, GlEntry, LedgerError, LedgerStore, PostedBatch, PostingRequest, SourceKey,
    batch_code, check_accounts, referenced_codes,
};
use tally_core::party::PartyRef;
use tally_core::timeline::EventWindow;
use tally_shared::types::{BatchId, CurrencyCode, EntryId};
use tracing::{debug, warn};

use super::mapping::{is_unique_violation, party_from_columns, to_utc};
use crate::entities::sea_orm_active_enums::PartyKind;
use crate::entities::{accounts, gl_batches, gl_entries};

fn storage(err: impl std::fmt::Display) -> LedgerError {
    LedgerError::Storage(err.to_string())
}

/// A key collision on the retried write means another writer still holds it.
fn after_retry(err: LedgerError) -> LedgerError {
    match err {
        LedgerError::DuplicatePosting(key) => {
            warn!(%key, "posting still contended after retry");
            LedgerError::ConcurrentModification
        }
        other => other,
    }
}

/// Ledger repository implementing [`LedgerStore`].
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn write_batch(&self, request: &PostingRequest) -> Result<PostedBatch, LedgerError> {
        let txn = self.db.begin().await.map_err(storage)?;

        let known = accounts::Entity::find()
            .filter(accounts::Column::Code.is_in(referenced_codes(&request.lines)))
            .lock_shared()
            .all(&txn)
            .await
            .map_err(storage)?
            .into_iter()
            .map(|m| (m.code.clone(), account_from_model(m)))
            .collect::<HashMap<_, _>>();
        check_accounts(&request.lines, &known)?;

        let existing = by_key(&request.key)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(storage)?;

        let replaced = existing.is_some();
        let header = match existing {
            Some(model) => update_header(&txn, model, request).await?,
            None => insert_header(&txn, request).await?,
        };

        let mut entries = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let entry = gl_entries::ActiveModel {
                batch_id: Set(header.id),
                account_code: Set(line.account_code.clone()),
                debit: Set(line.debit),
                credit: Set(line.credit),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(storage)?;
            entries.push(entry_from_model(entry));
        }

        txn.commit().await.map_err(storage)?;

        Ok(PostedBatch {
            batch: batch_from_model(header)?,
            entries,
            replaced,
        })
    }

    async fn load_entries(&self, batch_id: i64) -> Result<Vec<GlEntry>, LedgerError> {
        Ok(gl_entries::Entity::find()
            .filter(gl_entries::Column::BatchId.eq(batch_id))
            .order_by_asc(gl_entries::Column::Id)
            .all(&self.db)
            .await
            .map_err(storage)?
            .into_iter()
            .map(entry_from_model)
            .collect())
    }
}

fn by_key(key: &SourceKey) -> sea_orm::Select<gl_batches::Entity> {
    gl_batches::Entity::find()
        .filter(gl_batches::Column::SourceType.eq(key.source_type.as_str()))
        .filter(gl_batches::Column::SourceId.eq(key.source_id))
        .filter(gl_batches::Column::Purpose.eq(key.purpose.as_str()))
}

fn fx_audit_json(request: &PostingRequest) -> Result<Option<serde_json::Value>, LedgerError> {
    request
        .fx_audit
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(storage)
}

async fn insert_header(
    txn: &DatabaseTransaction,
    request: &PostingRequest,
) -> Result<gl_batches::Model, LedgerError> {
    let seq = txn
        .query_one(Statement::from_string(
            DbBackend::Postgres,
            "SELECT nextval('gl_batch_code_seq') AS seq",
        ))
        .await
        .map_err(storage)?
        .ok_or_else(|| storage("gl_batch_code_seq returned no row"))?
        .try_get::<i64>("", "seq")
        .map_err(storage)?;

    let now = Utc::now().into();
    let model = gl_batches::ActiveModel {
        source_type: Set(request.key.source_type.clone()),
        source_id: Set(request.key.source_id),
        purpose: Set(request.key.purpose.clone()),
        currency: Set(request.currency.as_str().to_string()),
        memo: Set(request.memo.clone()),
        entity_type: Set(request.counterparty.map(|p| PartyKind::from(p.kind))),
        entity_id: Set(request.counterparty.map(|p| p.id)),
        code: Set(batch_code(seq)),
        fx_audit: Set(fx_audit_json(request)?),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    model.insert(txn).await.map_err(|err| {
        if is_unique_violation(&err) {
            LedgerError::DuplicatePosting(request.key.clone())
        } else {
            storage(err)
        }
    })
}

async fn update_header(
    txn: &DatabaseTransaction,
    existing: gl_batches::Model,
    request: &PostingRequest,
) -> Result<gl_batches::Model, LedgerError> {
    gl_entries::Entity::delete_many()
        .filter(gl_entries::Column::BatchId.eq(existing.id))
        .exec(txn)
        .await
        .map_err(storage)?;

    let mut model: gl_batches::ActiveModel = existing.into();
    model.currency = Set(request.currency.as_str().to_string());
    model.memo = Set(request.memo.clone());
    model.entity_type = Set(request.counterparty.map(|p| PartyKind::from(p.kind)));
    model.entity_id = Set(request.counterparty.map(|p| p.id));
    model.fx_audit = Set(fx_audit_json(request)?);
    model.updated_at = Set(Utc::now().into());
    model.update(txn).await.map_err(storage)
}

fn account_from_model(model: accounts::Model) -> Account {
    Account {
        code: model.code,
        name: model.name,
        class: model.class.into(),
        parent_code: model.parent_code,
        is_active: model.is_active,
    }
}

fn entry_from_model(model: gl_entries::Model) -> GlEntry {
    GlEntry {
        id: EntryId::new(model.id),
        batch_id: BatchId::new(model.batch_id),
        account_code: model.account_code,
        debit: model.debit,
        credit: model.credit,
    }
}

fn batch_from_model(model: gl_batches::Model) -> Result<GlBatch, LedgerError> {
    let fx_audit = model
        .fx_audit
        .map(serde_json::from_value)
        .transpose()
        .map_err(storage)?;

    Ok(GlBatch {
        id: BatchId::new(model.id),
        key: SourceKey::new(model.source_type, model.source_id, model.purpose),
        currency: CurrencyCode::parse(&model.currency).map_err(storage)?,
        memo: model.memo,
        counterparty: party_from_columns(model.entity_type, model.entity_id),
        code: model.code,
        fx_audit,
        created_at: to_utc(model.created_at),
        updated_at: to_utc(model.updated_at),
    })
}

#[async_trait::async_trait]
impl LedgerStore for LedgerRepository {
    async fn find_account(&self, code: &str) -> Result<Option<Account>, LedgerError> {
        Ok(accounts::Entity::find_by_id(code)
            .one(&self.db)
            .await
            .map_err(storage)?
            .map(account_from_model))
    }

    async fn upsert_account(&self, account: Account) -> Result<Account, LedgerError> {
        let model = accounts::ActiveModel {
            code: Set(account.code.clone()),
            name: Set(account.name.clone()),
            class: Set(account.class.into()),
            parent_code: Set(account.parent_code.clone()),
            is_active: Set(account.is_active),
        };
        accounts::Entity::insert(model)
            .on_conflict(
                OnConflict::column(accounts::Column::Code)
                    .update_columns([
                        accounts::Column::Name,
                        accounts::Column::Class,
                        accounts::Column::ParentCode,
                        accounts::Column::IsActive,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(storage)?;
        Ok(account)
    }

    async fn replace_batch(&self, request: &PostingRequest) -> Result<PostedBatch, LedgerError> {
        match self.write_batch(request).await {
            Err(LedgerError::DuplicatePosting(key)) => {
                warn!(%key, "concurrent first posting, retrying as replace");
                self.write_batch(request).await.map_err(after_retry)
            }
            result => result,
        }
    }

    async fn find_batch(&self, key: &SourceKey) -> Result<Option<PostedBatch>, LedgerError> {
        let Some(header) = by_key(key).one(&self.db).await.map_err(storage)? else {
            return Ok(None);
        };
        let entries = self.load_entries(header.id).await?;
        Ok(Some(PostedBatch {
            batch: batch_from_model(header)?,
            entries,
            replaced: false,
        }))
    }

    async fn delete_batch(&self, key: &SourceKey) -> Result<bool, LedgerError> {
        let result = gl_batches::Entity::delete_many()
            .filter(gl_batches::Column::SourceType.eq(key.source_type.as_str()))
            .filter(gl_batches::Column::SourceId.eq(key.source_id))
            .filter(gl_batches::Column::Purpose.eq(key.purpose.as_str()))
            .exec(&self.db)
            .await
            .map_err(storage)?;
        debug!(%key, rows = result.rows_affected, "batch delete");
        Ok(result.rows_affected > 0)
    }

    async fn batches_for_party(
        &self,
        party: PartyRef,
        window: EventWindow,
    ) -> Result<Vec<PostedBatch>, LedgerError> {
        let mut select = gl_batches::Entity::find()
            .filter(gl_batches::Column::EntityType.eq(PartyKind::from(party.kind)))
            .filter(gl_batches::Column::EntityId.eq(party.id));
        if let Some(from) = window.from {
            select = select.filter(gl_batches::Column::CreatedAt.gte(from));
        }
        if let Some(until) = window.until {
            select = select.filter(gl_batches::Column::CreatedAt.lt(until));
        }

        let rows = select
            .order_by_asc(gl_batches::Column::Id)
            .find_with_related(gl_entries::Entity)
            .all(&self.db)
            .await
            .map_err(storage)?;

        rows.into_iter()
            .map(|(header, entries)| {
                let mut entries: Vec<GlEntry> = entries.into_iter().map(entry_from_model).collect();
                entries.sort_by_key(|e| e.id);
                Ok(PostedBatch {
                    batch: batch_from_model(header)?,
                    entries,
                    replaced: false,
                })
            })
            .collect()
    }
}
