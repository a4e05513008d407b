//! Settlement repository over PostgreSQL.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tally_core::party::PartyRef;
use tally_core::settlement::{
    Obligations, Payments, Rights, Settlement, SettlementDraft, SettlementError, SettlementPeriod,
    SettlementStatus, SettlementStore,
};
use tally_shared::types::{SettlementId, UserId};
use tracing::warn;

use super::mapping::{is_unique_violation, to_utc};
use crate::entities::sea_orm_active_enums::PartyKind;
use crate::entities::settlements;

fn storage(err: impl std::fmt::Display) -> SettlementError {
    SettlementError::Storage(err.to_string())
}

/// Settlement repository implementing [`SettlementStore`].
#[derive(Debug, Clone)]
pub struct SettlementRepository {
    db: DatabaseConnection,
}

impl SettlementRepository {
    /// Creates a new settlement repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Writes the draft. `Ok(None)` means a concurrent insert for the same
    /// period won the race.
    async fn write_draft(
        &self,
        draft: &SettlementDraft,
    ) -> Result<Option<Settlement>, SettlementError> {
        let txn = self.db.begin().await.map_err(storage)?;

        let existing = settlements::Entity::find()
            .filter(settlements::Column::EntityType.eq(PartyKind::from(draft.party.kind)))
            .filter(settlements::Column::EntityId.eq(draft.party.id))
            .filter(settlements::Column::PeriodStart.eq(draft.period.start))
            .filter(settlements::Column::PeriodEnd.eq(draft.period.end))
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(storage)?;

        let model = match existing {
            Some(row) if row.is_approved => {
                return Err(SettlementError::AlreadyApproved(SettlementId::new(row.id)));
            }
            Some(row) => {
                let mut active: settlements::ActiveModel = row.into();
                apply_draft(&mut active, draft);
                active.update(&txn).await.map_err(storage)?
            }
            None => match insert_draft(&txn, draft).await {
                Ok(model) => model,
                Err(err) if is_unique_violation(&err) => return Ok(None),
                Err(err) => return Err(storage(err)),
            },
        };

        txn.commit().await.map_err(storage)?;
        settlement_from_model(model).map(Some)
    }
}

async fn insert_draft(
    txn: &DatabaseTransaction,
    draft: &SettlementDraft,
) -> Result<settlements::Model, sea_orm::DbErr> {
    let mut active = settlements::ActiveModel {
        entity_type: Set(draft.party.kind.into()),
        entity_id: Set(draft.party.id),
        period_start: Set(draft.period.start),
        period_end: Set(draft.period.end),
        is_approved: Set(false),
        approved_by: Set(None),
        approved_at: Set(None),
        ..Default::default()
    };
    apply_draft(&mut active, draft);
    active.insert(txn).await
}

fn apply_draft(active: &mut settlements::ActiveModel, draft: &SettlementDraft) {
    let SettlementDraft {
        rights,
        obligations,
        payments,
        ..
    } = draft;

    active.previous_settlement_id = Set(draft.previous_settlement_id.map(SettlementId::into_inner));
    active.opening_balance = Set(draft.opening_balance);
    active.rights_inventory = Set(rights.inventory);
    active.rights_sales_share = Set(rights.sales_share);
    active.rights_pre_orders = Set(rights.pre_orders);
    active.rights_exchange = Set(rights.exchange);
    active.rights_services_rendered = Set(rights.services_rendered);
    active.rights_returns = Set(rights.returns);
    active.rights_total = Set(rights.total());
    active.obligations_sales = Set(obligations.sales);
    active.obligations_services = Set(obligations.services);
    active.obligations_damaged_goods = Set(obligations.damaged_goods);
    active.obligations_expense_charge_backs = Set(obligations.expense_charge_backs);
    active.obligations_returns = Set(obligations.returns);
    active.obligations_total = Set(obligations.total());
    active.payments_in = Set(payments.ins);
    active.payments_out = Set(payments.outs);
    active.payments_net = Set(payments.net());
    active.adjustments = Set(draft.adjustments);
    active.closing_balance = Set(draft.closing_balance);
    active.computed_at = Set(draft.computed_at.into());
}

fn settlement_from_model(model: settlements::Model) -> Result<Settlement, SettlementError> {
    let status = match (model.is_approved, model.approved_by, model.approved_at) {
        (false, _, _) => SettlementStatus::Draft,
        (true, Some(by), Some(at)) => SettlementStatus::Approved {
            approved_by: UserId::from_uuid(by),
            approved_at: to_utc(at),
        },
        (true, _, _) => {
            return Err(storage(format!(
                "settlement {} is approved without approver",
                model.id
            )));
        }
    };

    Ok(Settlement {
        id: SettlementId::new(model.id),
        party: PartyRef::new(model.entity_type.into(), model.entity_id),
        previous_settlement_id: model.previous_settlement_id.map(SettlementId::new),
        period: SettlementPeriod::new(model.period_start, model.period_end)?,
        opening_balance: model.opening_balance,
        rights: Rights {
            inventory: model.rights_inventory,
            sales_share: model.rights_sales_share,
            pre_orders: model.rights_pre_orders,
            exchange: model.rights_exchange,
            services_rendered: model.rights_services_rendered,
            returns: model.rights_returns,
        },
        obligations: Obligations {
            sales: model.obligations_sales,
            services: model.obligations_services,
            damaged_goods: model.obligations_damaged_goods,
            expense_charge_backs: model.obligations_expense_charge_backs,
            returns: model.obligations_returns,
        },
        payments: Payments {
            ins: model.payments_in,
            outs: model.payments_out,
        },
        adjustments: model.adjustments,
        closing_balance: model.closing_balance,
        status,
        computed_at: to_utc(model.computed_at),
    })
}

#[async_trait::async_trait]
impl SettlementStore for SettlementRepository {
    async fn get(&self, id: SettlementId) -> Result<Option<Settlement>, SettlementError> {
        settlements::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(storage)?
            .map(settlement_from_model)
            .transpose()
    }

    async fn latest_for_party(
        &self,
        party: PartyRef,
    ) -> Result<Option<Settlement>, SettlementError> {
        settlements::Entity::find()
            .filter(settlements::Column::EntityType.eq(PartyKind::from(party.kind)))
            .filter(settlements::Column::EntityId.eq(party.id))
            .order_by_desc(settlements::Column::PeriodEnd)
            .order_by_desc(settlements::Column::Id)
            .one(&self.db)
            .await
            .map_err(storage)?
            .map(settlement_from_model)
            .transpose()
    }

    async fn save_draft(&self, draft: SettlementDraft) -> Result<Settlement, SettlementError> {
        if let Some(saved) = self.write_draft(&draft).await? {
            return Ok(saved);
        }
        warn!(party = %draft.party, "concurrent settlement insert, retrying as replace");
        self.write_draft(&draft)
            .await?
            .ok_or_else(|| storage("settlement insert conflicted twice"))
    }

    async fn approve(
        &self,
        id: SettlementId,
        approved_by: UserId,
        approved_at: DateTime<Utc>,
    ) -> Result<Settlement, SettlementError> {
        let txn = self.db.begin().await.map_err(storage)?;
        let row = settlements::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(storage)?
            .ok_or(SettlementError::NotFound(id))?;
        if row.is_approved {
            return Err(SettlementError::AlreadyApproved(id));
        }

        let mut active: settlements::ActiveModel = row.into();
        active.is_approved = Set(true);
        active.approved_by = Set(Some(approved_by.into_inner()));
        active.approved_at = Set(Some(approved_at.into()));
        let model = active.update(&txn).await.map_err(storage)?;
        txn.commit().await.map_err(storage)?;

        settlement_from_model(model)
    }
}
