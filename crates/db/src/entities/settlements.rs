//! `SeaORM` Entity for settlements table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::PartyKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "settlements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub entity_type: PartyKind,
    pub entity_id: i64,
    pub previous_settlement_id: Option<i64>,
    pub period_start: Date,
    pub period_end: Date,
    pub opening_balance: Decimal,
    pub rights_inventory: Decimal,
    pub rights_sales_share: Decimal,
    pub rights_pre_orders: Decimal,
    pub rights_exchange: Decimal,
    pub rights_services_rendered: Decimal,
    pub rights_returns: Decimal,
    pub rights_total: Decimal,
    pub obligations_sales: Decimal,
    pub obligations_services: Decimal,
    pub obligations_damaged_goods: Decimal,
    pub obligations_expense_charge_backs: Decimal,
    pub obligations_returns: Decimal,
    pub obligations_total: Decimal,
    pub payments_in: Decimal,
    pub payments_out: Decimal,
    pub payments_net: Decimal,
    pub adjustments: Decimal,
    pub closing_balance: Decimal,
    pub is_approved: bool,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub computed_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::PreviousSettlementId",
        to = "Column::Id"
    )]
    SelfRef,
}

impl ActiveModelBehavior for ActiveModel {}
