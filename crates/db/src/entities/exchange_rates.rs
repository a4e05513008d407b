//! `SeaORM` Entity for exchange_rates table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::RateSource;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "exchange_rates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub base_code: String,
    pub quote_code: String,
    #[sea_orm(column_type = "Decimal(Some((19, 10)))")]
    pub rate: Decimal,
    pub valid_from: DateTimeWithTimeZone,
    pub source: RateSource,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
