//! `SeaORM` Entity for gl_entries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "gl_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub batch_id: i64,
    pub account_code: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub debit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub credit: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::gl_batches::Entity",
        from = "Column::BatchId",
        to = "super::gl_batches::Column::Id",
        on_delete = "Cascade"
    )]
    GlBatches,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountCode",
        to = "super::accounts::Column::Code"
    )]
    Accounts,
}

impl Related<super::gl_batches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GlBatches.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
