//! `SeaORM` Entity for gl_batches table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::PartyKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "gl_batches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub source_type: String,
    pub source_id: i64,
    pub purpose: String,
    pub currency: String,
    pub memo: String,
    pub entity_type: Option<PartyKind>,
    pub entity_id: Option<i64>,
    #[sea_orm(unique)]
    pub code: String,
    pub fx_audit: Option<Json>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::gl_entries::Entity")]
    GlEntries,
}

impl Related<super::gl_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GlEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
