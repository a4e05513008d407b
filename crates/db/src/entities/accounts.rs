//! `SeaORM` Entity for accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::AccountClass;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub name: String,
    pub class: AccountClass,
    pub parent_code: Option<String>,
    pub is_active: bool,
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
