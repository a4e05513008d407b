//! `SeaORM` active enums backed by PostgreSQL enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `account_class` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_class")]
pub enum AccountClass {
    /// Asset.
    #[sea_orm(string_value = "asset")]
    Asset,
    /// Liability.
    #[sea_orm(string_value = "liability")]
    Liability,
    /// Revenue.
    #[sea_orm(string_value = "revenue")]
    Revenue,
    /// Expense.
    #[sea_orm(string_value = "expense")]
    Expense,
    /// Equity.
    #[sea_orm(string_value = "equity")]
    Equity,
}

/// `party_kind` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "party_kind")]
pub enum PartyKind {
    /// Customer.
    #[sea_orm(string_value = "customer")]
    Customer,
    /// Supplier.
    #[sea_orm(string_value = "supplier")]
    Supplier,
    /// Partner.
    #[sea_orm(string_value = "partner")]
    Partner,
    /// Employee.
    #[sea_orm(string_value = "employee")]
    Employee,
}

/// `rate_source` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "rate_source")]
pub enum RateSource {
    /// Entered by an operator.
    #[sea_orm(string_value = "manual")]
    Manual,
    /// Imported from a feed.
    #[sea_orm(string_value = "external")]
    External,
}
