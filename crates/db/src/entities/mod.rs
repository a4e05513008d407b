//! `SeaORM` entity definitions for the ledger tables.

pub mod prelude;

pub mod accounts;
pub mod exchange_rates;
pub mod gl_batches;
pub mod gl_entries;
pub mod sea_orm_active_enums;
pub mod settlements;
