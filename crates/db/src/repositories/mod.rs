//! Repository implementations for data access.
//!
//! Repositories implement the storage traits of `tally-core` over `SeaORM`,
//! hiding the database details from the domain services.

mod mapping;

pub mod exchange_rate;
pub mod ledger;
pub mod settlement;

pub use exchange_rate::{ExchangeRateError, ExchangeRateRepository};
pub use ledger::LedgerRepository;
pub use settlement::SettlementRepository;
