//! Party settlements.
//!
//! A settlement itemizes what a party is owed, what it owes and what was
//! paid over a period, and chains its closing balance into the next
//! period. Approved settlements are frozen.

pub mod calculator;
pub mod error;
pub mod memory;
pub mod service;
pub mod store;
pub mod types;

#[cfg(test)]
mod service_props;
#[cfg(test)]
mod tests;

pub use calculator::PeriodTotals;
pub use error::SettlementError;
pub use memory::InMemorySettlements;
pub use service::SettlementService;
pub use store::SettlementStore;
pub use types::{
    Obligations, Payments, Rights, Settlement, SettlementDraft, SettlementPeriod, SettlementStatus,
};
