//! Entity re-exports.

pub use super::accounts::Entity as Accounts;
pub use super::exchange_rates::Entity as ExchangeRates;
pub use super::gl_batches::Entity as GlBatches;
pub use super::gl_entries::Entity as GlEntries;
pub use super::settlements::Entity as Settlements;
