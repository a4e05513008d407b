//! Multi-currency handling and exchange rates.

pub mod conversion;
pub mod error;
pub mod exchange;
pub mod resolver;

#[cfg(test)]
mod props;

pub use conversion::{convert, round_ledger};
pub use error::FxError;
pub use exchange::{OnMissingRate, RateMethod, RateObservation, RateQuote, RateSource};
pub use resolver::FxResolver;
