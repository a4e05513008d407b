//! Currency conversion and ledger rounding.
//!
//! Converted amounts are rounded half to even at a fixed precision. Postings
//! keep the original amount and rate in their FX audit.

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Decimal places kept for converted ledger amounts.
pub const LEDGER_DECIMAL_PLACES: u32 = 4;

/// Converts an amount to ledger precision (4 decimal places).
///
/// ```
/// use rust_decimal_macros::dec;
/// use tally_core::currency::convert;
///
/// assert_eq!(convert(dec!(100), dec!(1.5)), dec!(150.0000));
/// ```
#[must_use]
pub fn convert(amount: Decimal, rate: Decimal) -> Decimal {
    round_ledger(amount * rate)
}

/// Rounds a value to ledger precision with banker's rounding.
#[must_use]
pub fn round_ledger(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(LEDGER_DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven)
}
