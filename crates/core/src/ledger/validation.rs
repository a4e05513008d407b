//! Business rule validation for ledger postings.

use std::collections::HashMap;

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{Account, BatchTotals, EntryLine};
use crate::currency::conversion::LEDGER_DECIMAL_PLACES;

/// Validates the shape and balance of a set of posting lines.
///
/// Rules, checked in order:
/// 1. At least one line
/// 2. No negative amounts
/// 3. Exactly one side non-zero per line
/// 4. At most 4 decimal places per amount
/// 5. Debits equal credits within `tolerance`
///
/// # Errors
///
/// Returns the first violated rule.
pub fn validate_lines(lines: &[EntryLine], tolerance: Decimal) -> Result<BatchTotals, LedgerError> {
    if lines.is_empty() {
        return Err(LedgerError::EmptyBatch);
    }

    for line in lines {
        if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount(line.account_code.clone()));
        }
        if line.debit.is_zero() == line.credit.is_zero() {
            return Err(LedgerError::InvalidEntrySide(line.account_code.clone()));
        }
        if exceeds_ledger_precision(line.debit) || exceeds_ledger_precision(line.credit) {
            return Err(LedgerError::ExcessPrecision(line.account_code.clone()));
        }
    }

    let totals = BatchTotals::from_amounts(lines.iter().map(|l| (l.debit, l.credit)));
    if !totals.is_balanced(tolerance) {
        return Err(LedgerError::Unbalanced {
            debit: totals.debit,
            credit: totals.credit,
        });
    }

    Ok(totals)
}

fn exceeds_ledger_precision(amount: Decimal) -> bool {
    amount.normalize().scale() > LEDGER_DECIMAL_PLACES
}

/// Checks that every referenced account exists and is active.
///
/// # Errors
///
/// Returns `AccountNotFound` or `AccountInactive` for the first offending line.
pub fn check_accounts(
    lines: &[EntryLine],
    accounts: &HashMap<String, Account>,
) -> Result<(), LedgerError> {
    for line in lines {
        match accounts.get(&line.account_code) {
            None => return Err(LedgerError::AccountNotFound(line.account_code.clone())),
            Some(account) if !account.is_active => {
                return Err(LedgerError::AccountInactive(line.account_code.clone()));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Distinct account codes referenced by `lines`, sorted.
#[must_use]
pub fn referenced_codes(lines: &[EntryLine]) -> Vec<String> {
    let mut codes: Vec<String> = lines.iter().map(|l| l.account_code.clone()).collect();
    codes.sort();
    codes.dedup();
    codes
}
