//! Property-based tests for posting validation.
//!
//! - Balanced line sets are accepted and persist balanced
//! - Line sets unbalanced beyond tolerance are rejected and persist nothing
//! - Negative amounts are always rejected

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_shared::types::CurrencyCode;

use super::error::LedgerError;
use super::memory::InMemoryLedger;
use super::service::PostingService;
use super::types::{Account, AccountClass, EntryLine, PostingRequest, SourceKey};
use super::validation::validate_lines;

const TOLERANCE: Decimal = dec!(0.01);

/// Strategy to generate a valid positive amount (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a negative amount.
fn negative_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(-cents, 2))
}

/// Debit lines spread over a few accounts, balanced by one credit.
fn balanced_lines() -> impl Strategy<Value = Vec<EntryLine>> {
    prop::collection::vec((0usize..3, positive_amount()), 1..10).prop_map(|debits| {
        let accounts = ["1000", "1200", "5000"];
        let total: Decimal = debits.iter().map(|(_, a)| *a).sum();
        let mut lines: Vec<EntryLine> = debits
            .into_iter()
            .map(|(i, amount)| EntryLine::debit(accounts[i], amount))
            .collect();
        lines.push(EntryLine::credit("4000", total));
        lines
    })
}

fn chart() -> Vec<Account> {
    vec![
        Account::new("1000", "Cash", AccountClass::Asset),
        Account::new("1200", "Receivables", AccountClass::Asset),
        Account::new("4000", "Sales", AccountClass::Revenue),
        Account::new("5000", "Cost of Sales", AccountClass::Expense),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any balanced set of lines validates with matching totals.
    #[test]
    fn prop_balanced_lines_accepted(lines in balanced_lines()) {
        let totals = validate_lines(&lines, TOLERANCE).unwrap();
        prop_assert_eq!(totals.debit, totals.credit);
    }

    /// Skewing one side beyond tolerance is always rejected.
    #[test]
    fn prop_unbalanced_lines_rejected(lines in balanced_lines(), skew in positive_amount()) {
        let mut lines = lines;
        let last = lines.len() - 1;
        lines[last].credit += skew;

        let result = validate_lines(&lines, TOLERANCE);
        prop_assert!(
            matches!(result, Err(LedgerError::Unbalanced { .. })),
            "Skewed lines should be rejected, got: {:?}",
            result
        );
    }

    /// A negative amount on any line is rejected.
    #[test]
    fn prop_negative_amount_rejected(lines in balanced_lines(), negative in negative_amount()) {
        let mut lines = lines;
        lines[0].debit = negative;
        prop_assert!(matches!(
            validate_lines(&lines, TOLERANCE),
            Err(LedgerError::NegativeAmount(_))
        ));
    }

    /// Whatever is posted, every persisted batch balances, and reposting the
    /// same key leaves exactly the latest entries.
    #[test]
    fn prop_persisted_batches_balance(first in balanced_lines(), second in balanced_lines()) {
        let store = Arc::new(InMemoryLedger::with_accounts(chart()));
        let svc = PostingService::new(Arc::clone(&store), TOLERANCE);
        let usd = CurrencyCode::parse("USD").unwrap();
        let key = SourceKey::new("INVOICE", 1, "ACCRUAL");
        let expected_entries = second.len();

        let found = runtime().block_on(async {
            svc.post(PostingRequest::new(key.clone(), usd.clone(), first)).await.unwrap();
            svc.post(PostingRequest::new(key.clone(), usd, second)).await.unwrap();
            svc.find(&key).await.unwrap().unwrap()
        });

        prop_assert!(svc.verify_batch_balanced(&found).is_ok());
        prop_assert_eq!(found.entries.len(), expected_entries);
        prop_assert_eq!(runtime().block_on(store.batch_count()), 1);
    }
}
