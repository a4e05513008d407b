//! Property-based tests for settlement chaining.
//!
//! - The opening balance of an approved chain's next period is the previous
//!   closing balance
//! - The last closing balance equals the full timeline replay

use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_shared::LedgerConfig;
use tally_shared::types::{CurrencyCode, UserId};

use super::memory::InMemorySettlements;
use super::service::SettlementService;
use crate::currency::{FxResolver, RateObservation};
use crate::ledger::InMemoryLedger;
use crate::party::PartyRef;
use crate::timeline::{
    BalanceService, DocumentHeader, ExpenseNature, InMemoryFeed, InMemoryParties, SourceDocument,
    TimelineConfig,
};

fn code(s: &str) -> CurrencyCode {
    CurrencyCode::parse(s).unwrap()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

/// Strategy to generate an amount (0.01 to 10,000.00).
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Documents on days 0..90 of 2025, in USD or EUR.
fn documents() -> impl Strategy<Value = Vec<SourceDocument>> {
    prop::collection::vec((0u8..6, amount(), 0i64..90, any::<bool>()), 0..30).prop_map(|rows| {
        rows.into_iter()
            .zip(1i64..)
            .map(|((kind, amount, day, eur), id)| {
                let currency = if eur { code("EUR") } else { code("USD") };
                let occurred_at = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap() + Duration::days(day);
                let header = DocumentHeader::confirmed(id, amount, currency, occurred_at);
                match kind {
                    0 => SourceDocument::Sale(header),
                    1 => SourceDocument::SaleReturn(header),
                    2 => SourceDocument::ServiceOrder(header),
                    3 => SourceDocument::PreOrder { header, online: true },
                    4 => SourceDocument::Expense {
                        header,
                        nature: ExpenseNature::ChargeBack,
                    },
                    _ => SourceDocument::InventoryReceipt(header),
                }
            })
            .collect()
    })
}

/// Month boundaries covering days 0..90.
fn months() -> [(NaiveDate, NaiveDate); 3] {
    let d = |m, d| NaiveDate::from_ymd_opt(2025, m, d).unwrap();
    [(d(1, 1), d(1, 31)), (d(2, 1), d(2, 28)), (d(3, 1), d(3, 31))]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_chain_continues_and_matches_timeline(docs in documents(), opening in amount()) {
        let party = PartyRef::customer(11);
        let fx = FxResolver::new(code("USD"));
        fx.record(RateObservation::new(
            code("EUR"),
            code("USD"),
            dec!(1.0850),
            Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap(),
        ))
        .unwrap();

        let rt = runtime();
        let (chain, running) = rt.block_on(async {
            let feed = Arc::new(InMemoryFeed::new());
            for doc in docs {
                feed.push(party, doc).await;
            }
            let parties = Arc::new(InMemoryParties::new());
            parties.insert(party, opening, opening).await;

            let balances = Arc::new(BalanceService::new(
                feed,
                parties,
                Arc::new(InMemoryLedger::new()),
                Arc::new(fx),
                TimelineConfig::from_ledger(&LedgerConfig::default()).unwrap(),
            ));
            let service = SettlementService::new(
                Arc::clone(&balances),
                Arc::new(InMemorySettlements::new()),
            );

            let mut chain = Vec::new();
            let mut previous = None;
            for (start, end) in months() {
                let draft = service.compute_settlement(party, start, end, previous).await.unwrap();
                let approved = service.approve(draft.id, UserId::new()).await.unwrap();
                previous = Some(approved.id);
                chain.push(approved);
            }
            let running = balances.build_timeline(party).await.unwrap().running_balance;
            (chain, running)
        });

        prop_assert_eq!(chain[0].opening_balance, opening);
        for pair in chain.windows(2) {
            prop_assert_eq!(pair[1].opening_balance, pair[0].closing_balance);
            prop_assert_eq!(pair[1].previous_settlement_id, Some(pair[0].id));
        }
        prop_assert_eq!(chain[2].closing_balance, running);
    }
}
