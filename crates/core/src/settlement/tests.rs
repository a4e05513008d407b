//! Settlement service tests over the in-memory stores.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_shared::LedgerConfig;
use tally_shared::types::{CurrencyCode, SettlementId, UserId};

use super::*;
use crate::currency::{FxResolver, RateObservation};
use crate::ledger::InMemoryLedger;
use crate::party::PartyRef;
use crate::timeline::{
    BalanceService, DocumentHeader, InMemoryFeed, InMemoryParties, InstrumentStatus,
    ManualInstrument, Payment, PaymentDirection, PaymentSplit, PaymentStatus, SourceDocument,
    TimelineConfig,
};

type Balances = BalanceService<InMemoryFeed, InMemoryParties, InMemoryLedger>;
type Service = SettlementService<InMemoryFeed, InMemoryParties, InMemoryLedger, InMemorySettlements>;

const SUPPLIER: PartyRef = PartyRef::supplier(3);

fn code(s: &str) -> CurrencyCode {
    CurrencyCode::parse(s).unwrap()
}

fn at(m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, m, d, 9, 30, 0).unwrap()
}

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, d).unwrap()
}

fn doc(id: i64, amount: Decimal, currency: &str, occurred_at: DateTime<Utc>) -> DocumentHeader {
    DocumentHeader::confirmed(id, amount, code(currency), occurred_at)
}

/// A supplier with opening balance -200 and activity in January and
/// February, part of it in EUR.
async fn setup() -> (Service, Arc<Balances>, Arc<InMemorySettlements>) {
    let fx = FxResolver::new(code("USD"));
    fx.extend([
        RateObservation::new(code("EUR"), code("USD"), dec!(1.10), at(1, 1)),
        RateObservation::new(code("EUR"), code("USD"), dec!(1.20), at(2, 1)),
    ])
    .unwrap();

    let feed = Arc::new(InMemoryFeed::new());
    let parties = Arc::new(InMemoryParties::new());
    parties.insert(SUPPLIER, dec!(-200), dec!(-1410)).await;

    let documents = [
        SourceDocument::InventoryReceipt(doc(1, dec!(1000), "EUR", at(1, 4))),
        SourceDocument::PurchaseReturn(doc(2, dec!(100), "USD", at(1, 12))),
        SourceDocument::PreOrder {
            header: doc(3, dec!(300), "USD", at(1, 20)),
            online: false,
        },
        SourceDocument::Payment(Payment {
            id: 4,
            direction: PaymentDirection::Outgoing,
            status: PaymentStatus::Completed,
            occurred_at: at(1, 31),
            splits: vec![PaymentSplit {
                amount: dec!(500),
                currency: code("USD"),
            }],
        }),
        SourceDocument::Instrument(ManualInstrument {
            id: 5,
            direction: PaymentDirection::Outgoing,
            amount: dec!(250),
            currency: code("USD"),
            issued_at: at(2, 2),
            status: InstrumentStatus::Returned,
            linked_payment_id: None,
            returned_at: Some(at(2, 9)),
        }),
        SourceDocument::SalesShare(doc(6, dec!(50), "EUR", at(2, 15))),
    ];
    for document in documents {
        feed.push(SUPPLIER, document).await;
    }

    let config = TimelineConfig::from_ledger(&LedgerConfig::default()).unwrap();
    let balances = Arc::new(BalanceService::new(
        feed,
        parties,
        Arc::new(InMemoryLedger::new()),
        Arc::new(fx),
        config,
    ));
    let store = Arc::new(InMemorySettlements::new());
    let service = SettlementService::new(Arc::clone(&balances), Arc::clone(&store));
    (service, balances, store)
}

#[tokio::test]
async fn test_compute_itemizes_the_period() {
    let (service, _, _) = setup().await;

    let january = service
        .compute_settlement(SUPPLIER, day(1, 1), day(1, 31), None)
        .await
        .unwrap();

    assert_eq!(january.opening_balance, dec!(-200));
    assert_eq!(january.rights.inventory, dec!(1100));
    assert_eq!(january.rights.pre_orders, dec!(300));
    assert_eq!(january.obligations.returns, dec!(100));
    assert_eq!(january.payments.outs, dec!(500));
    assert_eq!(january.payments.net(), dec!(-500));
    // -200 + 100 - 1400 + 500
    assert_eq!(january.closing_balance, dec!(-1000));
    assert!(!january.is_approved());
}

#[tokio::test]
async fn test_approved_settlement_chains_into_the_next() {
    let (service, _, _) = setup().await;
    let approver = UserId::new();

    let january = service
        .compute_settlement(SUPPLIER, day(1, 1), day(1, 31), None)
        .await
        .unwrap();
    let january = service.approve(january.id, approver).await.unwrap();

    let february = service
        .compute_settlement(SUPPLIER, day(2, 1), day(2, 28), Some(january.id))
        .await
        .unwrap();

    assert_eq!(february.previous_settlement_id, Some(january.id));
    assert_eq!(february.opening_balance, january.closing_balance);
    // The bounced instrument cancels its own outgoing payment.
    assert_eq!(february.payments, Payments::default());
    assert_eq!(february.rights.sales_share, dec!(60));
    assert_eq!(february.closing_balance, dec!(-1060));

    let latest = service.latest_for_party(SUPPLIER).await.unwrap().unwrap();
    assert_eq!(latest.id, february.id);
}

#[tokio::test]
async fn test_closing_matches_the_full_timeline() {
    let (service, balances, _) = setup().await;

    let january = service
        .compute_settlement(SUPPLIER, day(1, 1), day(1, 31), None)
        .await
        .unwrap();
    let january = service.approve(january.id, UserId::new()).await.unwrap();
    let february = service
        .compute_settlement(SUPPLIER, day(2, 1), day(2, 28), Some(january.id))
        .await
        .unwrap();

    let timeline = balances.build_timeline(SUPPLIER).await.unwrap();
    assert_eq!(february.closing_balance, timeline.running_balance);

    let from_checkpoint = balances
        .build_timeline_from_checkpoint(SUPPLIER, &january)
        .await
        .unwrap();
    assert_eq!(from_checkpoint.running_balance, timeline.running_balance);
}

#[tokio::test]
async fn test_recompute_replaces_draft_in_place() {
    let (service, _, store) = setup().await;

    let first = service
        .compute_settlement(SUPPLIER, day(1, 1), day(1, 31), None)
        .await
        .unwrap();
    let again = service.recompute(first.id).await.unwrap();

    assert_eq!(again.id, first.id);
    assert_eq!(again.closing_balance, first.closing_balance);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_approved_settlement_is_frozen() {
    let (service, _, _) = setup().await;
    let january = service
        .compute_settlement(SUPPLIER, day(1, 1), day(1, 31), None)
        .await
        .unwrap();
    service.approve(january.id, UserId::new()).await.unwrap();

    assert_eq!(
        service.recompute(january.id).await.unwrap_err(),
        SettlementError::AlreadyApproved(january.id)
    );
    assert_eq!(
        service.approve(january.id, UserId::new()).await.unwrap_err(),
        SettlementError::AlreadyApproved(january.id)
    );
    assert_eq!(
        service
            .compute_settlement(SUPPLIER, day(1, 1), day(1, 31), None)
            .await
            .unwrap_err(),
        SettlementError::AlreadyApproved(january.id)
    );
}

#[tokio::test]
async fn test_previous_must_be_approved() {
    let (service, _, _) = setup().await;
    let january = service
        .compute_settlement(SUPPLIER, day(1, 1), day(1, 31), None)
        .await
        .unwrap();

    let err = service
        .compute_settlement(SUPPLIER, day(2, 1), day(2, 28), Some(january.id))
        .await
        .unwrap_err();
    assert_eq!(err, SettlementError::PreviousNotApproved(january.id));
}

#[tokio::test]
async fn test_previous_must_precede_the_period() {
    let (service, _, _) = setup().await;
    let january = service
        .compute_settlement(SUPPLIER, day(1, 1), day(1, 31), None)
        .await
        .unwrap();
    service.approve(january.id, UserId::new()).await.unwrap();

    let err = service
        .compute_settlement(SUPPLIER, day(1, 31), day(2, 28), Some(january.id))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::OverlapsPrevious { .. }));
}

#[tokio::test]
async fn test_gap_after_previous_is_rejected() {
    let (service, _, store) = setup().await;
    let first_half = service
        .compute_settlement(SUPPLIER, day(1, 1), day(1, 15), None)
        .await
        .unwrap();
    service.approve(first_half.id, UserId::new()).await.unwrap();

    let err = service
        .compute_settlement(SUPPLIER, day(2, 1), day(2, 28), Some(first_half.id))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SettlementError::GapAfterPrevious {
            start: day(2, 1),
            previous_end: day(1, 15),
        }
    );
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_chain_cannot_branch_from_older_settlement() {
    let (service, _, _) = setup().await;
    let approver = UserId::new();
    let january = service
        .compute_settlement(SUPPLIER, day(1, 1), day(1, 31), None)
        .await
        .unwrap();
    let january = service.approve(january.id, approver).await.unwrap();
    let february = service
        .compute_settlement(SUPPLIER, day(2, 1), day(2, 28), Some(january.id))
        .await
        .unwrap();
    let february = service.approve(february.id, approver).await.unwrap();

    let err = service
        .compute_settlement(SUPPLIER, day(2, 1), day(3, 31), Some(january.id))
        .await
        .unwrap_err();
    assert_eq!(err, SettlementError::BranchesChain { head: february.id });

    let restart = service
        .compute_settlement(SUPPLIER, day(3, 1), day(3, 31), None)
        .await
        .unwrap_err();
    assert_eq!(restart, SettlementError::BranchesChain { head: february.id });

    let march = service
        .compute_settlement(SUPPLIER, day(3, 1), day(3, 31), Some(february.id))
        .await
        .unwrap();
    assert_eq!(march.opening_balance, february.closing_balance);
}

#[tokio::test]
async fn test_draft_head_recomputes_but_blocks_other_periods() {
    let (service, _, _) = setup().await;
    let january = service
        .compute_settlement(SUPPLIER, day(1, 1), day(1, 31), None)
        .await
        .unwrap();
    let january = service.approve(january.id, UserId::new()).await.unwrap();
    let february = service
        .compute_settlement(SUPPLIER, day(2, 1), day(2, 28), Some(january.id))
        .await
        .unwrap();

    let again = service.recompute(february.id).await.unwrap();
    assert_eq!(again.id, february.id);

    let err = service
        .compute_settlement(SUPPLIER, day(2, 1), day(2, 14), Some(january.id))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "BRANCHES_CHAIN");
}

#[tokio::test]
async fn test_previous_of_another_party_is_rejected() {
    let (service, _, _) = setup().await;
    let january = service
        .compute_settlement(SUPPLIER, day(1, 1), day(1, 31), None)
        .await
        .unwrap();
    service.approve(january.id, UserId::new()).await.unwrap();

    let err = service
        .compute_settlement(PartyRef::customer(3), day(2, 1), day(2, 28), Some(january.id))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "PARTY_MISMATCH");
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let (service, _, _) = setup().await;
    let missing = SettlementId::new(404);

    assert_eq!(service.get(missing).await.unwrap_err(), SettlementError::NotFound(missing));
    assert_eq!(
        service
            .compute_settlement(SUPPLIER, day(2, 1), day(2, 28), Some(missing))
            .await
            .unwrap_err(),
        SettlementError::NotFound(missing)
    );
    assert!(service.latest_for_party(PartyRef::partner(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_reversed_period_is_rejected() {
    let (service, _, store) = setup().await;
    let err = service
        .compute_settlement(SUPPLIER, day(2, 1), day(1, 1), None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_PERIOD");
    assert!(store.is_empty().await);
}
