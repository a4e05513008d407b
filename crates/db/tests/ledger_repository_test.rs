//! Integration tests for `LedgerRepository`.

mod common;

use std::sync::Arc;

use rust_decimal_macros::dec;
use tally_core::ledger::{
    Account, AccountClass, EntryLine, LedgerError, LedgerStore, PostingRequest, PostingService,
    SourceKey,
};
use tally_core::party::PartyRef;
use tally_core::timeline::EventWindow;
use tally_db::LedgerRepository;
use tally_shared::types::CurrencyCode;

fn usd() -> CurrencyCode {
    CurrencyCode::parse("USD").unwrap()
}

async fn service() -> PostingService<LedgerRepository> {
    let repo = LedgerRepository::new(common::setup().await);
    for account in [
        Account::new("CASH", "Cash", AccountClass::Asset),
        Account::new("1200", "Receivables", AccountClass::Asset),
        Account::new("SALES", "Sales", AccountClass::Revenue),
    ] {
        repo.upsert_account(account).await.unwrap();
    }
    PostingService::new(Arc::new(repo), dec!(0.01))
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_repost_replaces_entries_and_keeps_code() {
    let service = service().await;
    let key = SourceKey::new("SALE", common::unique_id(), "ACCRUAL");

    let first = service
        .post(PostingRequest::new(
            key.clone(),
            usd(),
            vec![EntryLine::debit("1200", dec!(1000)), EntryLine::credit("SALES", dec!(1000))],
        ))
        .await
        .unwrap();
    assert!(!first.replaced);
    assert!(first.batch.code.starts_with("GL-"));

    let second = service
        .post(PostingRequest::new(
            key.clone(),
            usd(),
            vec![EntryLine::debit("1200", dec!(900)), EntryLine::credit("SALES", dec!(900))],
        ))
        .await
        .unwrap();
    assert!(second.replaced);
    assert_eq!(second.batch.id, first.batch.id);
    assert_eq!(second.batch.code, first.batch.code);

    let found = service.find(&key).await.unwrap().unwrap();
    assert_eq!(found.entries.len(), 2);
    assert_eq!(found.totals().debit, dec!(900));
    assert!(service.verify_batch_balanced(&found).is_ok());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_missing_account_persists_nothing() {
    let service = service().await;
    let key = SourceKey::new("SALE", common::unique_id(), "ACCRUAL");

    let err = service
        .post(PostingRequest::new(
            key.clone(),
            usd(),
            vec![EntryLine::debit("CASH", dec!(10)), EntryLine::credit("NOPE", dec!(10))],
        ))
        .await
        .unwrap_err();

    assert_eq!(err, LedgerError::AccountNotFound("NOPE".to_string()));
    assert!(service.find(&key).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_posts_leave_one_batch() {
    let service = service().await;
    let key = SourceKey::new("PAYMENT", common::unique_id(), "SETTLE");

    let handles: Vec<_> = (1..=8)
        .map(|n| {
            let service = service.clone();
            let key = key.clone();
            tokio::spawn(async move {
                let amount = rust_decimal::Decimal::from(n * 10);
                service
                    .post(PostingRequest::new(
                        key,
                        usd(),
                        vec![EntryLine::debit("CASH", amount), EntryLine::credit("1200", amount)],
                    ))
                    .await
            })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        let outcome = result.unwrap();
        assert!(
            matches!(outcome, Ok(_) | Err(LedgerError::DuplicatePosting(_))),
            "unexpected outcome: {outcome:?}"
        );
    }

    let found = service.find(&key).await.unwrap().unwrap();
    assert_eq!(found.entries.len(), 2);
    assert!(service.verify_batch_balanced(&found).is_ok());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_batches_for_party_and_reverse() {
    let service = service().await;
    let party = PartyRef::customer(common::unique_id());
    let key = SourceKey::new("JOURNAL", common::unique_id(), "ADJUSTMENT");

    service
        .post(
            PostingRequest::new(
                key.clone(),
                usd(),
                vec![EntryLine::debit("1200", dec!(25)), EntryLine::credit("SALES", dec!(25))],
            )
            .with_counterparty(party)
            .with_memo("write-up"),
        )
        .await
        .unwrap();

    let batches = service.batches_for_party(party, EventWindow::all()).await.unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].batch.counterparty, Some(party));
    assert_eq!(batches[0].batch.memo, "write-up");

    let after = batches[0].batch.created_at + chrono::Duration::seconds(1);
    assert!(
        service
            .batches_for_party(party, EventWindow::since(after))
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        service
            .batches_for_party(party, EventWindow::between(batches[0].batch.created_at, after))
            .await
            .unwrap()
            .len(),
        1
    );

    assert!(service.reverse(&key).await.unwrap());
    assert!(!service.reverse(&key).await.unwrap());
    assert!(service.batches_for_party(party, EventWindow::all()).await.unwrap().is_empty());
}
