//! Integration tests for `SettlementRepository`.

mod common;

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;
use tally_core::party::PartyRef;
use tally_core::settlement::{
    Obligations, Payments, Rights, SettlementDraft, SettlementError, SettlementPeriod,
    SettlementStore,
};
use tally_db::SettlementRepository;
use tally_shared::types::UserId;

fn draft(party: PartyRef, closing: rust_decimal::Decimal) -> SettlementDraft {
    SettlementDraft {
        party,
        previous_settlement_id: None,
        period: SettlementPeriod::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        )
        .unwrap(),
        opening_balance: dec!(-200),
        rights: Rights {
            inventory: dec!(1100),
            ..Rights::default()
        },
        obligations: Obligations {
            returns: dec!(100),
            ..Obligations::default()
        },
        payments: Payments {
            ins: dec!(0),
            outs: dec!(500),
        },
        adjustments: dec!(0),
        closing_balance: closing,
        computed_at: Utc::now(),
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_draft_is_replaced_then_frozen() {
    let repo = SettlementRepository::new(common::setup().await);
    let party = PartyRef::supplier(common::unique_id());

    let first = repo.save_draft(draft(party, dec!(-1000))).await.unwrap();
    let second = repo.save_draft(draft(party, dec!(-990))).await.unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.closing_balance, dec!(-990));
    assert_eq!(second.rights.total(), dec!(1100));

    let approved = repo.approve(first.id, UserId::new(), Utc::now()).await.unwrap();
    assert!(approved.is_approved());

    assert_eq!(
        repo.save_draft(draft(party, dec!(0))).await.unwrap_err(),
        SettlementError::AlreadyApproved(first.id)
    );
    assert_eq!(
        repo.approve(first.id, UserId::new(), Utc::now()).await.unwrap_err(),
        SettlementError::AlreadyApproved(first.id)
    );

    let latest = repo.latest_for_party(party).await.unwrap().unwrap();
    assert_eq!(latest.id, first.id);
    assert_eq!(repo.get(first.id).await.unwrap(), Some(latest));
}
