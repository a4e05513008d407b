//! Property-based tests for timeline replay.
//!
//! - Running balance equals opening balance plus the signed event sum
//! - Replay does not depend on input order
//! - A stored balance produced by the same history shows no drift

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_shared::types::CurrencyCode;

use super::builder::TimelineBuilder;
use super::events::{EventId, EventKind, Flow, LedgerEvent};
use crate::currency::{FxResolver, OnMissingRate, RateObservation};
use crate::party::PartyRef;

fn code(s: &str) -> CurrencyCode {
    CurrencyCode::parse(s).unwrap()
}

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// Strategy to generate an amount (0.01 to 100,000.00).
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn kind() -> impl Strategy<Value = EventKind> {
    prop_oneof![
        Just(EventKind::Sale),
        Just(EventKind::SaleReturn),
        Just(EventKind::Payment),
        Just(EventKind::ServiceOrder),
        Just(EventKind::ChargeBack),
    ]
}

/// Events in USD or EUR on days 0..60, with unique ids.
fn events() -> impl Strategy<Value = Vec<LedgerEvent>> {
    prop::collection::vec((kind(), amount(), 0i64..60, any::<bool>(), any::<bool>()), 0..40).prop_map(
        |rows| {
            rows.into_iter()
                .zip(1i64..)
                .map(|((kind, amount, day, eur, inbound), id)| LedgerEvent {
                    id: EventId {
                        kind,
                        source_id: id,
                        line: 0,
                    },
                    party: PartyRef::customer(1),
                    amount,
                    currency: if eur { code("EUR") } else { code("USD") },
                    occurred_at: epoch() + Duration::days(day),
                    flow: if inbound { Flow::Inbound } else { Flow::Outbound },
                })
                .collect()
        },
    )
}

fn resolver() -> FxResolver {
    let fx = FxResolver::new(code("USD"));
    fx.extend([
        RateObservation::new(code("EUR"), code("USD"), dec!(1.0850), epoch()),
        RateObservation::new(code("EUR"), code("USD"), dec!(1.1025), epoch() + Duration::days(30)),
    ])
    .unwrap();
    fx
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_running_balance_is_opening_plus_signed_sum(events in events(), opening in amount()) {
        let fx = resolver();
        let usd = code("USD");
        let builder = TimelineBuilder::new(&fx, &usd, dec!(0.01), OnMissingRate::Raise);

        let timeline = builder.build(PartyRef::customer(1), opening, Decimal::ZERO, events).unwrap();
        let signed: Decimal = timeline.entries.iter().map(|e| e.signed_amount).sum();

        prop_assert_eq!(timeline.running_balance, opening + signed);
        prop_assert_eq!(
            timeline.entries.last().map_or(opening, |e| e.balance_after),
            timeline.running_balance
        );
        prop_assert!(timeline
            .entries
            .windows(2)
            .all(|w| w[0].event.chronological(&w[1].event).is_lt()));
    }

    #[test]
    fn prop_replay_is_order_independent(events in events()) {
        let fx = resolver();
        let usd = code("USD");
        let builder = TimelineBuilder::new(&fx, &usd, dec!(0.01), OnMissingRate::Raise);

        let mut reversed = events.clone();
        reversed.reverse();

        let a = builder.build(PartyRef::customer(1), Decimal::ZERO, Decimal::ZERO, events).unwrap();
        let b = builder.build(PartyRef::customer(1), Decimal::ZERO, Decimal::ZERO, reversed).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_consistent_history_has_no_drift(events in events(), opening in amount()) {
        let fx = resolver();
        let usd = code("USD");
        let builder = TimelineBuilder::new(&fx, &usd, dec!(0.01), OnMissingRate::Raise);

        let first = builder
            .build(PartyRef::customer(1), opening, Decimal::ZERO, events.clone())
            .unwrap();
        let second = builder
            .build(PartyRef::customer(1), opening, first.running_balance, events)
            .unwrap();

        prop_assert_eq!(second.drift, Decimal::ZERO);
        prop_assert!(second.is_consistent());
    }
}
