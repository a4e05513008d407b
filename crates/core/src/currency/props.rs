//! Property-based tests for exchange rate resolution.
//!
//! - Inverse consistency: rate(a, b) * rate(b, a) == 1
//! - Cross consistency: rate(a, b) == rate(a, anchor) * rate(anchor, b)
//! - Determinism: repeated and cached lookups agree
//! - Most recent observation at or before the query instant wins

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::CurrencyCode;

use super::conversion::convert;
use super::exchange::{RateMethod, RateObservation};
use super::resolver::FxResolver;

/// Strategy to generate positive exchange rates (0.0001 to 10000.0000).
fn positive_rate() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|v| Decimal::new(v, 4))
}

/// Strategy to generate positive decimal amounts (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a set of (day offset, rate) observations.
fn observation_days() -> impl Strategy<Value = Vec<(i64, Decimal)>> {
    prop::collection::vec((0i64..365, positive_rate()), 1..20)
}

fn code(s: &str) -> CurrencyCode {
    CurrencyCode::parse(s).unwrap()
}

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn approx_eq(a: Decimal, b: Decimal, epsilon: Decimal) -> bool {
    (a - b).abs() <= epsilon
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Resolving a pair and its reverse from the same observation set yields
    /// reciprocal rates.
    #[test]
    fn prop_inverse_consistency(rate in positive_rate(), offset in 0i64..30) {
        let fx = FxResolver::new(code("USD"));
        fx.record(RateObservation::new(code("EUR"), code("ILS"), rate, epoch())).unwrap();
        let as_of = epoch() + Duration::days(offset);

        let forward = fx.resolve(&code("EUR"), &code("ILS"), as_of).unwrap();
        let backward = fx.resolve(&code("ILS"), &code("EUR"), as_of).unwrap();

        prop_assert_eq!(forward.method, RateMethod::Direct);
        prop_assert_eq!(backward.method, RateMethod::Inverse);
        prop_assert!(
            approx_eq(forward.rate * backward.rate, Decimal::ONE, Decimal::new(1, 12)),
            "{} * {} should be 1",
            forward.rate,
            backward.rate
        );
    }

    /// With no direct observation, the resolved rate equals the product of
    /// the two anchor legs.
    #[test]
    fn prop_cross_consistency(leg1 in positive_rate(), leg2 in positive_rate()) {
        let fx = FxResolver::new(code("EUR"));
        fx.extend([
            RateObservation::new(code("USD"), code("EUR"), leg1, epoch()),
            RateObservation::new(code("EUR"), code("ILS"), leg2, epoch()),
        ])
        .unwrap();

        let cross = fx.resolve(&code("USD"), &code("ILS"), epoch()).unwrap();
        let first = fx.resolve(&code("USD"), &code("EUR"), epoch()).unwrap();
        let second = fx.resolve(&code("EUR"), &code("ILS"), epoch()).unwrap();

        prop_assert_eq!(cross.method, RateMethod::Cross);
        prop_assert_eq!(cross.rate, first.rate * second.rate);
    }

    /// The same request always yields the same quote, cached or not.
    #[test]
    fn prop_resolution_is_deterministic(days in observation_days(), query in 0i64..400) {
        let observations: Vec<RateObservation> = days
            .iter()
            .map(|(d, r)| {
                RateObservation::new(code("USD"), code("ILS"), *r, epoch() + Duration::days(*d))
            })
            .collect();

        let first = FxResolver::new(code("USD"));
        let second = FxResolver::new(code("USD"));
        first.extend(observations.iter().cloned()).unwrap();
        second.extend(observations.into_iter().rev()).unwrap();

        let as_of = epoch() + Duration::days(query);
        let a = first.rate(&code("USD"), &code("ILS"), as_of, super::OnMissingRate::unpriced_one());
        let b = first.rate(&code("USD"), &code("ILS"), as_of, super::OnMissingRate::unpriced_one());
        let c = second.rate(&code("USD"), &code("ILS"), as_of, super::OnMissingRate::unpriced_one());
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(&a, &c);
    }

    /// The authoritative observation is the latest one at or before as-of.
    #[test]
    fn prop_most_recent_observation_wins(days in observation_days(), query in 0i64..400) {
        let fx = FxResolver::new(code("USD"));
        for (d, r) in &days {
            fx.record(RateObservation::new(
                code("USD"),
                code("ILS"),
                *r,
                epoch() + Duration::days(*d),
            ))
            .unwrap();
        }

        let expected = days
            .iter()
            .filter(|(d, _)| *d <= query)
            .max_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, r)| *r);

        let as_of = epoch() + Duration::days(query);
        let resolved = fx.resolve(&code("USD"), &code("ILS"), as_of).ok().map(|q| q.rate);
        prop_assert_eq!(resolved, expected);
    }

    /// Converted amounts keep at most 4 decimal places.
    #[test]
    fn prop_converted_amount_has_ledger_precision(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let result = convert(amount, rate);
        prop_assert!(result.scale() <= 4, "{} has more than 4 decimals", result);
    }
}
