//! Integration tests for `ExchangeRateRepository`.

mod common;

use chrono::{Duration, SubsecRound, Utc};
use rust_decimal_macros::dec;
use tally_core::currency::{FxError, RateMethod, RateObservation};
use tally_db::{ExchangeRateError, ExchangeRateRepository};
use tally_shared::FxCacheConfig;
use tally_shared::types::CurrencyCode;

fn code(s: &str) -> CurrencyCode {
    CurrencyCode::parse(s).unwrap()
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_recorded_rates_load_into_resolver() {
    let repo = ExchangeRateRepository::new(common::setup().await);
    // Rows from earlier runs are older, so this run's observation wins.
    let base = Utc::now().trunc_subsecs(6);

    repo.record(&RateObservation::new(code("CHF"), code("USD"), dec!(1.1250), base))
        .await
        .unwrap();
    let stale = repo
        .record(&RateObservation::new(
            code("CHF"),
            code("USD"),
            dec!(9.9999),
            base + Duration::hours(1),
        ))
        .await
        .unwrap();
    assert!(repo.deactivate(stale).await.unwrap());

    let fx = repo
        .load_resolver(code("USD"), &FxCacheConfig::default())
        .await
        .unwrap();
    let quote = fx.resolve(&code("USD"), &code("CHF"), base + Duration::hours(2)).unwrap();

    assert_eq!(quote.method, RateMethod::Inverse);
    assert_eq!(quote.observed_at, Some(base));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_invalid_rate_is_rejected_before_insert() {
    let repo = ExchangeRateRepository::new(common::setup().await);
    let at = Utc::now();

    let err = repo
        .record(&RateObservation::new(code("CHF"), code("USD"), dec!(-1), at))
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeRateError::Fx(FxError::InvalidRate(_))));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_deactivation_reaches_loaded_resolver() {
    let repo = ExchangeRateRepository::new(common::setup().await);
    let base = Utc::now().trunc_subsecs(6);
    let later = base + Duration::hours(2);

    repo.record(&RateObservation::new(code("NOK"), code("USD"), dec!(0.0950), base))
        .await
        .unwrap();
    let fx = repo
        .load_resolver(code("USD"), &FxCacheConfig::default())
        .await
        .unwrap();
    let direct = repo
        .record_into(
            &fx,
            RateObservation::new(code("USD"), code("NOK"), dec!(10.40), base + Duration::hours(1)),
        )
        .await
        .unwrap();
    assert_eq!(
        fx.resolve(&code("USD"), &code("NOK"), later).unwrap().method,
        RateMethod::Direct
    );

    assert!(repo.deactivate_into(&fx, direct).await.unwrap());

    let quote = fx.resolve(&code("USD"), &code("NOK"), later).unwrap();
    assert_eq!(quote.method, RateMethod::Inverse);
    assert_eq!(quote.observed_at, Some(base));
}
