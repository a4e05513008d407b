//! Exchange rate repository.
//!
//! Stores point-in-time rate observations and loads them into an
//! [`FxResolver`].

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tally_core::currency::{FxError, FxResolver, RateObservation};
use tally_shared::FxCacheConfig;
use tally_shared::types::{CurrencyCode, RateId};
use tracing::info;

use super::mapping::to_utc;
use crate::entities::exchange_rates;

/// Error types for exchange rate operations.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeRateError {
    /// The observation was rejected by rate validation.
    #[error(transparent)]
    Fx(#[from] FxError),

    /// A stored row holds a malformed currency code.
    #[error("Corrupt exchange rate row {0}")]
    CorruptRow(RateId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<ExchangeRateError> for tally_shared::AppError {
    fn from(err: ExchangeRateError) -> Self {
        match err {
            ExchangeRateError::Fx(e) => e.into(),
            ExchangeRateError::CorruptRow(_) => Self::Internal(err.to_string()),
            ExchangeRateError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Exchange rate repository.
#[derive(Debug, Clone)]
pub struct ExchangeRateRepository {
    db: DatabaseConnection,
}

impl ExchangeRateRepository {
    /// Creates a new exchange rate repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Stores an observation.
    ///
    /// # Errors
    ///
    /// Returns `Fx(InvalidRate)` or `Fx(SameCurrency)` for an observation
    /// that cannot be resolved against, or a database error.
    pub async fn record(&self, observation: &RateObservation) -> Result<RateId, ExchangeRateError> {
        observation.validate()?;

        let model = exchange_rates::ActiveModel {
            base_code: Set(observation.base.as_str().to_string()),
            quote_code: Set(observation.quote.as_str().to_string()),
            rate: Set(observation.rate),
            valid_from: Set(observation.valid_from.into()),
            source: Set(observation.source.into()),
            is_active: Set(observation.is_active),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(
            id = model.id,
            pair = %format!("{}/{}", observation.base, observation.quote),
            rate = %observation.rate,
            "exchange rate recorded"
        );
        Ok(RateId::new(model.id))
    }

    /// Stores an observation and records it into `resolver`, evicting the
    /// resolver's cached resolutions for the pair.
    ///
    /// # Errors
    ///
    /// Returns any error from [`record`](Self::record).
    pub async fn record_into(
        &self,
        resolver: &FxResolver,
        observation: RateObservation,
    ) -> Result<RateId, ExchangeRateError> {
        let id = self.record(&observation).await?;
        resolver.record(observation)?;
        Ok(id)
    }

    /// Marks an observation inactive. Returns false if no row matched.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub async fn deactivate(&self, id: RateId) -> Result<bool, ExchangeRateError> {
        Ok(self.deactivate_row(id).await?.is_some())
    }

    /// Marks an observation inactive and drops it from `resolver`, evicting
    /// the resolver's cached resolutions for the pair. Returns false if no
    /// row matched.
    ///
    /// # Errors
    ///
    /// Returns a database error or `CorruptRow`.
    pub async fn deactivate_into(
        &self,
        resolver: &FxResolver,
        id: RateId,
    ) -> Result<bool, ExchangeRateError> {
        let Some(model) = self.deactivate_row(id).await? else {
            return Ok(false);
        };
        let observation = observation_from_model(model)?;
        resolver.deactivate(&observation.base, &observation.quote, observation.valid_from);
        Ok(true)
    }

    async fn deactivate_row(
        &self,
        id: RateId,
    ) -> Result<Option<exchange_rates::Model>, ExchangeRateError> {
        let Some(model) = exchange_rates::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        let mut active: exchange_rates::ActiveModel = model.into();
        active.is_active = Set(false);
        let updated = active.update(&self.db).await?;
        info!(id = updated.id, "exchange rate deactivated");
        Ok(Some(updated))
    }

    /// Lists active observations, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a database error or `CorruptRow`.
    pub async fn list_active(&self) -> Result<Vec<RateObservation>, ExchangeRateError> {
        exchange_rates::Entity::find()
            .filter(exchange_rates::Column::IsActive.eq(true))
            .order_by_asc(exchange_rates::Column::ValidFrom)
            .order_by_asc(exchange_rates::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(observation_from_model)
            .collect()
    }

    /// Builds a resolver holding every active observation.
    ///
    /// # Errors
    ///
    /// Returns a database error, `CorruptRow`, or `Fx` for a stored row
    /// that violates rate validation.
    pub async fn load_resolver(
        &self,
        anchor: CurrencyCode,
        cache_config: &FxCacheConfig,
    ) -> Result<FxResolver, ExchangeRateError> {
        let observations = self.list_active().await?;
        let count = observations.len();
        let resolver = FxResolver::with_cache_config(anchor, cache_config);
        resolver.extend(observations)?;
        info!(observations = count, "exchange rates loaded");
        Ok(resolver)
    }
}

fn observation_from_model(model: exchange_rates::Model) -> Result<RateObservation, ExchangeRateError> {
    let corrupt = |_| ExchangeRateError::CorruptRow(RateId::new(model.id));
    let base = CurrencyCode::parse(&model.base_code).map_err(corrupt)?;
    let quote = CurrencyCode::parse(&model.quote_code).map_err(corrupt)?;
    Ok(RateObservation {
        base,
        quote,
        rate: model.rate,
        valid_from: to_utc(model.valid_from),
        source: model.source.into(),
        is_active: model.is_active,
    })
}
