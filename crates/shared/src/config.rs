//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::{CurrencyCode, InvalidCurrencyCode};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger and reconciliation configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Exchange-rate cache configuration.
    #[serde(default)]
    pub fx_cache: FxCacheConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger configuration shared by posting, timeline and settlement.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Functional currency every balance is expressed in.
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    /// Intermediate currency for cross-rate conversion.
    #[serde(default = "default_anchor_currency")]
    pub anchor_currency: String,
    /// Maximum tolerated debit/credit and drift difference.
    #[serde(default = "default_balance_tolerance")]
    pub balance_tolerance: Decimal,
    /// Source type of manual journal batches replayed into party timelines.
    #[serde(default = "default_journal_source_type")]
    pub journal_source_type: String,
    /// Receivable/payable control accounts carrying party balances.
    #[serde(default = "default_control_accounts")]
    pub control_accounts: Vec<String>,
    /// Fail timeline replay on a missing rate instead of pricing at 1.
    #[serde(default)]
    pub strict_rates: bool,
}

fn default_base_currency() -> String {
    "USD".to_string()
}

fn default_anchor_currency() -> String {
    "USD".to_string()
}

fn default_balance_tolerance() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_journal_source_type() -> String {
    "JOURNAL".to_string()
}

fn default_control_accounts() -> Vec<String> {
    vec!["1200".to_string(), "2100".to_string()]
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_currency: default_base_currency(),
            anchor_currency: default_anchor_currency(),
            balance_tolerance: default_balance_tolerance(),
            journal_source_type: default_journal_source_type(),
            control_accounts: default_control_accounts(),
            strict_rates: false,
        }
    }
}

impl LedgerConfig {
    /// Returns the validated base currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured code is malformed.
    pub fn base_currency(&self) -> Result<CurrencyCode, InvalidCurrencyCode> {
        CurrencyCode::parse(&self.base_currency)
    }

    /// Returns the validated anchor currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured code is malformed.
    pub fn anchor_currency(&self) -> Result<CurrencyCode, InvalidCurrencyCode> {
        CurrencyCode::parse(&self.anchor_currency)
    }
}

/// Exchange-rate cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FxCacheConfig {
    /// Maximum number of memoized rate resolutions.
    #[serde(default = "default_fx_cache_capacity")]
    pub max_capacity: u64,
    /// Time-to-live for each memoized resolution, in seconds.
    #[serde(default = "default_fx_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_fx_cache_capacity() -> u64 {
    10_000
}

fn default_fx_cache_ttl() -> u64 {
    3600 // 1 hour
}

impl Default for FxCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_fx_cache_capacity(),
            ttl_secs: default_fx_cache_ttl(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "tally=info,sea_orm=warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("TALLY")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("ledger.control_accounts")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
