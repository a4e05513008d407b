//! Shared types, errors, and configuration for Tally.
//!
//! This crate provides common types used across all other crates:
//! - Currency codes
//! - Typed IDs for type-safe entity references
//! - Pagination types for long result sets
//! - Application-wide error types
//! - Configuration management
//! - Tracing subscriber setup

pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, FxCacheConfig, LedgerConfig, LoggingConfig};
pub use error::{AppError, AppResult};
