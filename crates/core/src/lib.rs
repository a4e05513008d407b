//! Core business logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage sits behind the store traits each module defines; in-memory
//! implementations live next to them.
//!
//! # Modules
//!
//! - `currency` - Exchange-rate resolution and conversion
//! - `ledger` - Idempotent double-entry posting
//! - `party` - Counterparty references and balance fields
//! - `timeline` - Balance replay and drift detection
//! - `settlement` - Period settlements chained by approval

pub mod currency;
pub mod ledger;
pub mod party;
pub mod settlement;
pub mod timeline;
