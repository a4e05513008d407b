//! Double-entry bookkeeping logic.
//!
//! This module implements batch posting:
//! - Domain types for batches, entries and the chart of accounts
//! - Business rule validation for posting lines
//! - Error types for ledger operations
//! - The storage trait and an in-memory implementation
//! - Posting service with idempotent replace by natural key
//! - Conversion of foreign-currency postings into the base currency

pub mod convert;
pub mod error;
pub mod memory;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use convert::convert_request;
pub use error::LedgerError;
pub use memory::{InMemoryLedger, batch_code};
pub use service::PostingService;
pub use store::LedgerStore;
pub use types::{
    Account, AccountClass, BatchTotals, EntryLine, FxAudit, GlBatch, GlEntry, PostedBatch,
    PostingRequest, SourceKey,
};
pub use validation::{check_accounts, referenced_codes, validate_lines};
