//! Ledger domain types for batch posting and validation.
//!
//! A batch is the unit of one accounting event, keyed by the source document
//! that produced it. Entries within a batch carry non-negative debit and
//! credit amounts with exactly one side set.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{BatchId, CurrencyCode, EntryId};

use crate::currency::RateMethod;
use crate::party::PartyRef;

/// Account classification in the chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountClass {
    /// Resources owned (cash, receivables, inventory).
    Asset,
    /// Amounts owed (payables, deposits).
    Liability,
    /// Income earned.
    Revenue,
    /// Costs incurred.
    Expense,
    /// Owner's interest.
    Equity,
}

impl AccountClass {
    /// Returns true if a debit increases accounts of this class.
    #[must_use]
    pub const fn is_debit_normal(&self) -> bool {
        matches!(self, Self::Asset | Self::Expense)
    }
}

/// A node in the chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable account code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Account class.
    pub class: AccountClass,
    /// Parent account code, if any.
    pub parent_code: Option<String>,
    /// Inactive accounts reject postings.
    pub is_active: bool,
}

impl Account {
    /// Creates an active top-level account.
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>, class: AccountClass) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            class,
            parent_code: None,
            is_active: true,
        }
    }
}

/// Natural key of a batch: one batch per source document and purpose.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceKey {
    /// Kind of source document (for example `SALE` or `EXPENSE`).
    pub source_type: String,
    /// Source document id.
    pub source_id: i64,
    /// Posting purpose (for example `ACCRUAL` or `PAYMENT`).
    pub purpose: String,
}

impl SourceKey {
    /// Creates a new source key.
    #[must_use]
    pub fn new(source_type: impl Into<String>, source_id: i64, purpose: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            source_id,
            purpose: purpose.into(),
        }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}/{}", self.source_type, self.source_id, self.purpose)
    }
}

/// One requested line of a posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryLine {
    /// Account code to post to.
    pub account_code: String,
    /// Debit amount (non-negative).
    pub debit: Decimal,
    /// Credit amount (non-negative).
    pub credit: Decimal,
}

impl EntryLine {
    /// Creates a debit line.
    #[must_use]
    pub fn debit(account_code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account_code: account_code.into(),
            debit: amount,
            credit: Decimal::ZERO,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub fn credit(account_code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account_code: account_code.into(),
            debit: Decimal::ZERO,
            credit: amount,
        }
    }
}

/// Conversion details kept when a document was posted in another currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxAudit {
    /// The document's native currency.
    pub original_currency: CurrencyCode,
    /// Rate applied: `1 original = rate posting currency`.
    pub rate: Decimal,
    /// How the rate was resolved.
    pub method: RateMethod,
    /// Instant the rate was resolved for.
    pub as_of: DateTime<Utc>,
}

/// Request to create or replace the batch for one source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingRequest {
    /// Natural key.
    pub key: SourceKey,
    /// Posting currency shared by every line.
    pub currency: CurrencyCode,
    /// Free-text memo.
    pub memo: String,
    /// Entry lines.
    pub lines: Vec<EntryLine>,
    /// Counterparty the batch relates to, if any.
    pub counterparty: Option<PartyRef>,
    /// Conversion details, if the lines were converted.
    pub fx_audit: Option<FxAudit>,
}

impl PostingRequest {
    /// Creates a request with an empty memo and no counterparty.
    #[must_use]
    pub fn new(key: SourceKey, currency: CurrencyCode, lines: Vec<EntryLine>) -> Self {
        Self {
            key,
            currency,
            memo: String::new(),
            lines,
            counterparty: None,
            fx_audit: None,
        }
    }

    /// Sets the memo.
    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    /// Sets the counterparty.
    #[must_use]
    pub fn with_counterparty(mut self, party: PartyRef) -> Self {
        self.counterparty = Some(party);
        self
    }
}

/// A persisted batch header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlBatch {
    /// Batch id.
    pub id: BatchId,
    /// Natural key.
    pub key: SourceKey,
    /// Posting currency.
    pub currency: CurrencyCode,
    /// Memo.
    pub memo: String,
    /// Counterparty, if any.
    pub counterparty: Option<PartyRef>,
    /// Human-readable sequential code (`GL-000001`).
    pub code: String,
    /// Conversion details, if any.
    pub fx_audit: Option<FxAudit>,
    /// First posting time.
    pub created_at: DateTime<Utc>,
    /// Last replacement time.
    pub updated_at: DateTime<Utc>,
}

/// A persisted entry row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlEntry {
    /// Entry id.
    pub id: EntryId,
    /// Owning batch.
    pub batch_id: BatchId,
    /// Account code.
    pub account_code: String,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
}

impl GlEntry {
    /// Debit minus credit.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// A batch with its entries, as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedBatch {
    /// Header.
    pub batch: GlBatch,
    /// Entries in insertion order.
    pub entries: Vec<GlEntry>,
    /// True if an earlier batch for the same key was replaced.
    pub replaced: bool,
}

impl PostedBatch {
    /// Sums the entries.
    #[must_use]
    pub fn totals(&self) -> BatchTotals {
        BatchTotals::from_amounts(self.entries.iter().map(|e| (e.debit, e.credit)))
    }
}

/// Debit and credit sums for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchTotals {
    /// Sum of debits.
    pub debit: Decimal,
    /// Sum of credits.
    pub credit: Decimal,
}

impl BatchTotals {
    /// Sums (debit, credit) pairs.
    pub fn from_amounts<I>(amounts: I) -> Self
    where
        I: IntoIterator<Item = (Decimal, Decimal)>,
    {
        amounts
            .into_iter()
            .fold(Self::default(), |acc, (debit, credit)| Self {
                debit: acc.debit + debit,
                credit: acc.credit + credit,
            })
    }

    /// Absolute difference between debits and credits.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        (self.debit - self.credit).abs()
    }

    /// Returns true if the difference is within `tolerance`.
    #[must_use]
    pub fn is_balanced(&self, tolerance: Decimal) -> bool {
        self.difference() <= tolerance
    }
}
