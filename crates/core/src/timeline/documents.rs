//! Business documents consumed from the surrounding application, and their
//! normalization into [`LedgerEvent`]s.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::CurrencyCode;

use super::events::{EventId, EventKind, Flow, LedgerEvent};
use crate::ledger::PostedBatch;
use crate::party::{PartyKind, PartyRef};

/// Lifecycle of a simple document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Not yet binding.
    Draft,
    /// Confirmed or issued.
    Confirmed,
    /// Cancelled after confirmation.
    Cancelled,
}

/// The common fields of a single-amount document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHeader {
    /// Document id.
    pub id: i64,
    /// Total amount in `currency`.
    pub amount: Decimal,
    /// Document currency.
    pub currency: CurrencyCode,
    /// Effective instant.
    pub occurred_at: DateTime<Utc>,
    /// Status.
    pub status: DocumentStatus,
}

impl DocumentHeader {
    /// Creates a confirmed header.
    #[must_use]
    pub const fn confirmed(
        id: i64,
        amount: Decimal,
        currency: CurrencyCode,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            amount,
            currency,
            occurred_at,
            status: DocumentStatus::Confirmed,
        }
    }
}

/// Direction of a payment or instrument relative to the business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentDirection {
    /// Received from the party.
    Incoming,
    /// Paid to the party.
    Outgoing,
}

impl PaymentDirection {
    const fn flow(self) -> Flow {
        match self {
            Self::Incoming => Flow::Inbound,
            Self::Outgoing => Flow::Outbound,
        }
    }
}

/// Payment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Recorded, awaiting settlement.
    Pending,
    /// Settled.
    Completed,
    /// Voided.
    Cancelled,
}

/// One instrument within a composite payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSplit {
    /// Amount in `currency`.
    pub amount: Decimal,
    /// Split currency.
    pub currency: CurrencyCode,
}

/// A payment made of one or more splits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment id.
    pub id: i64,
    /// Direction.
    pub direction: PaymentDirection,
    /// Status.
    pub status: PaymentStatus,
    /// Effective instant.
    pub occurred_at: DateTime<Utc>,
    /// Splits, each converted individually.
    pub splits: Vec<PaymentSplit>,
}

/// Manual instrument lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentStatus {
    /// Received or issued, not yet cleared.
    Pending,
    /// Cleared by the bank.
    Cleared,
    /// Returned or bounced.
    Returned,
}

/// A cheque or promissory note recorded by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualInstrument {
    /// Instrument id.
    pub id: i64,
    /// Received from or issued to the party.
    pub direction: PaymentDirection,
    /// Face amount.
    pub amount: Decimal,
    /// Instrument currency.
    pub currency: CurrencyCode,
    /// When it was received or issued.
    pub issued_at: DateTime<Utc>,
    /// Status.
    pub status: InstrumentStatus,
    /// Payment that already accounts for this instrument, if any.
    pub linked_payment_id: Option<i64>,
    /// When it was returned or bounced.
    pub returned_at: Option<DateTime<Utc>>,
}

/// How an entity-linked expense relates to the party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseNature {
    /// The party rendered a service the business pays for.
    ServiceRendered,
    /// A cost the business passes on to the party.
    ChargeBack,
}

/// Every document kind that can move a party's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceDocument {
    /// Sale to the party.
    Sale(DocumentHeader),
    /// Goods returned by the party.
    SaleReturn(DocumentHeader),
    /// Invoice issued to the party.
    Invoice(DocumentHeader),
    /// Service order for the party.
    ServiceOrder(DocumentHeader),
    /// Pre-order placed by or fulfilled by the party.
    PreOrder {
        /// Common fields.
        header: DocumentHeader,
        /// Placed through the online store.
        online: bool,
    },
    /// Payment to or from the party.
    Payment(Payment),
    /// Manual instrument to or from the party.
    Instrument(ManualInstrument),
    /// Expense linked to the party.
    Expense {
        /// Common fields.
        header: DocumentHeader,
        /// Relationship to the party.
        nature: ExpenseNature,
    },
    /// Goods received from the party into inventory.
    InventoryReceipt(DocumentHeader),
    /// Revenue share statement for the party.
    SalesShare(DocumentHeader),
    /// Exchange transaction credited to the party.
    ExchangeTransaction(DocumentHeader),
    /// Damaged goods charged to the party.
    DamagedGoods(DocumentHeader),
    /// Goods returned by the business to the party.
    PurchaseReturn(DocumentHeader),
}

fn header_event(party: PartyRef, kind: EventKind, flow: Flow, header: &DocumentHeader) -> Vec<LedgerEvent> {
    match header.status {
        DocumentStatus::Confirmed => vec![LedgerEvent {
            id: EventId {
                kind,
                source_id: header.id,
                line: 0,
            },
            party,
            amount: header.amount,
            currency: header.currency.clone(),
            occurred_at: header.occurred_at,
            flow,
        }],
        DocumentStatus::Draft | DocumentStatus::Cancelled => Vec::new(),
    }
}

/// Direction of a pre-order for the party's kind.
fn pre_order_flow(kind: PartyKind) -> Flow {
    if kind.fulfils_pre_orders() {
        Flow::Inbound
    } else {
        Flow::Outbound
    }
}

fn payment_events(party: PartyRef, payment: &Payment) -> Vec<LedgerEvent> {
    match payment.status {
        PaymentStatus::Pending | PaymentStatus::Completed => {}
        PaymentStatus::Cancelled => return Vec::new(),
    }

    payment
        .splits
        .iter()
        .zip(0u32..)
        .filter(|(split, _)| !split.amount.is_zero())
        .map(|(split, line)| LedgerEvent {
            id: EventId {
                kind: EventKind::Payment,
                source_id: payment.id,
                line,
            },
            party,
            amount: split.amount,
            currency: split.currency.clone(),
            occurred_at: payment.occurred_at,
            flow: payment.direction.flow(),
        })
        .collect()
}

fn instrument_events(party: PartyRef, instrument: &ManualInstrument) -> Vec<LedgerEvent> {
    let mut events = Vec::with_capacity(2);
    let flow = instrument.direction.flow();

    // A linked instrument is already counted through its payment. A cleared
    // one has settled into a payment of its own.
    let outstanding = matches!(
        instrument.status,
        InstrumentStatus::Pending | InstrumentStatus::Returned
    );
    if instrument.linked_payment_id.is_none() && outstanding {
        events.push(LedgerEvent {
            id: EventId {
                kind: EventKind::Instrument,
                source_id: instrument.id,
                line: 0,
            },
            party,
            amount: instrument.amount,
            currency: instrument.currency.clone(),
            occurred_at: instrument.issued_at,
            flow,
        });
    }

    match instrument.status {
        InstrumentStatus::Returned => events.push(LedgerEvent {
            id: EventId {
                kind: EventKind::InstrumentReturned,
                source_id: instrument.id,
                line: 0,
            },
            party,
            amount: instrument.amount,
            currency: instrument.currency.clone(),
            occurred_at: instrument.returned_at.unwrap_or(instrument.issued_at),
            flow: flow.reversed(),
        }),
        InstrumentStatus::Pending | InstrumentStatus::Cleared => {}
    }

    events
}

impl SourceDocument {
    /// Normalizes the document into the events it contributes to `party`.
    ///
    /// Drafts and cancelled documents contribute nothing.
    #[must_use]
    pub fn events_for(&self, party: PartyRef) -> Vec<LedgerEvent> {
        match self {
            Self::Sale(h) => header_event(party, EventKind::Sale, Flow::Outbound, h),
            Self::Invoice(h) => header_event(party, EventKind::Invoice, Flow::Outbound, h),
            Self::ServiceOrder(h) => header_event(party, EventKind::ServiceOrder, Flow::Outbound, h),
            Self::PreOrder { header, online } => {
                let kind = if *online {
                    EventKind::OnlinePreOrder
                } else {
                    EventKind::PreOrder
                };
                header_event(party, kind, pre_order_flow(party.kind), header)
            }
            Self::SaleReturn(h) => header_event(party, EventKind::SaleReturn, Flow::Inbound, h),
            Self::PurchaseReturn(h) => {
                header_event(party, EventKind::PurchaseReturn, Flow::Outbound, h)
            }
            Self::InventoryReceipt(h) => {
                header_event(party, EventKind::InventoryReceipt, Flow::Inbound, h)
            }
            Self::SalesShare(h) => header_event(party, EventKind::SalesShare, Flow::Inbound, h),
            Self::ExchangeTransaction(h) => {
                header_event(party, EventKind::ExchangeTransaction, Flow::Inbound, h)
            }
            Self::DamagedGoods(h) => header_event(party, EventKind::DamagedGoods, Flow::Outbound, h),
            Self::Expense { header, nature } => match nature {
                ExpenseNature::ServiceRendered => {
                    header_event(party, EventKind::ServiceRendered, Flow::Inbound, header)
                }
                ExpenseNature::ChargeBack => {
                    header_event(party, EventKind::ChargeBack, Flow::Outbound, header)
                }
            },
            Self::Payment(p) => payment_events(party, p),
            Self::Instrument(i) => instrument_events(party, i),
        }
    }
}

/// Derives journal adjustment events from the party's ledger batches.
///
/// Only batches with `journal_source_type` count. The event amount is the
/// net debit minus credit on `control_accounts`; batches that net to zero
/// are skipped.
#[must_use]
pub fn journal_events(
    party: PartyRef,
    batches: &[PostedBatch],
    journal_source_type: &str,
    control_accounts: &[String],
) -> Vec<LedgerEvent> {
    let controls: HashSet<&str> = control_accounts.iter().map(String::as_str).collect();

    batches
        .iter()
        .filter(|b| b.batch.key.source_type == journal_source_type)
        .filter(|b| b.batch.counterparty == Some(party))
        .filter_map(|b| {
            let net: Decimal = b
                .entries
                .iter()
                .filter(|e| controls.contains(e.account_code.as_str()))
                .map(crate::ledger::GlEntry::signed_amount)
                .sum();
            (!net.is_zero()).then(|| LedgerEvent {
                id: EventId {
                    kind: EventKind::JournalAdjustment,
                    source_id: b.batch.id.into_inner(),
                    line: 0,
                },
                party,
                amount: net.abs(),
                currency: b.batch.currency.clone(),
                occurred_at: b.batch.created_at,
                flow: Flow::of_signed(net),
            })
        })
        .collect()
}
