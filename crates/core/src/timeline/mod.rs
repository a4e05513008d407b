//! Party balance timelines.
//!
//! Every source that can move a party's balance is normalized once into a
//! [`LedgerEvent`]. The builder prices each event at its own instant,
//! orders them and accumulates a running balance that is compared with the
//! party's cached balance.

pub mod builder;
pub mod documents;
pub mod error;
pub mod events;
pub mod memory;
pub mod service;

#[cfg(test)]
mod builder_props;

pub use builder::{BalanceDriftWarning, BalanceTimeline, TimelineBuilder, TimelineEntry};
pub use documents::{
    DocumentHeader, DocumentStatus, ExpenseNature, InstrumentStatus, ManualInstrument, Payment,
    PaymentDirection, PaymentSplit, PaymentStatus, SourceDocument, journal_events,
};
pub use error::TimelineError;
pub use events::{EventId, EventKind, EventWindow, Flow, LedgerEvent};
pub use memory::{InMemoryFeed, InMemoryParties};
pub use service::{BalanceService, DocumentFeed, PartyDirectory, Reconciliation, TimelineConfig};
