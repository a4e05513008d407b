//! The uniform event type every balance-affecting source normalizes into.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::CurrencyCode;

use crate::party::PartyRef;

/// Direction of value between the business and the party.
///
/// A party's balance is the amount it owes the business. Outbound value
/// (business to party) raises it; inbound value (party to business) lowers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    /// Party to business: returns, incoming payments, services by the party.
    Inbound,
    /// Business to party: sales, services, charge-backs, outgoing payments.
    Outbound,
}

impl Flow {
    /// Applies the direction to a non-negative amount.
    #[must_use]
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            Self::Outbound => amount,
            Self::Inbound => -amount,
        }
    }

    /// The opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Inbound => Self::Outbound,
            Self::Outbound => Self::Inbound,
        }
    }

    /// Direction of a signed amount: positive is outbound.
    #[must_use]
    pub fn of_signed(amount: Decimal) -> Self {
        if amount.is_sign_negative() {
            Self::Inbound
        } else {
            Self::Outbound
        }
    }
}

/// What produced an event. Declaration order is the tie-break ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Confirmed sale to the party.
    Sale,
    /// Invoice issued to the party.
    Invoice,
    /// Confirmed service order for the party.
    ServiceOrder,
    /// Pre-order placed by or fulfilled by the party.
    PreOrder,
    /// Online pre-order placed by or fulfilled by the party.
    OnlinePreOrder,
    /// Goods the party supplied into inventory.
    InventoryReceipt,
    /// Revenue share owed to the party.
    SalesShare,
    /// Exchange transaction credited to the party.
    ExchangeTransaction,
    /// Damaged goods charged to the party.
    DamagedGoods,
    /// Expense for a service the party rendered.
    ServiceRendered,
    /// Expense charged back to the party.
    ChargeBack,
    /// Goods the party returned.
    SaleReturn,
    /// Goods the business returned to the party.
    PurchaseReturn,
    /// One split of a payment.
    Payment,
    /// Manual instrument (cheque, promissory note) not linked to a payment.
    Instrument,
    /// Reversal of a returned or bounced instrument.
    InstrumentReturned,
    /// Net effect of a manual journal batch on the party's control accounts.
    JournalAdjustment,
}

/// Stable identity of an event, used as the ordering tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId {
    /// Producing kind.
    pub kind: EventKind,
    /// Source document or batch id.
    pub source_id: i64,
    /// Line within the source (payment split index, otherwise 0).
    pub line: u32,
}

/// One balance-affecting event in the party's native document currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Identity and tie-break key.
    pub id: EventId,
    /// The party affected.
    pub party: PartyRef,
    /// Non-negative amount in `currency`.
    pub amount: Decimal,
    /// Document currency.
    pub currency: CurrencyCode,
    /// When the event took effect; also the FX as-of instant.
    pub occurred_at: DateTime<Utc>,
    /// Direction of value.
    pub flow: Flow,
}

impl LedgerEvent {
    /// The producing kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.id.kind
    }

    /// Chronological order, ties broken by id.
    #[must_use]
    pub fn chronological(&self, other: &Self) -> std::cmp::Ordering {
        self.occurred_at
            .cmp(&other.occurred_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Optional `[from, until)` bounds on event instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventWindow {
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub until: Option<DateTime<Utc>>,
}

impl EventWindow {
    /// The unbounded window.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            from: None,
            until: None,
        }
    }

    /// Everything at or after `from`.
    #[must_use]
    pub const fn since(from: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            until: None,
        }
    }

    /// `[from, until)`.
    #[must_use]
    pub const fn between(from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            until: Some(until),
        }
    }

    /// Returns true if `instant` falls inside the window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| instant >= from) && self.until.is_none_or(|until| instant < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flow_sign_convention() {
        assert_eq!(Flow::Outbound.signed(dec!(1000)), dec!(1000));
        assert_eq!(Flow::Inbound.signed(dec!(600)), dec!(-600));
        assert_eq!(Flow::Inbound.reversed(), Flow::Outbound);
        assert_eq!(Flow::of_signed(dec!(-1)), Flow::Inbound);
        assert_eq!(Flow::of_signed(dec!(1)), Flow::Outbound);
    }

    #[test]
    fn test_event_id_orders_by_kind_then_source_then_line() {
        let a = EventId {
            kind: EventKind::Sale,
            source_id: 9,
            line: 0,
        };
        let b = EventId {
            kind: EventKind::Payment,
            source_id: 1,
            line: 0,
        };
        let c = EventId {
            kind: EventKind::Payment,
            source_id: 1,
            line: 1,
        };
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_window_is_half_open() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let window = EventWindow::between(start, end);
        assert!(window.contains(start));
        assert!(!window.contains(end));
        assert!(EventWindow::all().contains(end));
        assert!(!EventWindow::since(end).contains(start));
    }
}
