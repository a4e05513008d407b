//! Settlement domain types.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{SettlementId, UserId};

use super::error::SettlementError;
use crate::party::PartyRef;
use crate::timeline::EventWindow;

/// An inclusive range of UTC calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SettlementPeriod {
    /// First day.
    pub start: NaiveDate,
    /// Last day, inclusive.
    pub end: NaiveDate,
}

impl SettlementPeriod {
    /// Creates a period.
    ///
    /// # Errors
    ///
    /// Returns `SettlementError::InvalidPeriod` if `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, SettlementError> {
        if end < start {
            return Err(SettlementError::InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    /// Midnight UTC at the start of the first day.
    #[must_use]
    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// Midnight UTC after the last day.
    #[must_use]
    pub fn end_exclusive(&self) -> DateTime<Utc> {
        self.end
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX)
            .and_time(NaiveTime::MIN)
            .and_utc()
    }

    /// The half-open window of instants the period covers.
    #[must_use]
    pub fn window(&self) -> EventWindow {
        EventWindow::between(self.start_instant(), self.end_exclusive())
    }
}

/// Amounts the business owes the party, by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rights {
    /// Goods the party supplied into inventory.
    pub inventory: Decimal,
    /// Revenue shares.
    pub sales_share: Decimal,
    /// Pre-orders the party fulfilled.
    pub pre_orders: Decimal,
    /// Exchange transactions.
    pub exchange: Decimal,
    /// Services the party rendered.
    pub services_rendered: Decimal,
    /// Goods the party returned.
    pub returns: Decimal,
}

impl Rights {
    /// Sum of every category.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.inventory
            + self.sales_share
            + self.pre_orders
            + self.exchange
            + self.services_rendered
            + self.returns
    }
}

/// Amounts the party owes the business, by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Obligations {
    /// Sales, invoices and pre-orders placed by the party.
    pub sales: Decimal,
    /// Service orders.
    pub services: Decimal,
    /// Damaged goods charges.
    pub damaged_goods: Decimal,
    /// Expenses charged back.
    pub expense_charge_backs: Decimal,
    /// Goods returned to the party.
    pub returns: Decimal,
}

impl Obligations {
    /// Sum of every category.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.sales + self.services + self.damaged_goods + self.expense_charge_backs + self.returns
    }
}

/// Payment sums for the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Payments {
    /// Received from the party.
    pub ins: Decimal,
    /// Paid to the party.
    pub outs: Decimal,
}

impl Payments {
    /// `ins - outs`.
    #[must_use]
    pub fn net(&self) -> Decimal {
        self.ins - self.outs
    }
}

/// Approval state. Draft is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SettlementStatus {
    /// Freely recomputable.
    Draft,
    /// Frozen.
    Approved {
        /// Approver identity.
        approved_by: UserId,
        /// Approval time.
        approved_at: DateTime<Utc>,
    },
}

/// A computed settlement not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementDraft {
    /// The party.
    pub party: PartyRef,
    /// Settlement this one continues from.
    pub previous_settlement_id: Option<SettlementId>,
    /// Covered days.
    pub period: SettlementPeriod,
    /// Starting balance.
    pub opening_balance: Decimal,
    /// Amounts owed to the party.
    pub rights: Rights,
    /// Amounts owed by the party.
    pub obligations: Obligations,
    /// Payments.
    pub payments: Payments,
    /// Net journal adjustments; positive raises the balance.
    pub adjustments: Decimal,
    /// `opening + obligations - rights - payments.net + adjustments`.
    pub closing_balance: Decimal,
    /// Computation time.
    pub computed_at: DateTime<Utc>,
}

/// A persisted settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Settlement id.
    pub id: SettlementId,
    /// The party.
    pub party: PartyRef,
    /// Settlement this one continues from.
    pub previous_settlement_id: Option<SettlementId>,
    /// Covered days.
    pub period: SettlementPeriod,
    /// Starting balance.
    pub opening_balance: Decimal,
    /// Amounts owed to the party.
    pub rights: Rights,
    /// Amounts owed by the party.
    pub obligations: Obligations,
    /// Payments.
    pub payments: Payments,
    /// Net journal adjustments.
    pub adjustments: Decimal,
    /// Closing balance.
    pub closing_balance: Decimal,
    /// Approval state.
    pub status: SettlementStatus,
    /// Computation time.
    pub computed_at: DateTime<Utc>,
}

impl Settlement {
    /// Materializes a draft under `id`.
    #[must_use]
    pub fn from_draft(id: SettlementId, draft: SettlementDraft) -> Self {
        Self {
            id,
            party: draft.party,
            previous_settlement_id: draft.previous_settlement_id,
            period: draft.period,
            opening_balance: draft.opening_balance,
            rights: draft.rights,
            obligations: draft.obligations,
            payments: draft.payments,
            adjustments: draft.adjustments,
            closing_balance: draft.closing_balance,
            status: SettlementStatus::Draft,
            computed_at: draft.computed_at,
        }
    }

    /// Returns true once approved.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self.status, SettlementStatus::Approved { .. })
    }

    /// Freezes the settlement.
    ///
    /// # Errors
    ///
    /// Returns `SettlementError::AlreadyApproved` if it is already frozen.
    pub fn approve(&mut self, approved_by: UserId, approved_at: DateTime<Utc>) -> Result<(), SettlementError> {
        match self.status {
            SettlementStatus::Draft => {
                self.status = SettlementStatus::Approved {
                    approved_by,
                    approved_at,
                };
                Ok(())
            }
            SettlementStatus::Approved { .. } => Err(SettlementError::AlreadyApproved(self.id)),
        }
    }
}
