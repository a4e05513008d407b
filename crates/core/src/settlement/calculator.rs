//! Pure settlement aggregation over priced timeline entries.

use rust_decimal::Decimal;

use super::types::{Obligations, Payments, Rights};
use crate::timeline::{EventKind, Flow, TimelineEntry};

/// Category sums for one period, in the base currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodTotals {
    /// Amounts owed to the party.
    pub rights: Rights,
    /// Amounts owed by the party.
    pub obligations: Obligations,
    /// Payment sums.
    pub payments: Payments,
    /// Net journal adjustments.
    pub adjustments: Decimal,
}

impl PeriodTotals {
    /// Aggregates priced entries by category.
    #[must_use]
    pub fn from_entries(entries: &[TimelineEntry]) -> Self {
        let mut totals = Self::default();
        for entry in entries {
            totals.add(entry);
        }
        totals
    }

    fn add(&mut self, entry: &TimelineEntry) {
        let amount = entry.base_amount;
        let flow = entry.event.flow;
        let rights = &mut self.rights;
        let obligations = &mut self.obligations;
        let payments = &mut self.payments;

        match entry.event.kind() {
            EventKind::Sale | EventKind::Invoice => obligations.sales += amount,
            EventKind::ServiceOrder => obligations.services += amount,
            EventKind::DamagedGoods => obligations.damaged_goods += amount,
            EventKind::ChargeBack => obligations.expense_charge_backs += amount,
            EventKind::PurchaseReturn => obligations.returns += amount,
            EventKind::PreOrder | EventKind::OnlinePreOrder => match flow {
                Flow::Outbound => obligations.sales += amount,
                Flow::Inbound => rights.pre_orders += amount,
            },
            EventKind::InventoryReceipt => rights.inventory += amount,
            EventKind::SalesShare => rights.sales_share += amount,
            EventKind::ExchangeTransaction => rights.exchange += amount,
            EventKind::ServiceRendered => rights.services_rendered += amount,
            EventKind::SaleReturn => rights.returns += amount,
            EventKind::Payment | EventKind::Instrument => match flow {
                Flow::Inbound => payments.ins += amount,
                Flow::Outbound => payments.outs += amount,
            },
            // A bounce carries the reversed flow of the instrument it undoes.
            EventKind::InstrumentReturned => match flow {
                Flow::Outbound => payments.ins -= amount,
                Flow::Inbound => payments.outs -= amount,
            },
            EventKind::JournalAdjustment => self.adjustments += entry.signed_amount,
        }
    }

    /// Closing balance reached from `opening`.
    #[must_use]
    pub fn closing_from(&self, opening: Decimal) -> Decimal {
        opening + self.obligations.total() - self.rights.total() - self.payments.net()
            + self.adjustments
    }
}
