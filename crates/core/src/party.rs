//! Counterparties whose balances the ledger tracks.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The closed set of counterparty kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyKind {
    /// Buys goods or services from the business.
    Customer,
    /// Sells goods or services to the business.
    Supplier,
    /// Shares revenue with the business or fulfils orders on its behalf.
    Partner,
    /// Staff member with a running account (advances, staff purchases).
    Employee,
}

impl PartyKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::Supplier => "SUPPLIER",
            Self::Partner => "PARTNER",
            Self::Employee => "EMPLOYEE",
        }
    }

    /// Parses a kind from a string, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CUSTOMER" => Some(Self::Customer),
            "SUPPLIER" => Some(Self::Supplier),
            "PARTNER" => Some(Self::Partner),
            "EMPLOYEE" => Some(Self::Employee),
            _ => None,
        }
    }

    /// Returns true if the party fulfils pre-orders for the business
    /// rather than placing them.
    #[must_use]
    pub const fn fulfils_pre_orders(&self) -> bool {
        match self {
            Self::Supplier | Self::Partner => true,
            Self::Customer | Self::Employee => false,
        }
    }
}

impl fmt::Display for PartyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to one counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartyRef {
    /// The kind of counterparty.
    pub kind: PartyKind,
    /// The counterparty's id within its kind.
    pub id: i64,
}

impl PartyRef {
    /// Creates a new party reference.
    #[must_use]
    pub const fn new(kind: PartyKind, id: i64) -> Self {
        Self { kind, id }
    }

    /// Shorthand for a customer reference.
    #[must_use]
    pub const fn customer(id: i64) -> Self {
        Self::new(PartyKind::Customer, id)
    }

    /// Shorthand for a supplier reference.
    #[must_use]
    pub const fn supplier(id: i64) -> Self {
        Self::new(PartyKind::Supplier, id)
    }

    /// Shorthand for a partner reference.
    #[must_use]
    pub const fn partner(id: i64) -> Self {
        Self::new(PartyKind::Partner, id)
    }
}

impl fmt::Display for PartyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// Balance fields carried by a counterparty record.
///
/// Both values are in the base currency. Positive means the party owes the business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyBalances {
    /// The party.
    pub party: PartyRef,
    /// Immutable origin balance.
    pub opening_balance: Decimal,
    /// Cached current balance; must equal the replayed history.
    pub cached_balance: Decimal,
}
