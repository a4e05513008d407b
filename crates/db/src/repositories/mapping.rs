//! Conversions between database rows and domain types.

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{DbErr, SqlErr};
use tally_core::currency::RateSource as DomainRateSource;
use tally_core::ledger::AccountClass as DomainAccountClass;
use tally_core::party::{PartyKind as DomainPartyKind, PartyRef};

use crate::entities::sea_orm_active_enums::{AccountClass, PartyKind, RateSource};

/// Returns true if the error is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub(crate) fn to_utc(at: DateTime<FixedOffset>) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

impl From<DomainPartyKind> for PartyKind {
    fn from(kind: DomainPartyKind) -> Self {
        match kind {
            DomainPartyKind::Customer => Self::Customer,
            DomainPartyKind::Supplier => Self::Supplier,
            DomainPartyKind::Partner => Self::Partner,
            DomainPartyKind::Employee => Self::Employee,
        }
    }
}

impl From<PartyKind> for DomainPartyKind {
    fn from(kind: PartyKind) -> Self {
        match kind {
            PartyKind::Customer => Self::Customer,
            PartyKind::Supplier => Self::Supplier,
            PartyKind::Partner => Self::Partner,
            PartyKind::Employee => Self::Employee,
        }
    }
}

impl From<DomainAccountClass> for AccountClass {
    fn from(class: DomainAccountClass) -> Self {
        match class {
            DomainAccountClass::Asset => Self::Asset,
            DomainAccountClass::Liability => Self::Liability,
            DomainAccountClass::Revenue => Self::Revenue,
            DomainAccountClass::Expense => Self::Expense,
            DomainAccountClass::Equity => Self::Equity,
        }
    }
}

impl From<AccountClass> for DomainAccountClass {
    fn from(class: AccountClass) -> Self {
        match class {
            AccountClass::Asset => Self::Asset,
            AccountClass::Liability => Self::Liability,
            AccountClass::Revenue => Self::Revenue,
            AccountClass::Expense => Self::Expense,
            AccountClass::Equity => Self::Equity,
        }
    }
}

impl From<DomainRateSource> for RateSource {
    fn from(source: DomainRateSource) -> Self {
        match source {
            DomainRateSource::Manual => Self::Manual,
            DomainRateSource::External => Self::External,
        }
    }
}

impl From<RateSource> for DomainRateSource {
    fn from(source: RateSource) -> Self {
        match source {
            RateSource::Manual => Self::Manual,
            RateSource::External => Self::External,
        }
    }
}

/// Rebuilds a party from the nullable entity columns.
pub(crate) fn party_from_columns(kind: Option<PartyKind>, id: Option<i64>) -> Option<PartyRef> {
    match (kind, id) {
        (Some(kind), Some(id)) => Some(PartyRef::new(kind.into(), id)),
        _ => None,
    }
}
