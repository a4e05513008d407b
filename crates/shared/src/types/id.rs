//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `BatchId` where a `SettlementId` is expected.
//! Ledger rows use database sequences, so most IDs wrap an `i64`; actor identities
//! supplied by the identity collaborator stay UUIDs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed wrappers around sequence-allocated `i64` keys.
macro_rules! serial_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Creates an ID from a raw database key.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw database key.
            #[must_use]
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

serial_id!(BatchId, "Unique identifier for a general-ledger batch.");
serial_id!(EntryId, "Unique identifier for a general-ledger entry.");
serial_id!(SettlementId, "Unique identifier for a party settlement.");
serial_id!(RateId, "Unique identifier for a stored exchange-rate observation.");

/// Identity of a user, as issued by the external identity provider.
///
/// Used to record who approved a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Creates a new random ID using UUID v7 (time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates an ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_serial_id_roundtrip_through_string() {
        let id = BatchId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(BatchId::from_str("42").unwrap(), id);
        assert!(SettlementId::from_str("abc").is_err());
    }

    #[test]
    fn test_serial_ids_order_by_value() {
        assert!(EntryId::new(1) < EntryId::new(2));
        assert_eq!(RateId::from(7).into_inner(), 7);
    }

    #[test]
    fn test_user_id_wraps_uuid() {
        let uuid = Uuid::now_v7();
        let id = UserId::from_uuid(uuid);
        assert_eq!(id.into_inner(), uuid);
        assert_eq!(id.to_string(), uuid.to_string());
        assert_ne!(UserId::new(), UserId::new());
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&SettlementId::new(9)).unwrap();
        assert_eq!(json, "9");
    }
}
