//! Currency codes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ISO 4217 currency code (three uppercase ASCII letters).
///
/// The code set is open: rates and documents may reference any currency,
/// so the code is validated by shape rather than against a closed list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

/// Error returned when a string is not a valid currency code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid currency code: '{0}'")]
pub struct InvalidCurrencyCode(pub String);

impl CurrencyCode {
    /// Parses and normalizes a currency code (`"usd"` becomes `"USD"`).
    ///
    /// # Errors
    ///
    /// Returns an error unless the input is exactly three ASCII letters.
    pub fn parse(code: &str) -> Result<Self, InvalidCurrencyCode> {
        let trimmed = code.trim();
        if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(InvalidCurrencyCode(code.to_string()))
        }
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = InvalidCurrencyCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = InvalidCurrencyCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
