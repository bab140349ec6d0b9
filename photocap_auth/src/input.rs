//! Mobile number, PIN and date-key validation
//!
//! The mobile number is the only user identifier in PhotoCap. Every store
//! path is derived from a [`Mobile`], so a value of this type is always
//! exactly ten ASCII digits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Length of a normalized mobile number
pub const MOBILE_LEN: usize = 10;

/// Accepted PIN lengths
pub const PIN_MIN_LEN: usize = 4;
pub const PIN_MAX_LEN: usize = 6;

/// Normalized 10-digit mobile number
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Mobile(String);

impl Mobile {
    /// Strip every non-digit and require exactly ten digits.
    ///
    /// An international prefix written with a leading `+` (one to three
    /// country-code digits) is dropped first, so `+91 98765-43210` and
    /// `98765 43210` name the same user.
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let trimmed = raw.trim();
        let mut digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
        if trimmed.starts_with('+') && (MOBILE_LEN + 1..=MOBILE_LEN + 3).contains(&digits.len()) {
            digits = digits.split_off(digits.len() - MOBILE_LEN);
        }
        if digits.len() != MOBILE_LEN {
            return Err(InputError::Mobile);
        }
        Ok(Self(digits))
    }

    /// Accept only names that already are a normalized number (directory scans)
    pub fn from_exact(name: &str) -> Option<Self> {
        if name.len() == MOBILE_LEN && name.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(name.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mobile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Mobile {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Mobile {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Mobile> for String {
    fn from(value: Mobile) -> Self {
        value.0
    }
}

/// PIN must be 4-6 ASCII digits, nothing else
pub fn validate_pin(pin: &str) -> Result<(), InputError> {
    let ok = (PIN_MIN_LEN..=PIN_MAX_LEN).contains(&pin.len())
        && pin.bytes().all(|b| b.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(InputError::Pin)
    }
}

/// Date keys bucket uploads per day: `YYYYMMDD`
pub fn validate_date_key(key: &str) -> Result<(), InputError> {
    if key.len() == 8 && key.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(InputError::DateKey(key.to_string()))
    }
}
