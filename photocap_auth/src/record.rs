//! On-disk credential record (`users/<mobile>/auth.json`)

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crypto::PinHash;
use crate::input::Mobile;

/// Credential record. Unknown keys survive a rewrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(default)]
    pub mobile: String,

    #[serde(default)]
    pub pin_salt: String,

    #[serde(default)]
    pub pin_hash: String,

    #[serde(default)]
    pub created_at: i64,

    #[serde(default)]
    pub updated_at: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_attempts: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failed_at: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of reading a record from disk
#[derive(Debug)]
pub enum LoadedRecord {
    Missing,
    Corrupt,
    Found(CredentialRecord),
}

impl CredentialRecord {
    pub fn new(mobile: &Mobile, now: i64) -> Self {
        Self {
            mobile: mobile.to_string(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }

    /// Salt and hash are both present
    pub fn is_initialized(&self) -> bool {
        !self.pin_salt.is_empty() && !self.pin_hash.is_empty()
    }

    pub fn failed(&self) -> u32 {
        self.failed_attempts.unwrap_or(0)
    }

    pub fn last_failed(&self) -> i64 {
        self.last_failed_at.unwrap_or(0)
    }

    /// Install a new salt/hash pair
    pub fn set_pin(&mut self, hash: PinHash, now: i64) {
        self.pin_salt = hash.salt_hex;
        self.pin_hash = hash.hash_hex;
        self.updated_at = now;
    }

    pub fn record_failure(&mut self, now: i64) -> u32 {
        let failed = self.failed().saturating_add(1);
        self.failed_attempts = Some(failed);
        self.last_failed_at = Some(now);
        failed
    }

    pub fn clear_throttle(&mut self) {
        self.failed_attempts = None;
        self.last_failed_at = None;
    }

    /// Read a record. `null` reads as an empty record, anything else that
    /// is not a JSON object is corrupt.
    pub fn load(path: &Path) -> io::Result<LoadedRecord> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LoadedRecord::Missing),
            Err(e) => return Err(e),
        };

        let value: Value = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(_) => return Ok(LoadedRecord::Corrupt),
        };

        match value {
            Value::Null => Ok(LoadedRecord::Found(Self::default())),
            Value::Object(_) => match serde_json::from_value(value) {
                Ok(record) => Ok(LoadedRecord::Found(record)),
                Err(_) => Ok(LoadedRecord::Corrupt),
            },
            _ => Ok(LoadedRecord::Corrupt),
        }
    }
}
