//! Per-user profile record (`users/<mobile>/profile.json`)
//!
//! A flat JSON object. The fixed keys below always exist after a load;
//! any other key a caller stores is carried through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use photocap_auth::Mobile;

/// Keys every loaded profile has
pub const PROFILE_KEYS: [&str; 6] = ["mobile", "name", "email", "state", "district", "address"];

/// Profile record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile {
    fields: Map<String, Value>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String value of `key`, empty when missing or not a string
    pub fn text(&self, key: &str) -> &str {
        self.fields.get(key).and_then(Value::as_str).unwrap_or("")
    }

    pub fn set<V: Into<Value>>(&mut self, key: &str, value: V) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn mobile(&self) -> &str {
        self.text("mobile")
    }

    pub fn name(&self) -> &str {
        self.text("name")
    }

    pub fn email(&self) -> &str {
        self.text("email")
    }

    /// Insert missing fixed keys. Existing values, even empty ones, stay.
    /// Returns whether anything was added.
    pub fn fill_defaults(&mut self, mobile: &Mobile) -> bool {
        let mut changed = false;
        for key in PROFILE_KEYS {
            if !self.fields.contains_key(key) {
                let value = if key == "mobile" { mobile.as_str() } else { "" };
                self.fields.insert(key.to_string(), Value::from(value));
                changed = true;
            }
        }
        changed
    }

    /// Copy non-blank string values of the fixed keys from `legacy` into
    /// fields that are blank here. Returns whether anything changed.
    pub fn absorb_blank_fields(&mut self, legacy: &Map<String, Value>) -> bool {
        let mut changed = false;
        for key in PROFILE_KEYS {
            let incoming = match legacy.get(key).and_then(Value::as_str).map(str::trim) {
                Some(v) if !v.is_empty() => v,
                _ => continue,
            };
            if self.text(key).trim().is_empty() {
                self.set(key, incoming);
                changed = true;
            }
        }
        changed
    }
}
