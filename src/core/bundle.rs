//! Credential bundle type.
//!
//! A bundle is a JSON object with at least `application_username` and
//! `client_id` string fields. Any additional fields are kept as-is so the
//! installed file is byte-identical to what mint published.
//!
//! Parsed string values are wiped when a bundle is dropped.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use zeroize::Zeroize;

use crate::error::BundleError;

/// Fields every bundle must carry as non-empty strings.
pub const REQUIRED_FIELDS: [&str; 2] = ["application_username", "client_id"];

/// A validated credential bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialBundle {
    fields: Map<String, Value>,
}

impl CredentialBundle {
    /// Parse and validate raw bundle bytes.
    ///
    /// # Errors
    ///
    /// Returns `BundleError` if the bytes are not a JSON object or any
    /// required field is missing, non-string, or empty.
    pub fn parse(bytes: &[u8]) -> Result<Self, BundleError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| BundleError::NotJson(e.to_string()))?;

        let Value::Object(fields) = value else {
            return Err(BundleError::NotAnObject);
        };

        for name in REQUIRED_FIELDS {
            match fields.get(name) {
                None => return Err(BundleError::MissingField(name)),
                Some(Value::String(s)) if s.is_empty() => {
                    return Err(BundleError::EmptyField(name))
                }
                Some(Value::String(_)) => {}
                Some(_) => return Err(BundleError::WrongType(name)),
            }
        }

        Ok(Self { fields })
    }

    /// Compare against the previously installed bundle.
    ///
    /// Reports field names only, never values.
    pub fn changes_since(&self, previous: Option<&CredentialBundle>) -> BundleChanges {
        let empty = Map::new();
        let old = previous.map(|b| &b.fields).unwrap_or(&empty);

        let mut changes = BundleChanges::default();
        for (name, value) in &self.fields {
            match old.get(name) {
                None => changes.added.push(name.clone()),
                Some(prev) if prev != value => changes.changed.push(name.clone()),
                Some(_) => {}
            }
        }
        for name in old.keys() {
            if !self.fields.contains_key(name) {
                changes.removed.push(name.clone());
            }
        }
        changes
    }
}

impl Drop for CredentialBundle {
    fn drop(&mut self) {
        for value in self.fields.values_mut() {
            scrub(value);
        }
    }
}

/// Overwrite every string inside `value`.
fn scrub(value: &mut Value) {
    match value {
        Value::String(s) => s.zeroize(),
        Value::Array(items) => items.iter_mut().for_each(scrub),
        Value::Object(fields) => fields.values_mut().for_each(scrub),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Field-level difference between two bundles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleChanges {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
}

impl BundleChanges {
    /// Per-field status keyed by name, for structured logging.
    pub fn by_field(&self) -> BTreeMap<&str, &'static str> {
        let mut map = BTreeMap::new();
        for name in &self.added {
            map.insert(name.as_str(), "added");
        }
        for name in &self.changed {
            map.insert(name.as_str(), "changed");
        }
        for name in &self.removed {
            map.insert(name.as_str(), "removed");
        }
        map
    }
}

impl std::fmt::Display for BundleChanges {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .by_field()
            .into_iter()
            .map(|(name, status)| format!("{}={}", name, status))
            .collect();
        if parts.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}
