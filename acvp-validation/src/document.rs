#![deny(unsafe_code)]
#![allow(missing_docs)]
#![warn(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Vector-set and response documents.
//!
//! Server documents arrive wrapped in a versioned envelope,
//! `[{"acvVersion": "1.0"}, { ... }]`. The helpers here strip and add that
//! envelope and read fields with the error kinds the harness reports.

pub use acvp_prelude::prelude::envelope::{unwrap_envelope, wrap_envelope};

use acvp_prelude::prelude::{AcvpError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// A JSON object.
pub type JsonObject = Map<String, Value>;

/// Parse raw document text.
///
/// # Errors
/// [`AcvpError::MalformedDocument`] if the text is not JSON.
pub fn parse_document(text: &str) -> Result<Value> {
    Ok(serde_json::from_str(text)?)
}

/// View a value as an object.
///
/// # Errors
/// [`AcvpError::MalformedDocument`] naming `what`.
pub fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a JsonObject> {
    value.as_object().ok_or_else(|| AcvpError::MalformedDocument(format!("{what} is not an object")))
}

/// Required string field.
///
/// # Errors
/// `MissingArgument` if absent, `InvalidArgument` if not a string.
pub fn get_str<'a>(obj: &'a JsonObject, key: &str) -> Result<&'a str> {
    get_opt_str(obj, key)?.ok_or_else(|| AcvpError::MissingArgument(key.to_string()))
}

/// Optional string field.
///
/// # Errors
/// `InvalidArgument` if present but not a string.
pub fn get_opt_str<'a>(obj: &'a JsonObject, key: &str) -> Result<Option<&'a str>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(AcvpError::InvalidArgument(format!("{key} is not a string"))),
    }
}

/// Required non-negative integer field.
///
/// # Errors
/// `MissingArgument` if absent, `InvalidArgument` if not an unsigned integer.
pub fn get_u64(obj: &JsonObject, key: &str) -> Result<u64> {
    get_opt_u64(obj, key)?.ok_or_else(|| AcvpError::MissingArgument(key.to_string()))
}

/// Optional non-negative integer field.
///
/// # Errors
/// `InvalidArgument` if present but not an unsigned integer.
pub fn get_opt_u64(obj: &JsonObject, key: &str) -> Result<Option<u64>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| AcvpError::InvalidArgument(format!("{key} is not an unsigned integer"))),
    }
}

/// Required array field.
///
/// # Errors
/// `MissingArgument` if absent, `InvalidArgument` if not an array.
pub fn get_array<'a>(obj: &'a JsonObject, key: &str) -> Result<&'a Vec<Value>> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(AcvpError::MissingArgument(key.to_string())),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(AcvpError::InvalidArgument(format!("{key} is not an array"))),
    }
}

/// Response for one test group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseGroup {
    pub tg_id: u64,
    pub tests: Vec<Value>,
}

impl ResponseGroup {
    #[must_use]
    pub fn new(tg_id: u64) -> Self {
        Self { tg_id, tests: Vec::new() }
    }
}

/// The document submitted back to the server for one vector set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDocument {
    pub vs_id: u64,
    pub algorithm: String,
    #[serde(rename = "testGroups")]
    pub groups: Vec<ResponseGroup>,
}

impl ResponseDocument {
    #[must_use]
    pub fn new(vs_id: u64, algorithm: impl Into<String>) -> Self {
        Self { vs_id, algorithm: algorithm.into(), groups: Vec::new() }
    }

    pub fn push_group(&mut self, group: ResponseGroup) {
        self.groups.push(group);
    }

    /// Total number of test-case responses across groups.
    #[must_use]
    pub fn test_case_count(&self) -> usize {
        self.groups.iter().map(|g| g.tests.len()).sum()
    }

    /// The response wrapped in the versioned envelope.
    ///
    /// # Errors
    /// Serialization failure.
    pub fn to_envelope(&self) -> Result<Value> {
        Ok(wrap_envelope(serde_json::to_value(self)?))
    }

    /// Serialized envelope, pretty or compact.
    ///
    /// # Errors
    /// Serialization failure.
    pub fn to_json_string(&self, pretty: bool) -> Result<String> {
        let envelope = self.to_envelope()?;
        let text = if pretty {
            serde_json::to_string_pretty(&envelope)?
        } else {
            serde_json::to_string(&envelope)?
        };
        Ok(text)
    }
}
