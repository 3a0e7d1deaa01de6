//! Versioned document envelope.
//!
//! Every ACVP document travels as `[{"acvVersion": "1.0"}, { ... }]`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use serde_json::{Map, Value, json};

use super::error::{AcvpError, Result};
use super::protocol::{ACV_VERSION, ACV_VERSION_KEY};

/// Return the payload object of a document.
///
/// Accepts the versioned two-element array or a bare object.
///
/// # Errors
/// [`AcvpError::MalformedDocument`] if neither shape matches.
pub fn unwrap_envelope(doc: &Value) -> Result<&Map<String, Value>> {
    match doc {
        Value::Object(obj) => Ok(obj),
        Value::Array(items) => {
            let has_version = items
                .first()
                .and_then(Value::as_object)
                .is_some_and(|v| v.contains_key(ACV_VERSION_KEY));
            if !has_version {
                return Err(AcvpError::MalformedDocument("missing acvVersion element".to_string()));
            }
            items.get(1).and_then(Value::as_object).ok_or_else(|| {
                AcvpError::MalformedDocument("envelope has no payload object".to_string())
            })
        }
        _ => Err(AcvpError::MalformedDocument("document is not an object or array".to_string())),
    }
}

/// Wrap a payload in the versioned envelope.
#[must_use]
pub fn wrap_envelope(payload: Value) -> Value {
    json!([{ ACV_VERSION_KEY: ACV_VERSION }, payload])
}
