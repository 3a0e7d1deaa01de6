#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! HTTP status classification.
//!
//! A 401 carries a JSON body whose `error` field tells an expired token
//! apart from one with a bad signature. Only the former is worth a refresh.

use acvp_prelude::prelude::{JWT_EXPIRED_MSG, JWT_INVALID_MSG};
use serde_json::Value;

/// Outcome of inspecting a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDisposition {
    /// 200.
    Success,
    /// 401 with the expired-token error.
    TokenExpired,
    /// 401 with the signature-mismatch error.
    TokenInvalid,
    /// Anything else.
    Failed,
}

/// Classify a status code and response body.
#[must_use]
pub fn inspect_status(status: u16, body: &[u8]) -> StatusDisposition {
    match status {
        200 => StatusDisposition::Success,
        401 => classify_unauthorized(body),
        _ => StatusDisposition::Failed,
    }
}

fn classify_unauthorized(body: &[u8]) -> StatusDisposition {
    let Ok(doc) = serde_json::from_slice::<Value>(body) else {
        return StatusDisposition::Failed;
    };
    let error = match &doc {
        Value::Object(obj) => obj.get("error"),
        Value::Array(items) => items.iter().find_map(|item| item.get("error")),
        _ => None,
    };
    match error.and_then(Value::as_str) {
        Some(msg) if msg.starts_with(JWT_EXPIRED_MSG) => StatusDisposition::TokenExpired,
        Some(msg) if msg.starts_with(JWT_INVALID_MSG) => StatusDisposition::TokenInvalid,
        _ => StatusDisposition::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_and_generic_failure() {
        assert_eq!(inspect_status(200, b""), StatusDisposition::Success);
        assert_eq!(inspect_status(500, b"{\"error\":\"JWT expired\"}"), StatusDisposition::Failed);
        assert_eq!(inspect_status(403, b""), StatusDisposition::Failed);
    }

    #[test]
    fn test_unauthorized_classification() {
        assert_eq!(
            inspect_status(401, br#"{"error":"JWT expired at 2026-10-16T10:00:00Z"}"#),
            StatusDisposition::TokenExpired
        );
        assert_eq!(
            inspect_status(401, br#"{"error":"JWT signature does not match locally computed signature"}"#),
            StatusDisposition::TokenInvalid
        );
        assert_eq!(
            inspect_status(401, br#"[{"acvVersion":"1.0"},{"error":"JWT expired"}]"#),
            StatusDisposition::TokenExpired
        );
    }

    #[test]
    fn test_unauthorized_without_known_error_is_failure() {
        assert_eq!(inspect_status(401, b"not json"), StatusDisposition::Failed);
        assert_eq!(inspect_status(401, br#"{"message":"JWT expired"}"#), StatusDisposition::Failed);
        assert_eq!(inspect_status(401, br#"{"error":"Invalid credentials"}"#), StatusDisposition::Failed);
    }
}
