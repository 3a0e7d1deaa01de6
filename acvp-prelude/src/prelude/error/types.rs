//! Core Error Types for the ACVP client
//!
//! One variant per failure kind. Validation kinds abort the current vector
//! set, transport kinds abort the current request.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use thiserror::Error;

/// Error type conversion implementations.
pub mod conversions;
/// Error recovery strategies and utilities.
pub mod recovery;

/// Result type alias for ACVP operations
pub type Result<T> = std::result::Result<T, AcvpError>;

/// Error type for all ACVP client operations
#[derive(Debug, Error, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AcvpError {
    /// A required session or context handle was not supplied
    #[error("No session context")]
    NoContext,
    /// A required field is absent from a document or the configuration
    #[error("Missing argument: {0}")]
    MissingArgument(String),
    /// A field is present but malformed, oversized or inconsistent
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The document failed to parse or lacks its required structure
    #[error("Malformed document: {0}")]
    MalformedDocument(String),
    /// The algorithm or operation is not registered
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// The registered crypto handler reported a failure
    #[error("Crypto module failure: {0}")]
    CryptoModuleFailure(String),
    /// Network or HTTP failure after the refresh retry was spent
    #[error("Transport failure (status {status:?}): {message}")]
    TransportFailure {
        /// HTTP status code, when the server answered
        status: Option<u16>,
        /// Failure description
        message: String,
    },
    /// The bearer token expired
    #[error("Access token expired")]
    TokenExpired,
    /// The bearer token signature was rejected
    #[error("Access token invalid")]
    TokenInvalid,
    /// No usable access token was returned or held
    #[error("No access token")]
    NoToken,
    /// A buffer could not be sized for the requested data
    #[error("Allocation failure: {0}")]
    AllocationFailure(String),
    /// I/O operation failed
    #[error("I/O error: {0}")]
    IoError(String),
}

impl AcvpError {
    /// Transport failure without an HTTP status.
    pub fn transport(message: impl Into<String>) -> Self {
        AcvpError::TransportFailure { status: None, message: message.into() }
    }

    /// Transport failure carrying the HTTP status the server returned.
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        AcvpError::TransportFailure { status: Some(status), message: message.into() }
    }

    /// Whether this error belongs to the validation kinds (missing, invalid, malformed).
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AcvpError::MissingArgument(_)
                | AcvpError::InvalidArgument(_)
                | AcvpError::MalformedDocument(_)
        )
    }
}

// Re-export recovery types and functions
pub use recovery::{
    ErrorRecoveryStrategy, ErrorSeverity, attempt_error_recovery, get_error_severity,
};
