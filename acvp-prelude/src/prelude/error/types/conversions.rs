//! Error Type Conversions
//!
//! `From` implementations so external errors propagate with `?`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use super::AcvpError;

impl From<std::io::Error> for AcvpError {
    fn from(err: std::io::Error) -> Self {
        AcvpError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for AcvpError {
    fn from(err: serde_json::Error) -> Self {
        AcvpError::MalformedDocument(format!("JSON error: {err}"))
    }
}

impl From<std::string::FromUtf8Error> for AcvpError {
    fn from(_err: std::string::FromUtf8Error) -> Self {
        AcvpError::MalformedDocument("UTF-8 conversion error".to_string())
    }
}

impl From<hex::FromHexError> for AcvpError {
    fn from(err: hex::FromHexError) -> Self {
        AcvpError::InvalidArgument(format!("Hex decoding error: {err}"))
    }
}

impl From<std::collections::TryReserveError> for AcvpError {
    fn from(err: std::collections::TryReserveError) -> Self {
        AcvpError::AllocationFailure(err.to_string())
    }
}
