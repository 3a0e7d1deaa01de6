//! Error Handling Module
//!
//! This module provides the error type of the ACVP client and the
//! classification helpers used when deciding whether to retry.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

/// Core error types and result handling.
pub mod types;

pub use types::{
    AcvpError, ErrorRecoveryStrategy, ErrorSeverity, Result, attempt_error_recovery,
    get_error_severity,
};
