//! Error Recovery Strategies
//!
//! Severity assessment and retry classification for [`AcvpError`].

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use super::AcvpError;

/// Error recovery strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorRecoveryStrategy {
    /// Retry the whole operation later.
    Retry {
        /// Maximum number of retry attempts.
        max_attempts: usize,
        /// Base delay between retries in milliseconds.
        delay_ms: u64,
    },
    /// Fail immediately without recovery.
    Fail,
}

/// Error severity level.
///
/// Used to classify errors by their impact on the validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Low severity - minimal impact.
    Low = 1,
    /// Medium severity - the current request failed.
    Medium = 2,
    /// High severity - configuration or trust problem.
    High = 3,
    /// Critical severity - results cannot be trusted.
    Critical = 4,
}

/// Attempt error recovery based on error kind.
///
/// Only transport failures without a status, or with a server-side (5xx)
/// status, are worth retrying. Token errors are handled inside the session.
#[must_use]
pub fn attempt_error_recovery(error: &AcvpError) -> Option<ErrorRecoveryStrategy> {
    match error {
        AcvpError::TransportFailure { status: None, .. } => {
            Some(ErrorRecoveryStrategy::Retry { max_attempts: 3, delay_ms: 1000 })
        }
        AcvpError::TransportFailure { status: Some(code), .. } if *code >= 500 => {
            Some(ErrorRecoveryStrategy::Retry { max_attempts: 3, delay_ms: 5000 })
        }
        AcvpError::TokenInvalid | AcvpError::CryptoModuleFailure(_) => {
            Some(ErrorRecoveryStrategy::Fail)
        }
        AcvpError::NoContext
        | AcvpError::MissingArgument(_)
        | AcvpError::InvalidArgument(_)
        | AcvpError::MalformedDocument(_)
        | AcvpError::UnsupportedOperation(_)
        | AcvpError::TransportFailure { .. }
        | AcvpError::TokenExpired
        | AcvpError::NoToken
        | AcvpError::AllocationFailure(_)
        | AcvpError::IoError(_) => None,
    }
}

/// Get error severity for reporting.
#[must_use]
pub fn get_error_severity(error: &AcvpError) -> ErrorSeverity {
    match error {
        AcvpError::CryptoModuleFailure(_) => ErrorSeverity::Critical,

        AcvpError::TokenInvalid | AcvpError::NoToken | AcvpError::NoContext => ErrorSeverity::High,

        AcvpError::TransportFailure { .. }
        | AcvpError::TokenExpired
        | AcvpError::AllocationFailure(_)
        | AcvpError::IoError(_) => ErrorSeverity::Medium,

        AcvpError::MissingArgument(_)
        | AcvpError::InvalidArgument(_)
        | AcvpError::MalformedDocument(_)
        | AcvpError::UnsupportedOperation(_) => ErrorSeverity::Low,
    }
}
