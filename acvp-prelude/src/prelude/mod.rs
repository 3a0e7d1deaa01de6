//! ACVP Prelude Module
//!
//! Common types and constants used throughout the ACVP client.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

/// Versioned document envelope.
pub mod envelope;
/// Error taxonomy, conversions and severity classification.
pub mod error;
/// Protocol constants.
pub mod protocol;

pub use envelope::{unwrap_envelope, wrap_envelope};
pub use error::{
    AcvpError, ErrorRecoveryStrategy, ErrorSeverity, Result, attempt_error_recovery,
    get_error_severity,
};
pub use protocol::*;
