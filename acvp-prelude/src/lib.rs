//! ACVP Prelude Crate
//!
//! This crate provides the error taxonomy and protocol constants shared by
//! every crate of the ACVP client.
//!
//! # Overview
//!
//! The Automated Cryptographic Validation Protocol exchanges versioned JSON
//! documents with a validation server. Every component of the client (codec,
//! harness, transport) reports failures through [`AcvpError`] so that callers
//! see a single, stable error kind per failure class.
//!
//! # Example
//!
//! ```rust
//! use acvp_prelude::prelude::{AcvpError, Result};
//!
//! fn require_tg_id(tg_id: Option<u64>) -> Result<u64> {
//!     tg_id.ok_or_else(|| AcvpError::MalformedDocument("missing tgId".to_string()))
//! }
//!
//! assert!(require_tg_id(None).is_err());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

/// Prelude module containing all commonly used types and constants.
pub mod prelude;

pub use prelude::*;
