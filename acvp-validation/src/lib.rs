#![deny(unsafe_code)]
#![allow(missing_docs)]
#![warn(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! ACVP Validation
//!
//! Document-driven test execution for the ACVP client.
//!
//! ## Modules
//!
//! - **codec**: Bounds-checked hex/binary conversion
//! - **registry**: Capability registry and crypto handler seam
//! - **document**: Envelope handling and the response document
//! - **testcase**: Per-algorithm test-case records (hash, CMAC)
//! - **mct**: Monte Carlo Test iteration engine
//! - **harness**: The vector-set processing loop
//! - **registration**: Test session request builder

pub mod codec;
pub mod document;
pub mod harness;
pub mod mct;
pub mod registration;
pub mod registry;
pub mod testcase;

// Re-exports
pub use codec::*;
pub use document::*;
pub use harness::*;
pub use mct::*;
pub use registration::*;
pub use registry::*;
pub use testcase::*;
