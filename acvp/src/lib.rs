#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! ACVP - Automated Cryptographic Validation Protocol client
//!
//! Drives a validation run against an ACVP server: log in, register the
//! capabilities of a crypto module, download each vector set, answer it
//! through the registered handlers and submit the results.
//!
//! ## Crates
//!
//! - [`acvp_prelude`]: error taxonomy and protocol constants
//! - [`acvp_validation`]: hex codec, capability registry, hash and CMAC
//!   test-case modules, Monte Carlo engine, vector-set harness
//! - [`acvp_transport`]: session configuration, TLS, refresh-and-retry
//!
//! ## Example
//!
//! ```rust,no_run
//! use acvp::{AcvpClient, CapabilityParams, CapabilityRegistry, Cipher, HashCapability};
//! use acvp::{Session, SessionConfig, TestCase};
//!
//! fn sha256(tc: &mut TestCase<'_>) -> anyhow::Result<()> {
//!     let TestCase::Hash(case) = tc else { anyhow::bail!("not a hash case") };
//!     // call into the module under test here
//!     # let _ = case;
//!     Ok(())
//! }
//!
//! # fn main() -> acvp::Result<()> {
//! let mut registry = CapabilityRegistry::new();
//! registry.register_fn(
//!     Cipher::Sha256,
//!     CapabilityParams::Hash(HashCapability::default()),
//!     sha256,
//! )?;
//!
//! let session = Session::connect(SessionConfig::from_env()?)?;
//! let mut client = AcvpClient::new(session, registry);
//! let summary = client.run(true)?;
//! println!("{} vector set(s) processed", summary.vector_sets.len());
//! # Ok(())
//! # }
//! ```

/// Run orchestration.
pub mod client;

pub use client::{AcvpClient, ClientConfig, RunSummary, Sleeper, ThreadSleeper, VectorSetOutcome};

pub use acvp_prelude::prelude::{AcvpError, ErrorSeverity, Result};
pub use acvp_transport::tracing::{TracingConfig, init_tracing};
pub use acvp_transport::{
    HttpRequest, HttpResponse, NetAction, ReqwestTransport, Session, SessionConfig, TestSession,
    TotpProvider, Transport, Verbosity,
};
pub use acvp_validation::{
    CapabilityParams, CapabilityRegistry, Cipher, CmacCapability, CmacDirection, CmacKeyParams,
    CmacTestCase, CryptoHandler, Domain, HarnessConfig, HashCapability, HashTestCase, MctConfig,
    ResponseDocument, TestCase, VectorSetHarness,
};

pub use acvp_prelude;
pub use acvp_transport;
pub use acvp_validation;
