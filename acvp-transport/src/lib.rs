#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # ACVP Transport
//!
//! Authenticated HTTPS session management for the ACVP client.
//!
//! ## Features
//!
//! - **Session**: owns the bearer token and response buffer for one run
//! - **Refresh-and-retry**: an expired token is refreshed once and the
//!   request re-issued once; nothing is retried twice
//! - **TLS**: TLS 1.2 minimum, optional client certificate and CA bundle
//! - **Pluggable transport**: the HTTP primitive sits behind [`Transport`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use acvp_transport::{Session, SessionConfig};
//!
//! # fn example() -> acvp_prelude::Result<()> {
//! let config = SessionConfig::from_env()?;
//! let mut session = Session::connect(config)?
//!     .with_totp(|| -> acvp_prelude::Result<String> { Ok("12345678".to_string()) });
//! session.login()?;
//! # Ok(())
//! # }
//! ```

/// HTTP status classification.
pub mod auth;
/// Session configuration.
pub mod config;
/// The session and its refresh-and-retry protocol.
pub mod session;
/// TLS credential loading.
pub mod tls;
/// Structured logging setup.
pub mod tracing;
/// HTTP transport primitive.
pub mod transport;

pub use auth::{StatusDisposition, inspect_status};
pub use config::{SessionConfig, Verbosity};
pub use session::{NetAction, ResponseBuffer, Session, TestSession, TotpProvider};
pub use tls::{load_ca_bundle, load_client_identity};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
