#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Session Configuration
//!
//! Server coordinates, credential paths and limits for a [`crate::Session`].
//! Values come from builder calls or from the `ACV_*` environment variables.
//!
//! | Variable          | Field          | Default       |
//! |-------------------|----------------|---------------|
//! | `ACV_SERVER`      | `server_name`  | `127.0.0.1`   |
//! | `ACV_PORT`        | `port`         | `443`         |
//! | `ACV_URI_PREFIX`  | `path_segment` | `/acvp/v1/`   |
//! | `ACV_API_CONTEXT` | `api_context`  | unset         |
//! | `ACV_CA_FILE`     | `ca_bundle`    | unset         |
//! | `ACV_CERT_FILE`   | `client_cert`  | unset         |
//! | `ACV_KEY_FILE`    | `client_key`   | unset         |
//! | `ACV_VERBOSITY`   | `verbosity`    | `status`      |

use std::path::PathBuf;
use std::time::Duration;

use acvp_prelude::prelude::{AcvpError, MAX_RESPONSE_SIZE, Result};
use tracing::Level;

/// Default server host.
pub const DEFAULT_SERVER: &str = "127.0.0.1";
/// Default server port.
pub const DEFAULT_PORT: u16 = 443;
/// Default URI prefix for protocol endpoints.
pub const DEFAULT_PATH_SEGMENT: &str = "/acvp/v1/";
/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Log verbosity, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Progress messages.
    #[default]
    Status,
    /// Request-level detail.
    Info,
    /// Everything, including payload sizes.
    Verbose,
}

impl Verbosity {
    /// Matching tracing level.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Verbosity::Error => Level::ERROR,
            Verbosity::Warn => Level::WARN,
            Verbosity::Status => Level::INFO,
            Verbosity::Info => Level::DEBUG,
            Verbosity::Verbose => Level::TRACE,
        }
    }
}

impl std::str::FromStr for Verbosity {
    type Err = AcvpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Verbosity::Error),
            "warn" => Ok(Verbosity::Warn),
            "status" => Ok(Verbosity::Status),
            "info" => Ok(Verbosity::Info),
            "verbose" => Ok(Verbosity::Verbose),
            other => Err(AcvpError::InvalidArgument(format!("unknown verbosity '{other}'"))),
        }
    }
}

/// Configuration for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server host name or address.
    pub server_name: String,
    /// Server TCP port.
    pub port: u16,
    /// URI prefix for login and registration, e.g. `/acvp/v1/`.
    pub path_segment: Option<String>,
    /// Context prefix applied to server-relative URLs.
    pub api_context: Option<String>,
    /// PEM bundle of trusted CA certificates.
    pub ca_bundle: Option<PathBuf>,
    /// PEM client certificate.
    pub client_cert: Option<PathBuf>,
    /// PEM client private key.
    pub client_key: Option<PathBuf>,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Largest response body accepted.
    pub max_response_size: usize,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Log verbosity.
    pub verbosity: Verbosity,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_name: DEFAULT_SERVER.to_string(),
            port: DEFAULT_PORT,
            path_segment: Some(DEFAULT_PATH_SEGMENT.to_string()),
            api_context: None,
            ca_bundle: None,
            client_cert: None,
            client_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_response_size: MAX_RESPONSE_SIZE,
            user_agent: concat!("acvp-rs/", env!("CARGO_PKG_VERSION")).to_string(),
            verbosity: Verbosity::default(),
        }
    }
}

impl SessionConfig {
    /// Configuration for the given server with defaults elsewhere.
    #[must_use]
    pub fn new(server_name: impl Into<String>, port: u16) -> Self {
        Self { server_name: server_name.into(), port, ..Default::default() }
    }

    /// Set the URI prefix.
    #[must_use]
    pub fn with_path_segment(mut self, segment: impl Into<String>) -> Self {
        self.path_segment = Some(segment.into());
        self
    }

    /// Clear the URI prefix.
    #[must_use]
    pub fn without_path_segment(mut self) -> Self {
        self.path_segment = None;
        self
    }

    /// Set the API context prefix.
    #[must_use]
    pub fn with_api_context(mut self, context: impl Into<String>) -> Self {
        self.api_context = Some(context.into());
        self
    }

    /// Set the CA bundle path.
    #[must_use]
    pub fn with_ca_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_bundle = Some(path.into());
        self
    }

    /// Set the client certificate and key paths.
    #[must_use]
    pub fn with_client_identity(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.client_cert = Some(cert.into());
        self.client_key = Some(key.into());
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the response size limit.
    #[must_use]
    pub fn with_max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }

    /// Set the log verbosity.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `ACV_PORT` is not a port number.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Read configuration through a lookup function.
    ///
    /// Unset or empty variables keep their defaults.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `ACV_PORT` is not a port number or
    /// `ACV_VERBOSITY` is not a known level.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(server) = get("ACV_SERVER") {
            config.server_name = server;
        }
        if let Some(port) = get("ACV_PORT") {
            config.port = port
                .trim()
                .parse::<u16>()
                .map_err(|e| AcvpError::InvalidArgument(format!("ACV_PORT '{port}': {e}")))?;
        }
        if let Some(prefix) = get("ACV_URI_PREFIX") {
            config.path_segment = Some(prefix);
        }
        config.api_context = get("ACV_API_CONTEXT");
        config.ca_bundle = get("ACV_CA_FILE").map(PathBuf::from);
        config.client_cert = get("ACV_CERT_FILE").map(PathBuf::from);
        config.client_key = get("ACV_KEY_FILE").map(PathBuf::from);
        if let Some(verbosity) = get("ACV_VERBOSITY") {
            config.verbosity = verbosity.parse()?;
        }

        Ok(config)
    }

    /// Check that the configuration can open a session.
    ///
    /// # Errors
    /// Returns `MissingArgument` for an empty server name, a zero port, or a
    /// client certificate without its key (or the reverse).
    pub fn validate(&self) -> Result<()> {
        if self.server_name.trim().is_empty() {
            return Err(AcvpError::MissingArgument("server_name".to_string()));
        }
        if self.port == 0 {
            return Err(AcvpError::MissingArgument("port".to_string()));
        }
        match (&self.client_cert, &self.client_key) {
            (Some(_), None) => Err(AcvpError::MissingArgument("client_key".to_string())),
            (None, Some(_)) => Err(AcvpError::MissingArgument("client_cert".to_string())),
            _ => Ok(()),
        }
    }

    /// `https://server:port`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.server_name, self.port)
    }

    /// Absolute URL of a protocol endpoint under the URI prefix.
    ///
    /// # Errors
    /// Returns `MissingArgument` when no URI prefix is configured.
    pub fn endpoint(&self, suffix: &str) -> Result<String> {
        let segment = self
            .path_segment
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AcvpError::MissingArgument("path_segment".to_string()))?;
        Ok(format!("{}{}", self.base_url(), normalize_path(&format!("/{segment}/{suffix}"))))
    }

    /// Turn a server-supplied URL into an absolute one.
    ///
    /// Absolute URLs pass through. Relative paths get the API context
    /// prefix (unless already present) and duplicate slashes collapsed.
    #[must_use]
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("https://") || url.starts_with("http://") {
            return url.to_string();
        }
        let mut path = normalize_path(&format!("/{url}"));
        if let Some(context) = self.api_context.as_deref().filter(|c| !c.is_empty()) {
            let context = normalize_path(&format!("/{context}"));
            let context = context.trim_end_matches('/');
            if !context.is_empty() && !has_path_prefix(&path, context) {
                path = normalize_path(&format!("{context}/{path}"));
            }
        }
        format!("{}{}", self.base_url(), path)
    }
}

/// Whether `path` lies under `prefix` on a segment boundary.
fn has_path_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix).is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Collapse runs of `/` into one.
fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !prev_slash {
                out.push(c);
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }
    out
}
