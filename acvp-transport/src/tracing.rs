#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Structured Tracing
//!
//! Subscriber setup for the client and a span type wrapping each HTTP
//! exchange. Bearer tokens and test-case values never enter a span.

use std::time::{Duration, Instant};

use acvp_prelude::prelude::{AcvpError, Result};
use tracing::{Level, Span, debug, error, info, span};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::Verbosity;

/// Subscriber configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default level when `RUST_LOG` is unset.
    pub log_level: Level,
    /// Include the event target.
    pub with_target: bool,
    /// Include thread ids.
    pub with_thread_ids: bool,
    /// Emit JSON lines instead of text.
    pub json: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self { log_level: Level::INFO, with_target: true, with_thread_ids: true, json: false }
    }
}

impl TracingConfig {
    /// Configuration for a client verbosity.
    #[must_use]
    pub fn from_verbosity(verbosity: Verbosity) -> Self {
        Self { log_level: verbosity.level(), ..Default::default() }
    }

    /// Debug logging.
    #[must_use]
    pub fn debug() -> Self {
        Self { log_level: Level::DEBUG, ..Default::default() }
    }

    /// Switch to JSON output.
    #[must_use]
    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level.
///
/// # Errors
/// Returns `InvalidArgument` if a global subscriber is already installed.
///
/// # Example
/// ```no_run
/// use acvp_transport::tracing::{TracingConfig, init_tracing};
///
/// init_tracing(&TracingConfig::default()).ok();
/// ```
pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    let filter =
        EnvFilter::builder().with_default_directive(config.log_level.into()).from_env_lossy();

    let result = if config.json {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .json()
                    .with_target(config.with_target)
                    .with_thread_ids(config.with_thread_ids),
            )
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(config.with_target)
                    .with_thread_ids(config.with_thread_ids),
            )
            .with(filter)
            .try_init()
    };
    result.map_err(|e| AcvpError::InvalidArgument(format!("Tracing already initialized: {e}")))
}

/// Span covering one HTTP exchange.
#[derive(Debug)]
pub struct HttpSpan {
    span: Span,
    start_time: Instant,
}

impl HttpSpan {
    /// Open a span for an action against a URL.
    pub fn new(action: &str, url: &str) -> Self {
        let span = span!(Level::INFO, "http_exchange", action = %action, url = %url);
        span.in_scope(|| {
            debug!("Starting {}", action);
        });
        Self { span, start_time: Instant::now() }
    }

    /// Elapsed time since the span opened.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Record an attempt's status.
    pub fn attempt(&self, attempt: u32, status: u16) {
        self.span.in_scope(|| {
            debug!(attempt, status, "Attempt {} returned HTTP {}", attempt, status);
        });
    }

    /// Close the span successfully.
    pub fn complete(self, status: u16) {
        let duration = self.start_time.elapsed();
        self.span.in_scope(|| {
            info!(
                status,
                "Completed in {}.{:03}s",
                duration.as_secs(),
                duration.subsec_millis()
            );
        });
    }

    /// Close the span with an error.
    pub fn error<E>(self, error: &E)
    where
        E: std::error::Error,
    {
        let duration = self.start_time.elapsed();
        self.span.in_scope(|| {
            error!(
                error = %error,
                "Failed after {}.{:03}s",
                duration.as_secs(),
                duration.subsec_millis()
            );
        });
    }

    /// Run a closure inside the span.
    pub fn in_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.span.in_scope(f)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_verbosity() {
        assert_eq!(TracingConfig::from_verbosity(Verbosity::Error).log_level, Level::ERROR);
        assert_eq!(TracingConfig::from_verbosity(Verbosity::Info).log_level, Level::DEBUG);
        assert!(TracingConfig::debug().with_json().json);
    }

    #[test]
    fn test_span_lifecycle_without_subscriber() {
        let span = HttpSpan::new("POST login", "https://host/acvp/v1/login");
        span.attempt(1, 401);
        assert_eq!(span.in_scope(|| 7), 7);
        span.complete(200);

        let span = HttpSpan::new("GET vector set", "https://host/x");
        span.error(&AcvpError::NoToken);
    }
}
