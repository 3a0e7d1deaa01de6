#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Run Orchestration
//!
//! [`AcvpClient`] strings the session and the harness together into a
//! complete validation run:
//!
//! 1. log in
//! 2. register a test session built from the capability registry
//! 3. for each vector set: download (waiting while the server says
//!    `retry`), answer through the harness, submit
//! 4. fetch the test session results
//!
//! The server answers a download that is not ready yet with
//! `{"retry": n}`. The client sleeps `n` seconds (clamped to
//! [`ClientConfig::max_retry_wait`]) and asks again, until the cumulative
//! wait would pass [`ClientConfig::retry_budget`]. Downloads that fail with a
//! recoverable error (no HTTP status, or a 5xx) are retried the same way,
//! with the delay and attempt limit of their recovery strategy.

use std::time::Duration;

use acvp_prelude::prelude::{
    AcvpError, ErrorRecoveryStrategy, RESULTS_SUFFIX, Result, attempt_error_recovery,
    get_error_severity, unwrap_envelope,
};
use acvp_transport::{Session, Transport};
use acvp_validation::{
    CapabilityRegistry, HarnessConfig, VectorSetHarness, build_test_session_request,
};
use serde_json::Value;
use tracing::{error, info, info_span, warn};

/// Longest single wait honoured for a `retry` response.
pub const DEFAULT_MAX_RETRY_WAIT: Duration = Duration::from_secs(60);
/// Total wait allowed for one download.
pub const DEFAULT_RETRY_BUDGET: Duration = Duration::from_secs(900);

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Harness settings.
    pub harness: HarnessConfig,
    /// Upper bound on one server-requested wait.
    pub max_retry_wait: Duration,
    /// Upper bound on the summed waits for one download.
    pub retry_budget: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            harness: HarnessConfig::default(),
            max_retry_wait: DEFAULT_MAX_RETRY_WAIT,
            retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }
}

impl ClientConfig {
    /// Set the harness configuration.
    #[must_use]
    pub fn with_harness(mut self, harness: HarnessConfig) -> Self {
        self.harness = harness;
        self
    }

    /// Set the single-wait cap.
    #[must_use]
    pub fn with_max_retry_wait(mut self, wait: Duration) -> Self {
        self.max_retry_wait = wait;
        self
    }

    /// Set the cumulative wait budget.
    #[must_use]
    pub fn with_retry_budget(mut self, budget: Duration) -> Self {
        self.retry_budget = budget;
        self
    }
}

/// Blocks the calling thread.
pub trait Sleeper: Send {
    /// Wait for `duration`.
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// What happened to one vector set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorSetOutcome {
    /// Vector set URL.
    pub url: String,
    /// Vector set id.
    pub vs_id: u64,
    /// Algorithm name.
    pub algorithm: String,
    /// Test cases answered.
    pub test_cases: usize,
}

/// Result of a complete run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Test session URL.
    pub session_url: String,
    /// Processed vector sets, in server order.
    pub vector_sets: Vec<VectorSetOutcome>,
    /// The server's test session results document.
    pub results: Value,
}

/// Drives a validation run over a session.
pub struct AcvpClient<T: Transport> {
    session: Session<T>,
    registry: CapabilityRegistry,
    config: ClientConfig,
    sleeper: Box<dyn Sleeper>,
}

impl<T: Transport> AcvpClient<T> {
    /// Client with default configuration.
    #[must_use]
    pub fn new(session: Session<T>, registry: CapabilityRegistry) -> Self {
        Self {
            session,
            registry,
            config: ClientConfig::default(),
            sleeper: Box::new(ThreadSleeper),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the sleeper used for `retry` waits.
    #[must_use]
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// The session.
    #[must_use]
    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    /// The session, mutably.
    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    /// The capability registry.
    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Perform a complete run.
    ///
    /// Stops at the first vector set that fails; vector sets already
    /// submitted stay submitted.
    ///
    /// # Errors
    /// Any session, harness or registration error.
    pub fn run(&mut self, is_sample: bool) -> Result<RunSummary> {
        self.session.login()?;

        let request = build_test_session_request(&self.registry, is_sample)?;
        let test_session = self.session.register(&request.to_string())?;

        let mut vector_sets = Vec::with_capacity(test_session.vector_set_urls.len());
        for url in &test_session.vector_set_urls {
            let outcome = self.process_vector_set(url).inspect_err(|e| {
                error!(severity = ?get_error_severity(e), "Vector set {} failed: {}", url, e);
            })?;
            vector_sets.push(outcome);
        }

        let results = self.check_test_results(&test_session.url)?;
        info!("Run complete: {} vector set(s) submitted", vector_sets.len());
        Ok(RunSummary { session_url: test_session.url, vector_sets, results })
    }

    /// Download, answer and submit one vector set.
    ///
    /// # Errors
    /// `TransportFailure` if the vector set is not ready within the retry
    /// budget, or any harness or session error.
    pub fn process_vector_set(&mut self, url: &str) -> Result<VectorSetOutcome> {
        let span = info_span!("process_vector_set", url = %url);
        let _guard = span.enter();

        let document = self.poll_until_ready(url, |session| session.retrieve_vector_set(url))?;
        let response =
            VectorSetHarness::new(&self.registry, self.config.harness.clone()).process(&document)?;
        let body = response.to_json_string(false)?;
        self.session.submit_vector_responses(url, &body)?;

        let test_cases = response.test_case_count();
        Ok(VectorSetOutcome {
            url: url.to_string(),
            vs_id: response.vs_id,
            algorithm: response.algorithm,
            test_cases,
        })
    }

    /// Fetch the server's verdict on one submitted vector set.
    ///
    /// # Errors
    /// As [`AcvpClient::process_vector_set`].
    pub fn vector_set_result(&mut self, url: &str) -> Result<Value> {
        self.poll_until_ready(url, |session| session.retrieve_vector_set_result(url))
    }

    /// Fetch the expected answers of a sample vector set.
    ///
    /// # Errors
    /// Any session error.
    pub fn retrieve_expected_result(&mut self, url: &str) -> Result<Value> {
        self.poll_until_ready(url, |session| session.retrieve_expected_result(url))
    }

    /// Fetch and log the results of a test session.
    ///
    /// # Errors
    /// As [`AcvpClient::process_vector_set`].
    pub fn check_test_results(&mut self, session_url: &str) -> Result<Value> {
        let results_url = format!("{}/{}", session_url.trim_end_matches('/'), RESULTS_SUFFIX);
        let results =
            self.poll_until_ready(&results_url, |session| session.get(&results_url))?;
        log_results(&results);
        Ok(results)
    }

    fn poll_until_ready<F>(&mut self, url: &str, mut fetch: F) -> Result<Value>
    where
        F: FnMut(&mut Session<T>) -> Result<Value>,
    {
        let mut waited = Duration::ZERO;
        let mut failures = 0usize;
        loop {
            let document = match fetch(&mut self.session) {
                Ok(document) => document,
                Err(e) => {
                    let Some(ErrorRecoveryStrategy::Retry { max_attempts, delay_ms }) =
                        attempt_error_recovery(&e)
                    else {
                        return Err(e);
                    };
                    failures = failures.saturating_add(1);
                    let wait = Duration::from_millis(delay_ms);
                    if failures >= max_attempts || waited.saturating_add(wait) > self.config.retry_budget
                    {
                        return Err(e);
                    }
                    warn!("{} failed ({}), attempt {}/{}", url, e, failures, max_attempts);
                    self.sleeper.sleep(wait);
                    waited = waited.saturating_add(wait);
                    continue;
                }
            };
            let Some(retry) = retry_after(&document) else {
                return Ok(document);
            };

            let wait = retry_wait(retry, self.config.max_retry_wait);
            if waited.saturating_add(wait) > self.config.retry_budget {
                return Err(AcvpError::transport(format!(
                    "{url} not ready after waiting {}s",
                    waited.as_secs()
                )));
            }
            info!("{} not ready, retrying in {}s", url, wait.as_secs());
            self.sleeper.sleep(wait);
            waited = waited.saturating_add(wait);
        }
    }
}

impl<T: Transport> std::fmt::Debug for AcvpClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcvpClient")
            .field("session", &self.session)
            .field("registered", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The `retry` value of a not-ready response.
fn retry_after(document: &Value) -> Option<u64> {
    unwrap_envelope(document).ok()?.get("retry")?.as_u64()
}

/// Seconds to wait for a `retry` value; zero means the cap.
fn retry_wait(retry: u64, max: Duration) -> Duration {
    if retry == 0 { max } else { Duration::from_secs(retry).min(max) }
}

fn log_results(results: &Value) {
    let Ok(obj) = unwrap_envelope(results) else {
        warn!("Test session results are not an object");
        return;
    };
    if let Some(passed) = obj.get("passed").and_then(Value::as_bool) {
        info!(passed, "Test session {}", if passed { "passed" } else { "failed" });
    }
    for entry in obj.get("results").and_then(Value::as_array).into_iter().flatten() {
        let url = entry.get("vectorSetUrl").and_then(Value::as_str).unwrap_or("?");
        let status = entry.get("status").and_then(Value::as_str).unwrap_or("unknown");
        info!("Vector set {}: {}", url, status);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_retry_wait_clamps() {
        let max = Duration::from_secs(60);
        assert_eq!(retry_wait(5, max), Duration::from_secs(5));
        assert_eq!(retry_wait(600, max), max);
        assert_eq!(retry_wait(0, max), max);
    }

    #[test]
    fn test_retry_after_reads_envelope_and_object() {
        assert_eq!(retry_after(&json!([{"acvVersion": "1.0"}, {"retry": 30}])), Some(30));
        assert_eq!(retry_after(&json!({"retry": 3})), Some(3));
        assert_eq!(retry_after(&json!({"vsId": 1})), None);
        assert_eq!(retry_after(&json!("text")), None);
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.max_retry_wait, Duration::from_secs(60));
        assert_eq!(config.retry_budget, Duration::from_secs(900));
        let config = config.with_retry_budget(Duration::from_secs(10));
        assert_eq!(config.retry_budget, Duration::from_secs(10));
    }
}
