#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Session
//!
//! A [`Session`] owns everything mutable about one client run: the bearer
//! token, the response buffer and the transport. Every request goes through
//! [`Session::send`], which checks preconditions, performs the exchange,
//! classifies the status and, when the token has expired, refreshes it and
//! re-issues the request once.
//!
//! ```text
//! attempt 1 ──► 200 ─────────────────────────────► Ok
//!     │
//!     └────► 401 "JWT expired" ──► refresh ──► attempt 2 ──► 200 ──► Ok
//!                                    │             └──► other ──► TransportFailure
//!                                    └──► failed ──► TransportFailure
//! ```

use std::fmt;

use acvp_prelude::prelude::{
    AcvpError, EXPECTED_SUFFIX, LOGIN_PATH, MAX_TOKEN_LEN, RESULTS_SUFFIX, Result,
    TEST_SESSIONS_PATH, unwrap_envelope, wrap_envelope,
};
use serde_json::{Map, Value};
use tracing::{debug, info, trace, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::auth::{StatusDisposition, inspect_status};
use crate::config::{SessionConfig, Verbosity};
use crate::tracing::HttpSpan;
use crate::transport::{HttpMethod, HttpRequest, ReqwestTransport, Transport};

/// Attempts per request: the original plus one retry after a refresh.
const MAX_ATTEMPTS: u32 = 2;

/// Bytes of a failed response body quoted in the error.
const ERROR_SNIPPET_LEN: usize = 256;

/// Source of the one-time password sent with each login.
pub trait TotpProvider: Send {
    /// Produce the current password.
    ///
    /// # Errors
    /// Implementation-defined.
    fn password(&self) -> Result<String>;
}

impl<F> TotpProvider for F
where
    F: Fn() -> Result<String> + Send,
{
    fn password(&self) -> Result<String> {
        self()
    }
}

/// The kinds of request a session issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetAction {
    /// Generic GET.
    Get,
    /// GET a vector set.
    GetVectorSet,
    /// GET the server's verdict on a vector set.
    GetVectorSetResult,
    /// GET the expected answers of a sample vector set.
    GetExpectedResult,
    /// POST to the login endpoint.
    PostLogin,
    /// POST a test session registration.
    PostRegister,
    /// Generic POST.
    Post,
    /// POST a vector set response.
    PostVectorSetResponse,
}

impl NetAction {
    /// HTTP method used by the action.
    #[must_use]
    pub fn method(self) -> HttpMethod {
        match self {
            NetAction::Get
            | NetAction::GetVectorSet
            | NetAction::GetVectorSetResult
            | NetAction::GetExpectedResult => HttpMethod::Get,
            NetAction::PostLogin
            | NetAction::PostRegister
            | NetAction::Post
            | NetAction::PostVectorSetResponse => HttpMethod::Post,
        }
    }

    /// Whether this is a login.
    #[must_use]
    pub fn is_login(self) -> bool {
        self == NetAction::PostLogin
    }

    /// Whether the response body carries an access token.
    #[must_use]
    pub fn returns_token(self) -> bool {
        matches!(self, NetAction::PostLogin | NetAction::PostRegister)
    }

    /// Whether the action targets an endpoint under the URI prefix.
    #[must_use]
    pub fn needs_path_segment(self) -> bool {
        matches!(self, NetAction::PostLogin | NetAction::PostRegister)
    }

    /// Name used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            NetAction::Get => "GET",
            NetAction::GetVectorSet => "GET vector set",
            NetAction::GetVectorSetResult => "GET vector set result",
            NetAction::GetExpectedResult => "GET expected result",
            NetAction::PostLogin => "POST login",
            NetAction::PostRegister => "POST register",
            NetAction::Post => "POST",
            NetAction::PostVectorSetResponse => "POST vector set response",
        }
    }
}

impl fmt::Display for NetAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bounded buffer holding the body of the most recent response.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ResponseBuffer {
    data: Vec<u8>,
    max_len: usize,
}

impl ResponseBuffer {
    /// Empty buffer accepting up to `max_len` bytes.
    #[must_use]
    pub fn with_capacity(max_len: usize) -> Self {
        Self { data: Vec::new(), max_len }
    }

    /// Replace the contents.
    ///
    /// # Errors
    /// Returns `TransportFailure` if `bytes` exceeds the capacity; the buffer
    /// is left empty.
    pub fn fill(&mut self, bytes: &[u8]) -> Result<()> {
        self.clear();
        if bytes.len() > self.max_len {
            return Err(AcvpError::transport(format!(
                "Response of {} bytes exceeds buffer capacity {}",
                bytes.len(),
                self.max_len
            )));
        }
        self.data.try_reserve_exact(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Wipe and empty the buffer.
    pub fn clear(&mut self) {
        self.data.zeroize();
    }

    /// Contents.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Contents as UTF-8.
    ///
    /// # Errors
    /// Returns `MalformedDocument` if the body is not UTF-8.
    pub fn as_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.data)
            .map_err(|e| AcvpError::MalformedDocument(format!("Response is not UTF-8: {e}")))
    }

    /// Number of bytes held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for ResponseBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBuffer")
            .field("len", &self.data.len())
            .field("max_len", &self.max_len)
            .finish()
    }
}

/// A registered test session.
#[derive(Clone)]
pub struct TestSession {
    /// Server-relative URL of the test session.
    pub url: String,
    /// Session-scoped access token.
    pub access_token: Zeroizing<String>,
    /// Vector sets to fetch, in server order.
    pub vector_set_urls: Vec<String>,
}

impl fmt::Debug for TestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSession")
            .field("url", &self.url)
            .field("access_token", &"<redacted>")
            .field("vector_set_urls", &self.vector_set_urls)
            .finish()
    }
}

/// Authenticated session against one server.
pub struct Session<T: Transport> {
    config: SessionConfig,
    transport: T,
    token: Option<Zeroizing<String>>,
    response: ResponseBuffer,
    totp: Option<Box<dyn TotpProvider>>,
    last_status: Option<u16>,
}

impl Session<ReqwestTransport> {
    /// Validate the configuration and open an HTTPS session.
    ///
    /// # Errors
    /// Returns configuration or credential errors.
    pub fn connect(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        info!("Session configured for {}", config.base_url());
        Ok(Self::new(config, transport))
    }
}

impl<T: Transport> Session<T> {
    /// Session over an arbitrary transport.
    ///
    /// The configuration is not validated here; [`Session::send`] checks
    /// what each request needs.
    #[must_use]
    pub fn new(config: SessionConfig, transport: T) -> Self {
        let response = ResponseBuffer::with_capacity(config.max_response_size);
        Self { config, transport, token: None, response, totp: None, last_status: None }
    }

    /// Attach a one-time password source for logins.
    #[must_use]
    pub fn with_totp<P>(mut self, provider: P) -> Self
    where
        P: TotpProvider + 'static,
    {
        self.totp = Some(Box::new(provider));
        self
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Transport in use.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Install a token obtained elsewhere.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(Zeroizing::new(token.into()));
    }

    /// Drop the current token.
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Whether a token is held.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Status of the most recent exchange.
    #[must_use]
    pub fn last_status(&self) -> Option<u16> {
        self.last_status
    }

    /// Body of the most recent response.
    #[must_use]
    pub fn response_body(&self) -> &[u8] {
        self.response.as_slice()
    }

    /// Body of the most recent response as text.
    ///
    /// # Errors
    /// Returns `MalformedDocument` if the body is not UTF-8.
    pub fn response_text(&self) -> Result<&str> {
        self.response.as_str()
    }

    /// Body of the most recent response parsed as JSON.
    ///
    /// # Errors
    /// Returns `MalformedDocument` if the body is empty or not JSON.
    pub fn response_json(&self) -> Result<Value> {
        if self.response.is_empty() {
            return Err(AcvpError::MalformedDocument("Empty response body".to_string()));
        }
        Ok(serde_json::from_slice(self.response.as_slice())?)
    }

    /// Issue one action, refreshing an expired token and retrying once.
    ///
    /// Returns the final HTTP status; the body is available through
    /// [`Session::response_body`].
    ///
    /// # Errors
    /// - `MissingArgument` when a precondition fails; no request is sent.
    /// - `TokenInvalid` when the server rejects the token signature.
    /// - `TokenExpired` when a login reports an expired token.
    /// - `TransportFailure` for any other non-200 outcome, including a
    ///   failed refresh or a second expiry.
    pub fn send(&mut self, action: NetAction, url: &str, body: Option<&str>) -> Result<u16> {
        self.check_preconditions(action, url, body)?;

        let span = HttpSpan::new(action.name(), url);
        let result = self.send_with_refresh(action, url, body, &span);
        match &result {
            Ok(status) => span.complete(*status),
            Err(e) => span.error(e),
        }
        result
    }

    fn check_preconditions(&self, action: NetAction, url: &str, body: Option<&str>) -> Result<()> {
        if self.config.server_name.trim().is_empty() {
            return Err(AcvpError::MissingArgument("server_name".to_string()));
        }
        if self.config.port == 0 {
            return Err(AcvpError::MissingArgument("port".to_string()));
        }
        if action.needs_path_segment()
            && self.config.path_segment.as_deref().is_none_or(str::is_empty)
        {
            return Err(AcvpError::MissingArgument("path_segment".to_string()));
        }
        if url.is_empty() {
            return Err(AcvpError::MissingArgument("url".to_string()));
        }
        if action.method() == HttpMethod::Post
            && !action.is_login()
            && body.is_none_or(str::is_empty)
        {
            return Err(AcvpError::MissingArgument(format!("{action} requires a body")));
        }
        Ok(())
    }

    fn send_with_refresh(
        &mut self,
        action: NetAction,
        url: &str,
        body: Option<&str>,
        span: &HttpSpan,
    ) -> Result<u16> {
        for attempt in 1..=MAX_ATTEMPTS {
            let status = self.execute_once(action, url, body)?;
            span.attempt(attempt, status);

            match inspect_status(status, self.response.as_slice()) {
                StatusDisposition::Success => return Ok(status),
                StatusDisposition::TokenInvalid => {
                    warn!("{} rejected: token signature does not match", action);
                    return Err(AcvpError::TokenInvalid);
                }
                StatusDisposition::TokenExpired if action.is_login() => {
                    return Err(AcvpError::TokenExpired);
                }
                StatusDisposition::TokenExpired if attempt < MAX_ATTEMPTS => {
                    info!("Access token expired during {}, refreshing", action);
                    self.refresh_token().map_err(|e| {
                        AcvpError::http_status(401, format!("Token refresh failed: {e}"))
                    })?;
                }
                StatusDisposition::TokenExpired => {
                    return Err(AcvpError::http_status(
                        401,
                        format!("{action} {url}: token expired again after refresh"),
                    ));
                }
                StatusDisposition::Failed => {
                    return Err(AcvpError::http_status(
                        status,
                        format!("{action} {url} returned HTTP {status}: {}", self.error_snippet()),
                    ));
                }
            }
        }
        Err(AcvpError::transport(format!("{action} {url}: retry attempts exhausted")))
    }

    fn execute_once(&mut self, action: NetAction, url: &str, body: Option<&str>) -> Result<u16> {
        self.response.clear();
        self.last_status = None;

        let request = HttpRequest {
            method: action.method(),
            url: url.to_string(),
            bearer: if action.is_login() { None } else { self.token.clone() },
            body: body.map(str::to_string),
        };
        let mut response = self.transport.execute(&request)?;
        let filled = self.response.fill(&response.body);
        response.body.zeroize();
        filled?;

        debug!("{} returned HTTP {} ({} bytes)", action, response.status, self.response.len());
        if self.logs_body(action) {
            trace!(body = %String::from_utf8_lossy(self.response.as_slice()), "{} response body", action);
        }
        self.last_status = Some(response.status);
        Ok(response.status)
    }

    /// Response bodies are logged only at `Verbose`, and never when they
    /// hold a token.
    fn logs_body(&self, action: NetAction) -> bool {
        self.config.verbosity >= Verbosity::Verbose && !action.returns_token()
    }

    fn error_snippet(&self) -> String {
        let body = self.response.as_slice();
        let end = body.len().min(ERROR_SNIPPET_LEN);
        String::from_utf8_lossy(&body[..end]).into_owned()
    }

    /// Log in and install the returned token.
    ///
    /// # Errors
    /// Returns `NoToken` if the response lacks a usable token, or any
    /// [`Session::send`] error. The token is cleared on failure.
    pub fn login(&mut self) -> Result<()> {
        self.login_with(None)
    }

    /// Exchange the current token for a fresh one.
    ///
    /// # Errors
    /// As [`Session::login`].
    pub fn refresh_token(&mut self) -> Result<()> {
        let old = self.token.take();
        self.login_with(old)
    }

    fn login_with(&mut self, old_token: Option<Zeroizing<String>>) -> Result<()> {
        self.token = None;

        let mut payload = Map::new();
        if let Some(totp) = &self.totp {
            let password = Zeroizing::new(totp.password()?);
            payload.insert("password".to_string(), Value::String(password.to_string()));
        }
        if let Some(old) = &old_token {
            payload.insert("accessToken".to_string(), Value::String(old.to_string()));
        }
        let body = Zeroizing::new(wrap_envelope(Value::Object(payload)).to_string());

        let url = self.config.endpoint(LOGIN_PATH)?;
        self.send(NetAction::PostLogin, &url, Some(body.as_str()))?;

        let doc = self.response_json()?;
        let token = extract_token(unwrap_envelope(&doc)?)?;
        self.token = Some(token);
        info!("Login succeeded");
        Ok(())
    }

    /// Register a test session and switch to its token.
    ///
    /// `body` is a complete registration document.
    ///
    /// # Errors
    /// Returns `MalformedDocument` or `MissingArgument` if the response
    /// lacks its fields, `NoToken` if it lacks a usable token, or any
    /// [`Session::send`] error.
    pub fn register(&mut self, body: &str) -> Result<TestSession> {
        let url = self.config.endpoint(TEST_SESSIONS_PATH)?;
        self.send(NetAction::PostRegister, &url, Some(body))?;

        let doc = self.response_json()?;
        let obj = unwrap_envelope(&doc)?;
        let session_url = obj
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| AcvpError::MissingArgument("url".to_string()))?
            .to_string();
        let access_token = extract_token(obj)?;
        let vector_set_urls = obj
            .get("vectorSetUrls")
            .and_then(Value::as_array)
            .ok_or_else(|| AcvpError::MissingArgument("vectorSetUrls".to_string()))?
            .iter()
            .map(|v| {
                v.as_str().map(str::to_string).ok_or_else(|| {
                    AcvpError::MalformedDocument("vectorSetUrls entry is not a string".to_string())
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.token = Some(access_token.clone());
        info!("Registered test session {} with {} vector set(s)", session_url, vector_set_urls.len());
        Ok(TestSession { url: session_url, access_token, vector_set_urls })
    }

    /// GET a server URL and parse the body.
    ///
    /// # Errors
    /// Any [`Session::send`] error, or `MalformedDocument`.
    pub fn get(&mut self, url: &str) -> Result<Value> {
        self.get_as(NetAction::Get, url)
    }

    /// POST a body to a server URL.
    ///
    /// # Errors
    /// Any [`Session::send`] error.
    pub fn post(&mut self, url: &str, body: &str) -> Result<u16> {
        let url = self.config.resolve(url);
        self.send(NetAction::Post, &url, Some(body))
    }

    /// Fetch a vector set.
    ///
    /// # Errors
    /// Any [`Session::send`] error, or `MalformedDocument`.
    pub fn retrieve_vector_set(&mut self, vs_url: &str) -> Result<Value> {
        self.get_as(NetAction::GetVectorSet, vs_url)
    }

    /// Fetch the server's verdict on a submitted vector set.
    ///
    /// # Errors
    /// Any [`Session::send`] error, or `MalformedDocument`.
    pub fn retrieve_vector_set_result(&mut self, vs_url: &str) -> Result<Value> {
        self.get_as(NetAction::GetVectorSetResult, &join(vs_url, RESULTS_SUFFIX))
    }

    /// Fetch the expected answers of a sample vector set.
    ///
    /// # Errors
    /// Any [`Session::send`] error, or `MalformedDocument`.
    pub fn retrieve_expected_result(&mut self, vs_url: &str) -> Result<Value> {
        self.get_as(NetAction::GetExpectedResult, &join(vs_url, EXPECTED_SUFFIX))
    }

    /// Submit a vector set response document.
    ///
    /// # Errors
    /// `MissingArgument` for an empty body, or any [`Session::send`] error.
    pub fn submit_vector_responses(&mut self, vs_url: &str, body: &str) -> Result<()> {
        let url = self.config.resolve(&join(vs_url, RESULTS_SUFFIX));
        self.send(NetAction::PostVectorSetResponse, &url, Some(body))?;
        info!("Submitted responses for {}", vs_url);
        Ok(())
    }

    fn get_as(&mut self, action: NetAction, url: &str) -> Result<Value> {
        let url = self.config.resolve(url);
        self.send(action, &url, None)?;
        self.response_json()
    }
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("has_token", &self.token.is_some())
            .field("response", &self.response)
            .field("has_totp", &self.totp.is_some())
            .field("last_status", &self.last_status)
            .finish_non_exhaustive()
    }
}

fn join(base: &str, suffix: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), suffix)
}

fn extract_token(obj: &Map<String, Value>) -> Result<Zeroizing<String>> {
    let token = obj.get("accessToken").and_then(Value::as_str).ok_or(AcvpError::NoToken)?;
    if token.is_empty() || token.len() > MAX_TOKEN_LEN {
        warn!("Server returned an unusable access token ({} bytes)", token.len());
        return Err(AcvpError::NoToken);
    }
    Ok(Zeroizing::new(token.to_string()))
}
