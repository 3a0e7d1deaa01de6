#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # HTTP Transport
//!
//! The single HTTP primitive the session is built on. A [`Transport`] sends
//! one request and reports the status and body; it never retries and never
//! interprets status codes. [`ReqwestTransport`] is the production
//! implementation; tests substitute a scripted one.

use std::fmt;
use std::io::Read;

use acvp_prelude::prelude::{AcvpError, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::tls::Version;
use tracing::{debug, trace};
use zeroize::Zeroizing;

use crate::config::SessionConfig;
use crate::tls::{load_ca_bundle, load_client_identity};

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// One outgoing request.
#[derive(Clone)]
pub struct HttpRequest {
    /// Method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Bearer token, if the request is authenticated.
    pub bearer: Option<Zeroizing<String>>,
    /// JSON body for POST.
    pub body: Option<String>,
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .field("body_len", &self.body.as_ref().map(String::len))
            .finish()
    }
}

/// Status and body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw body.
    pub body: Vec<u8>,
}

/// Sends one HTTP request.
pub trait Transport: Send {
    /// Perform the exchange.
    ///
    /// # Errors
    /// Returns `TransportFailure` when no response was obtained.
    fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Blocking HTTPS transport over `reqwest` with rustls.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    max_response_size: usize,
}

impl ReqwestTransport {
    /// Build a client from the session configuration.
    ///
    /// TLS 1.2 is the minimum protocol version. The CA bundle and client
    /// identity are loaded when configured.
    ///
    /// # Errors
    /// Returns credential loading errors, or `TransportFailure` if the
    /// client cannot be built.
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .use_rustls_tls()
            .min_tls_version(Version::TLS_1_2)
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone());

        if let Some(path) = &config.ca_bundle {
            for cert in load_ca_bundle(path)? {
                builder = builder.add_root_certificate(cert);
            }
        }
        if let (Some(cert), Some(key)) = (&config.client_cert, &config.client_key) {
            builder = builder.identity(load_client_identity(cert, key)?);
        }

        let client = builder
            .build()
            .map_err(|e| AcvpError::transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, max_response_size: config.max_response_size })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body.clone());
        }

        debug!("{} {}", request.method, request.url);
        let response = builder
            .send()
            .map_err(|e| AcvpError::transport(format!("{} {}: {e}", request.method, request.url)))?;
        let status = response.status().as_u16();

        let limit = u64::try_from(self.max_response_size).unwrap_or(u64::MAX).saturating_add(1);
        let mut body = Vec::new();
        response
            .take(limit)
            .read_to_end(&mut body)
            .map_err(|e| AcvpError::transport(format!("Failed to read response body: {e}")))?;
        if body.len() > self.max_response_size {
            return Err(AcvpError::TransportFailure {
                status: Some(status),
                message: format!("Response exceeds {} bytes", self.max_response_size),
            });
        }
        trace!("HTTP {} with {} byte body", status, body.len());

        Ok(HttpResponse { status, body })
    }
}
