//! HTTP transport boundary.
//!
//! The pipeline never talks to `reqwest` directly. Every outbound call goes
//! through the [`HttpTransport`] trait so that the authentication state
//! machine, the list fetcher and the extract enricher can be driven by a
//! scripted transport in tests.
//!
//! # Architecture
//!
//! - [`HttpTransport`] - Async trait: perform one request, return status/headers/body
//! - [`HttpRequest`] / [`HttpResponse`] - Plain request and response values
//! - [`ReqwestTransport`] - Production implementation
//! - [`TransportError`] - Errors raised at the transport boundary
//!
//! Responses keep every header occurrence in order, so repeated `Set-Cookie`
//! headers survive intact.

mod client;
mod error;
mod user_agent;

pub use client::ReqwestTransport;
pub use error::TransportError;
pub use user_agent::default_user_agent;

use std::fmt;

use async_trait::async_trait;
use reqwest::Method;

/// Header name for cookies sent by the client.
pub const COOKIE: &str = "cookie";

/// Header name for cookies set by the server.
pub const SET_COOKIE: &str = "set-cookie";

/// Header name for redirect targets.
pub const LOCATION: &str = "location";

/// Header name for request body media types.
pub const CONTENT_TYPE: &str = "content-type";

/// A single outbound HTTP request.
#[derive(Clone)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute request URL.
    pub url: String,
    /// Request headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// Optional request body.
    pub body: Option<String>,
    /// Whether the transport should follow 3xx responses itself.
    pub follow_redirects: bool,
}

impl HttpRequest {
    /// Creates a GET request that follows redirects.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            follow_redirects: true,
        }
    }

    /// Creates a POST request carrying a form-urlencoded body.
    #[must_use]
    pub fn post_form(url: impl Into<String>, body: String) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: vec![(
                CONTENT_TYPE.to_string(),
                "application/x-www-form-urlencoded".to_string(),
            )],
            body: Some(body),
            follow_redirects: true,
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a `Cookie` header unless `cookie_header` is empty.
    #[must_use]
    pub fn cookies(self, cookie_header: String) -> Self {
        if cookie_header.is_empty() {
            self
        } else {
            self.header(COOKIE, cookie_header)
        }
    }

    /// Sets redirect handling.
    #[must_use]
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Returns the first value of a request header (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

// Bodies and cookie headers may carry credentials.
impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &header_names)
            .field("body", &self.body.as_ref().map(|_| "[REDACTED]"))
            .field("follow_redirects", &self.follow_redirects)
            .finish()
    }
}

/// A response as seen by the pipeline.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Every response header occurrence, names lowercased.
    pub headers: Vec<(String, String)>,
    /// Response body decoded as text.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response with no headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Adds a header occurrence.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    /// Returns the first value for `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_all(name).next()
    }

    /// Returns every value for `name` (case-insensitive), in order.
    pub fn header_all<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a str> + use<'a, 'n> {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns every `Set-Cookie` occurrence.
    #[must_use]
    pub fn set_cookies(&self) -> Vec<&str> {
        self.header_all(SET_COOKIE).collect()
    }
}

/// Transport collaborator: performs one HTTP exchange.
///
/// Implementations must not follow redirects when
/// [`HttpRequest::follow_redirects`] is `false`, and must expose every
/// `Set-Cookie` occurrence rather than only the last.
///
/// Any status code is a successful exchange at this level; callers decide
/// which codes they accept.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs the request.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response could be obtained.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
