//! `reqwest`-backed transport.
//!
//! Redirect policy in reqwest is fixed per client, so the transport holds two
//! clients built from the same policy: one that follows redirects and one
//! that surfaces 3xx responses to the caller.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Proxy};
use tracing::{debug, instrument, warn};
use url::Url;

use super::user_agent::default_user_agent;
use super::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Default HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default HTTP read timeout (30 seconds).
pub const READ_TIMEOUT_SECS: u64 = 30;

/// Production [`HttpTransport`] built on `reqwest`.
///
/// Cookie handling is left entirely to the caller: neither client keeps a
/// cookie store, so the only cookies sent are the ones in the request's
/// `Cookie` header.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    following: Client,
    manual: Client,
}

impl ReqwestTransport {
    /// Creates a transport with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when client construction fails.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a transport with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when client construction fails.
    pub fn with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, TransportError> {
        let timeouts = (connect_timeout_secs, read_timeout_secs);
        Ok(Self {
            following: build_client(timeouts, true)?,
            manual: build_client(timeouts, false)?,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = Url::parse(&request.url)
            .map_err(|_| TransportError::invalid_url(request.url.clone()))?;

        let client = if request.follow_redirects {
            &self.following
        } else {
            &self.manual
        };

        let mut builder = client.request(request.method.clone(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::network(request.url.clone(), e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::network(request.url.clone(), e))?;

        debug!(status, bytes = body.len(), "response received");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn build_client(timeouts: (u64, u64), follow_redirects: bool) -> Result<Client, TransportError> {
    // Some restricted sandbox environments panic when querying system proxy
    // settings; retry with env-only proxy lookup before giving up.
    match catch_unwind(AssertUnwindSafe(|| {
        base_builder(timeouts)
            .redirect(redirect_policy(follow_redirects))
            .build()
    })) {
        Ok(Ok(client)) => Ok(client),
        Ok(Err(error)) => Err(TransportError::network("<client construction>", error)),
        Err(_) => {
            warn!("HTTP client hit system proxy panic; using env-proxy fallback builder");
            apply_env_proxy_fallback(base_builder(timeouts).no_proxy())
                .redirect(redirect_policy(follow_redirects))
                .build()
                .map_err(|error| TransportError::network("<client construction>", error))
        }
    }
}

fn redirect_policy(follow_redirects: bool) -> Policy {
    if follow_redirects {
        Policy::default()
    } else {
        Policy::none()
    }
}

fn base_builder((connect_timeout_secs, read_timeout_secs): (u64, u64)) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(read_timeout_secs))
        .user_agent(default_user_agent())
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"])
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"])
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
