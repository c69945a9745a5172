//! Cookie-based session authentication.
//!
//! The remote service has no token API: a login is a page scrape followed by
//! a form POST and a chain of redirects, and the result is a set of session
//! cookies. This module models that flow as an explicit transition table
//! ([`LOGIN_FLOW`]) walked by the [`Authenticator`].

mod authenticator;
mod flow;
mod token;

pub use authenticator::{AuthState, Authenticator};
pub use flow::{AuthStep, LOGIN_FLOW, NextAction, OnMismatch, StepRequest, Transition};
pub use token::{LOGIN_TOKEN_MARKER, extract_login_token, redirect_target};

use std::fmt;

/// Account credentials for the remote service.
///
/// The password is redacted in Debug output and never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Account name; also the identity the cache key is derived from.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Account password; never logged.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
