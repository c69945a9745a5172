//! Accumulating cookie store for one pipeline run.
//!
//! Only accumulate-and-merge semantics are implemented: `Set-Cookie`
//! attributes (Path, Expires, Domain, ...) are discarded, later values
//! overwrite earlier ones, and nothing ever expires or is removed. The store
//! is dropped when the pipeline finishes.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, instrument, trace};

/// A single `name=value` pair parsed from a `Set-Cookie` header.
///
/// The value is redacted in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value; never logged.
    value: String,
}

impl Cookie {
    /// Parses one raw `Set-Cookie` header value.
    ///
    /// Everything after the first `;` is dropped, then the remainder is split
    /// on the first `=`. Returns `None` unless both halves are non-empty; the
    /// value may itself contain `=`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let pair = raw.split(';').next().unwrap_or_default();
        let (name, value) = pair.split_once('=')?;
        if name.is_empty() || value.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive; avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Session cookie set: name → current value.
///
/// Invariant: never holds an empty name or an empty value.
#[derive(Clone, Default)]
pub struct CookieStore {
    cookies: BTreeMap<String, String>,
}

impl CookieStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges raw `Set-Cookie` header values into the store.
    ///
    /// Malformed or attribute-only fragments are skipped silently.
    /// Returns the number of cookies accepted.
    #[instrument(level = "debug", skip_all, fields(headers = set_cookie_headers.len()))]
    pub fn merge<S: AsRef<str>>(&mut self, set_cookie_headers: &[S]) -> usize {
        let mut accepted = 0;
        for raw in set_cookie_headers {
            match Cookie::parse(raw.as_ref()) {
                Some(cookie) => {
                    debug!(name = %cookie.name, "merged cookie");
                    self.cookies.insert(cookie.name, cookie.value);
                    accepted += 1;
                }
                None => trace!("skipping malformed Set-Cookie fragment"),
            }
        }
        accepted
    }

    /// Renders the store as a `Cookie` request header value:
    /// `name1=value1;name2=value2`.
    ///
    /// Order is by cookie name. Returns an empty string for an empty store.
    #[must_use]
    pub fn render(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Returns the current value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Number of distinct cookie names held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns `true` when no cookie has been merged yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

impl fmt::Debug for CookieStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieStore")
            .field("names", &self.cookies.keys().collect::<Vec<_>>())
            .finish()
    }
}
