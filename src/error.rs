//! Pipeline error types.
//!
//! Every variant is terminal for the run that raised it: nothing is retried
//! and no partial result is cached or returned. [`PipelineError::kind`]
//! collapses the variants onto the three failure kinds callers care about.

use std::fmt;

use thiserror::Error;

use crate::auth::AuthStep;
use crate::http::TransportError;

/// Coarse failure classification for diagnostics and entry-point responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure or unexpected HTTP status.
    Transport,
    /// An expected structural element was missing or malformed.
    Protocol,
    /// The login flow did not produce the expected redirect chain.
    Authentication,
}

impl ErrorKind {
    /// Short stable identifier (`transport`, `protocol`, `authentication`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Authentication => "authentication",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a reading-list pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Transport failure at a GET/POST boundary.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An expected marker or header was absent.
    #[error("protocol error during {context}: {reason}")]
    Protocol {
        /// Where the failure happened (e.g. `token fetch`).
        context: String,
        /// What was missing.
        reason: String,
    },

    /// A response body was not the JSON shape the endpoint promises.
    #[error("malformed JSON payload from {url}: {source}")]
    MalformedPayload {
        /// The URL whose body failed to parse.
        url: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The login flow answered with something other than the expected redirect.
    ///
    /// Covers rejected credentials and challenge interstitials alike.
    #[error("[AUTH] login flow failed at {step}: HTTP {status} received instead of 302")]
    Authentication {
        /// The step whose response broke the chain.
        step: AuthStep,
        /// The HTTP status received.
        status: u16,
    },
}

impl PipelineError {
    /// Creates a protocol error.
    pub fn protocol(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Protocol {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Creates a malformed-payload error.
    pub fn malformed_payload(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::MalformedPayload {
            url: url.into(),
            source,
        }
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(step: AuthStep, status: u16) -> Self {
        Self::Authentication { step, status }
    }

    /// Returns the failure kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Protocol { .. } | Self::MalformedPayload { .. } => ErrorKind::Protocol,
            Self::Authentication { .. } => ErrorKind::Authentication,
        }
    }
}
