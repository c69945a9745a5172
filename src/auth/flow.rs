//! Login flow transition table.
//!
//! The login is four strictly ordered exchanges. Each row of [`LOGIN_FLOW`]
//! states which request the step sends, which status code counts as
//! progress, how a different code is reported, and what the step hands to
//! the next one. The [`Authenticator`](super::Authenticator) only walks the
//! table; it holds no per-step conditionals of its own.

use std::fmt;

use crate::error::PipelineError;
use crate::http::TransportError;

/// One step of the login flow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthStep {
    /// GET the login page and read the hidden login token.
    TokenFetch,
    /// POST credentials and token; success is a redirect.
    CredentialSubmit,
    /// Follow the first redirect without letting the transport follow it.
    RedirectHop1,
    /// Follow the second redirect; afterwards the session is authenticated.
    RedirectHop2,
}

impl AuthStep {
    /// Human-readable step name used in logs and errors.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TokenFetch => "token fetch",
            Self::CredentialSubmit => "credential submit",
            Self::RedirectHop1 => "first redirect hop",
            Self::RedirectHop2 => "second redirect hop",
        }
    }

    /// The transition-table row for this step.
    #[must_use]
    pub fn transition(self) -> &'static Transition {
        match self {
            Self::TokenFetch => &LOGIN_FLOW[0],
            Self::CredentialSubmit => &LOGIN_FLOW[1],
            Self::RedirectHop1 => &LOGIN_FLOW[2],
            Self::RedirectHop2 => &LOGIN_FLOW[3],
        }
    }
}

impl fmt::Display for AuthStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request sent by a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRequest {
    /// Unauthenticated GET of the configured login URL.
    LoginPage,
    /// Form POST of credentials and the fetched token to the login URL.
    SubmitCredentials,
    /// GET of the `Location` returned by the previous step.
    PreviousLocation,
}

/// How a status other than the expected one is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMismatch {
    /// `TransportError::UnexpectedStatus`.
    Transport,
    /// `PipelineError::Authentication`.
    Authentication,
}

/// What a successful step hands to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    /// Extract the hidden login token from the body.
    ExtractToken,
    /// Read the `Location` header as the next URL.
    FollowLocation,
    /// Nothing; the flow is complete.
    Complete,
}

/// One row of the login transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// The step this row describes.
    pub step: AuthStep,
    /// Request sent by the step.
    pub request: StepRequest,
    /// Whether the transport may follow redirects for this request.
    pub follow_redirects: bool,
    /// The only status code that counts as progress.
    pub expected_status: u16,
    /// Error reported for any other status code.
    pub on_mismatch: OnMismatch,
    /// What the response yields for the following step.
    pub next: NextAction,
}

impl Transition {
    /// Builds the error for an unexpected `status` at `url`.
    #[must_use]
    pub fn mismatch_error(&self, url: &str, status: u16) -> PipelineError {
        match self.on_mismatch {
            OnMismatch::Transport => {
                TransportError::unexpected_status(url, status, self.expected_status).into()
            }
            OnMismatch::Authentication => PipelineError::authentication(self.step, status),
        }
    }
}

/// The login flow. A 200 is never success after the token fetch.
pub static LOGIN_FLOW: [Transition; 4] = [
    Transition {
        step: AuthStep::TokenFetch,
        request: StepRequest::LoginPage,
        follow_redirects: true,
        expected_status: 200,
        on_mismatch: OnMismatch::Transport,
        next: NextAction::ExtractToken,
    },
    Transition {
        step: AuthStep::CredentialSubmit,
        request: StepRequest::SubmitCredentials,
        follow_redirects: false,
        expected_status: 302,
        on_mismatch: OnMismatch::Authentication,
        next: NextAction::FollowLocation,
    },
    Transition {
        step: AuthStep::RedirectHop1,
        request: StepRequest::PreviousLocation,
        follow_redirects: false,
        expected_status: 302,
        on_mismatch: OnMismatch::Authentication,
        next: NextAction::FollowLocation,
    },
    Transition {
        step: AuthStep::RedirectHop2,
        request: StepRequest::PreviousLocation,
        follow_redirects: false,
        expected_status: 302,
        on_mismatch: OnMismatch::Authentication,
        next: NextAction::Complete,
    },
];
