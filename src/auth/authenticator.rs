//! Cookie-session authenticator.
//!
//! Walks [`LOGIN_FLOW`] one row at a time. Each step waits on the session's
//! rate limiter, sends its request with the cookies gathered so far, checks
//! the status against the row, and merges the response's `Set-Cookie`
//! headers. The first mismatch aborts the whole flow.

use tracing::{debug, info, instrument, warn};
use url::form_urlencoded;

use super::flow::{AuthStep, LOGIN_FLOW, NextAction, StepRequest, Transition};
use super::token::{extract_login_token, redirect_target};
use super::Credentials;
use crate::error::PipelineError;
use crate::http::{HttpRequest, HttpTransport};
use crate::session::Session;

/// Where the authenticator currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No request sent yet.
    NotStarted,
    /// Executing the given step.
    InProgress(AuthStep),
    /// The session's cookie store now holds an authenticated session.
    Authenticated,
    /// The given step failed; the run is over.
    Failed(AuthStep),
}

/// Value carried from one step into the next.
enum Carry {
    Nothing,
    Token(String),
    Location(String),
}

/// Drives the login flow for one pipeline run.
///
/// There is no token object on success: later requests use
/// `session.cookies.render()`.
#[derive(Debug, Clone)]
pub struct Authenticator {
    login_url: String,
    state: AuthState,
}

impl Authenticator {
    /// Creates an authenticator for the given login page URL.
    #[must_use]
    pub fn new(login_url: impl Into<String>) -> Self {
        Self {
            login_url: login_url.into(),
            state: AuthState::NotStarted,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Runs the login flow, leaving the authenticated cookies in `session`.
    ///
    /// # Errors
    ///
    /// - [`TransportError`](crate::http::TransportError) when the login page
    ///   is not a 200 or any request fails on the wire
    /// - [`PipelineError::Protocol`] when the login token or a `Location`
    ///   header is missing
    /// - [`PipelineError::Authentication`] when any later step answers with
    ///   something other than 302
    #[instrument(skip_all, fields(login_url = %self.login_url))]
    pub async fn authenticate(
        &mut self,
        transport: &dyn HttpTransport,
        session: &mut Session,
        credentials: &Credentials,
    ) -> Result<(), PipelineError> {
        let mut carry = Carry::Nothing;

        for transition in &LOGIN_FLOW {
            self.state = AuthState::InProgress(transition.step);
            match self
                .run_step(transition, carry, transport, session, credentials)
                .await
            {
                Ok(next) => carry = next,
                Err(error) => {
                    self.state = AuthState::Failed(transition.step);
                    warn!(step = %transition.step, kind = %error.kind(), "login flow aborted");
                    return Err(error);
                }
            }
        }

        self.state = AuthState::Authenticated;
        info!(cookies = session.cookies.len(), "authenticated");
        Ok(())
    }

    async fn run_step(
        &self,
        transition: &Transition,
        carry: Carry,
        transport: &dyn HttpTransport,
        session: &mut Session,
        credentials: &Credentials,
    ) -> Result<Carry, PipelineError> {
        let step = transition.step;
        session.limiter.wait().await;

        let request = self
            .build_request(transition, carry, session, credentials)?
            .follow_redirects(transition.follow_redirects);
        let url = request.url.clone();

        let response = transport.execute(request).await?;
        debug!(step = %step, status = response.status, "login step response");

        if response.status != transition.expected_status {
            return Err(transition.mismatch_error(&url, response.status));
        }

        let next = match transition.next {
            NextAction::ExtractToken => Carry::Token(extract_login_token(&response.body)?),
            NextAction::FollowLocation => {
                Carry::Location(redirect_target(step.as_str(), &url, &response)?)
            }
            NextAction::Complete => Carry::Nothing,
        };

        let merged = session.cookies.merge(&response.set_cookies());
        debug!(step = %step, merged, total = session.cookies.len(), "cookies updated");
        Ok(next)
    }

    fn build_request(
        &self,
        transition: &Transition,
        carry: Carry,
        session: &Session,
        credentials: &Credentials,
    ) -> Result<HttpRequest, PipelineError> {
        let step = transition.step;
        match (transition.request, carry) {
            (StepRequest::LoginPage, _) => Ok(HttpRequest::get(&self.login_url)),
            (StepRequest::SubmitCredentials, Carry::Token(token)) => Ok(HttpRequest::post_form(
                &self.login_url,
                login_form(credentials, &token),
            )
            .cookies(session.cookies.render())),
            (StepRequest::PreviousLocation, Carry::Location(location)) => {
                Ok(HttpRequest::get(location).cookies(session.cookies.render()))
            }
            (StepRequest::SubmitCredentials, _) => Err(PipelineError::protocol(
                step.as_str(),
                "no login token carried from the previous step",
            )),
            (StepRequest::PreviousLocation, _) => Err(PipelineError::protocol(
                step.as_str(),
                "no redirect target carried from the previous step",
            )),
        }
    }
}

/// Builds the form-urlencoded login body.
///
/// `wpEditToken` is the service's anonymous CSRF placeholder.
fn login_form(credentials: &Credentials, token: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("title", "Special:UserLogin")
        .append_pair("wpName", credentials.username())
        .append_pair("wpPassword", credentials.password())
        .append_pair("wpRemember", "1")
        .append_pair("wpEditToken", "+\\")
        .append_pair("authAction", "login")
        .append_pair("wpLoginToken", token)
        .append_pair("geEnabled", "-1")
        .finish()
}
