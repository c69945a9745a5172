//! Login token and redirect target extraction.

use url::Url;

use crate::error::PipelineError;
use crate::http::{HttpResponse, LOCATION, TransportError};

/// Hidden input that precedes the login token on the login page.
pub const LOGIN_TOKEN_MARKER: &str = r#"<input name="wpLoginToken" type="hidden" value=""#;

/// End of the token attribute.
const LOGIN_TOKEN_TERMINATOR: &str = "\">";

/// Extracts the login token from the login page markup.
///
/// The marker must occur exactly once. The token runs from the marker to the
/// next `">`, or to the end of the page when no terminator follows.
///
/// # Errors
///
/// Returns [`PipelineError::Protocol`] when the marker is absent or repeated,
/// or when the token is empty.
pub fn extract_login_token(page: &str) -> Result<String, PipelineError> {
    let mut segments = page.split(LOGIN_TOKEN_MARKER);
    let _before = segments.next();
    let (Some(after), None) = (segments.next(), segments.next()) else {
        return Err(PipelineError::protocol(
            "token fetch",
            "login token wasn't found",
        ));
    };

    let token = after.split(LOGIN_TOKEN_TERMINATOR).next().unwrap_or_default();
    if token.is_empty() {
        return Err(PipelineError::protocol("token fetch", "login token is empty"));
    }
    Ok(token.to_string())
}

/// Resolves the `Location` header of `response` against `request_url`.
///
/// # Errors
///
/// Returns [`PipelineError::Protocol`] when the header is missing or cannot
/// be resolved, and [`TransportError::InvalidUrl`] when `request_url` itself
/// does not parse.
pub fn redirect_target(
    context: &str,
    request_url: &str,
    response: &HttpResponse,
) -> Result<String, PipelineError> {
    let location = response
        .header(LOCATION)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| PipelineError::protocol(context, "redirect without a Location header"))?;

    let base = Url::parse(request_url).map_err(|_| TransportError::invalid_url(request_url))?;
    let target = base.join(location).map_err(|e| {
        PipelineError::protocol(context, format!("unusable Location header: {e}"))
    })?;
    Ok(target.into())
}
