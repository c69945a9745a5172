//! Shared User-Agent string for all outbound requests.

/// Product token sent with every request.
const PRODUCT: &str = env!("CARGO_PKG_NAME");

/// Default User-Agent (identifies the tool and its version).
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (reading-list-sync)")
}
