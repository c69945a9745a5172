//! Cursor-driven reading list fetcher.
//!
//! The entries endpoint returns one page at a time:
//!
//! ```json
//! {"entries": [{"title": "Ferris", "created": "2024-01-01T00:00:00Z"}], "next": "opaque-cursor"}
//! ```
//!
//! The fetcher requests pages until a response arrives without `next`,
//! accumulating every entry into a [`ReadingList`] keyed by title.
//! There is no page cap: termination is the server's call.

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::error::PipelineError;
use crate::http::{HttpRequest, HttpTransport, TransportError};
use crate::model::{ListEntry, ReadingList};
use crate::session::Session;

/// One page of the entries endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ListPage {
    /// Entries on this page.
    #[serde(default)]
    pub entries: Vec<RawEntry>,
    /// Continuation cursor; absent (or `null`) on the last page.
    #[serde(default)]
    pub next: Option<String>,
}

/// One entry as sent by the server. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEntry {
    /// Page title.
    pub title: String,
    /// Timestamp the entry was added.
    pub created: String,
}

/// Builds the URL for the page after `cursor`.
///
/// The first backslash in the cursor is dropped before percent-encoding, as
/// the server escapes one character of the cursor it hands out.
#[must_use]
pub fn next_page_url(entries_url: &str, cursor: &str) -> String {
    let cursor = cursor.replacen('\\', "", 1);
    format!("{entries_url}?next={}", urlencoding::encode(&cursor))
}

/// Pages through the authenticated entries endpoint.
#[derive(Debug, Clone)]
pub struct ListFetcher {
    entries_url: String,
}

impl ListFetcher {
    /// Creates a fetcher for the given entries endpoint.
    #[must_use]
    pub fn new(entries_url: impl Into<String>) -> Self {
        Self {
            entries_url: entries_url.into(),
        }
    }

    /// Fetches every page and returns the accumulated list.
    ///
    /// Each request waits on the session's rate limiter and carries the
    /// session cookies. A repeated title overwrites the earlier entry.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for any status other than 200 and
    /// [`PipelineError::MalformedPayload`] for a body that is not a list page.
    #[instrument(skip_all, fields(entries_url = %self.entries_url))]
    pub async fn fetch_all(
        &self,
        transport: &dyn HttpTransport,
        session: &mut Session,
    ) -> Result<ReadingList, PipelineError> {
        let mut list = ReadingList::new();
        let mut url = self.entries_url.clone();
        let mut pages = 0_usize;

        loop {
            session.limiter.wait().await;
            let page = self.fetch_page(transport, session, &url).await?;
            pages += 1;

            let received = page.entries.len();
            for entry in page.entries {
                if list.insert(entry.title.clone(), ListEntry::new(entry.created)) {
                    warn!(title = %entry.title, "title repeated across pages; keeping latest");
                }
            }
            debug!(page = pages, received, total = list.len(), "list page merged");

            match page.next {
                Some(cursor) if !cursor.is_empty() => {
                    url = next_page_url(&self.entries_url, &cursor);
                }
                Some(_) => {
                    warn!(page = pages, "empty continuation cursor; treating as last page");
                    break;
                }
                None => break,
            }
        }

        info!(pages, entries = list.len(), "reading list fetched");
        Ok(list)
    }

    async fn fetch_page(
        &self,
        transport: &dyn HttpTransport,
        session: &Session,
        url: &str,
    ) -> Result<ListPage, PipelineError> {
        let request = HttpRequest::get(url).cookies(session.cookies.render());
        let response = transport.execute(request).await?;
        if response.status != 200 {
            return Err(TransportError::unexpected_status(url, response.status, 200).into());
        }
        serde_json::from_str(&response.body).map_err(|e| PipelineError::malformed_payload(url, e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_next_page_url_percent_encodes_cursor() {
        let url = next_page_url("https://example.org/lists/1/entries/", "a/b+c=d|e");
        assert_eq!(
            url,
            "https://example.org/lists/1/entries/?next=a%2Fb%2Bc%3Dd%7Ce"
        );
    }

    #[test]
    fn test_next_page_url_drops_first_backslash_only() {
        let url = next_page_url("https://example.org/e/", r"x\y\z");
        assert_eq!(url, "https://example.org/e/?next=xy%5Cz");
    }

    #[test]
    fn test_list_page_parses_optional_next() {
        let page: ListPage = serde_json::from_str(
            r#"{"entries":[{"id":7,"title":"A","created":"t","project":"enwiki"}],"next":"c1"}"#,
        )
        .unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].title, "A");
        assert_eq!(page.next.as_deref(), Some("c1"));

        let last: ListPage = serde_json::from_str(r#"{"entries":[]}"#).unwrap();
        assert!(last.next.is_none());

        let null_cursor: ListPage =
            serde_json::from_str(r#"{"entries":[],"next":null}"#).unwrap();
        assert!(null_cursor.next.is_none());
    }
}
