//! Batch extract enrichment.
//!
//! The public extract endpoint accepts up to [`EXTRACT_BATCH_SIZE`] titles per
//! request, joined with `|`, and answers with
//!
//! ```json
//! {"query": {"pages": {"736": {"pageid": 736, "title": "Ferris", "extract": "..."}}}}
//! ```
//!
//! Returned titles are matched back onto the list. Titles the endpoint does
//! not return (renamed or deleted pages) keep no extract, and returned titles
//! that are not on the list are ignored.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, info, instrument, trace};

use crate::error::PipelineError;
use crate::http::{HttpRequest, HttpTransport, TransportError};
use crate::model::ReadingList;
use crate::session::RateLimiter;

/// Maximum number of titles per batch request.
pub const EXTRACT_BATCH_SIZE: usize = 10;

/// Title delimiter understood by the batch endpoint.
pub const TITLE_SEPARATOR: &str = "|";

/// Extracts longer than this many characters are truncated.
pub const TRUNCATE_THRESHOLD: usize = 500;

/// Length, in characters, that over-long extracts are cut to.
pub const TRUNCATED_LENGTH: usize = 200;

/// Batch endpoint response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractResponse {
    /// Query result; absent when the batch matched nothing.
    #[serde(default)]
    pub query: ExtractQuery,
}

/// `query` object of the batch response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractQuery {
    /// Pages keyed by opaque page id.
    #[serde(default)]
    pub pages: HashMap<String, ExtractPage>,
}

/// One page of the batch response.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractPage {
    /// Page title, possibly percent-encoded.
    pub title: String,
    /// Plain-text intro; absent for missing pages.
    #[serde(default)]
    pub extract: Option<String>,
}

/// Splits titles into `|`-joined batches of at most [`EXTRACT_BATCH_SIZE`].
pub fn title_batches<'a, I>(titles: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let titles: Vec<&str> = titles.into_iter().collect();
    titles
        .chunks(EXTRACT_BATCH_SIZE)
        .map(|chunk| chunk.join(TITLE_SEPARATOR))
        .collect()
}

/// Applies the two-tier length rule, then strips line breaks.
///
/// Text longer than [`TRUNCATE_THRESHOLD`] characters keeps only its first
/// [`TRUNCATED_LENGTH`] characters; shorter text keeps its length. Every
/// `\r` and `\n` is removed in both cases.
#[must_use]
pub fn normalize_extract(raw: &str) -> String {
    let kept: String = if raw.chars().count() > TRUNCATE_THRESHOLD {
        raw.chars().take(TRUNCATED_LENGTH).collect()
    } else {
        raw.to_string()
    };
    kept.replace(['\r', '\n'], "")
}

/// Decodes a returned title for matching; undecodable titles are used verbatim.
fn decode_title(title: &str) -> String {
    urlencoding::decode(title).map_or_else(|_| title.to_string(), |decoded| decoded.into_owned())
}

/// Merges batch extracts onto a reading list.
#[derive(Debug, Clone)]
pub struct ExtractEnricher {
    extracts_url: String,
}

impl ExtractEnricher {
    /// Creates an enricher.
    ///
    /// `extracts_url` is the full endpoint URL up to and including the
    /// `titles=` parameter; the encoded batch is appended to it.
    #[must_use]
    pub fn new(extracts_url: impl Into<String>) -> Self {
        Self {
            extracts_url: extracts_url.into(),
        }
    }

    /// Builds the request URL for one `|`-joined batch.
    #[must_use]
    pub fn batch_url(&self, batch: &str) -> String {
        format!("{}{}", self.extracts_url, urlencoding::encode(batch))
    }

    /// Fetches extracts for every title in `list` and stores matches.
    ///
    /// Requests are unauthenticated and each waits on `limiter`.
    /// Returns the number of entries that received an extract.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for any status other than 200 and
    /// [`PipelineError::MalformedPayload`] for a body that is not a batch response.
    #[instrument(skip_all, fields(titles = list.len()))]
    pub async fn enrich(
        &self,
        transport: &dyn HttpTransport,
        limiter: &mut RateLimiter,
        list: &mut ReadingList,
    ) -> Result<usize, PipelineError> {
        let batches = title_batches(list.titles());
        let mut matched = 0;

        for (index, batch) in batches.iter().enumerate() {
            limiter.wait().await;
            let response = self.fetch_batch(transport, batch).await?;

            let mut batch_matched = 0;
            for page in response.query.pages.into_values() {
                let Some(extract) = page.extract else {
                    trace!(title = %page.title, "page has no extract");
                    continue;
                };
                let title = decode_title(&page.title);
                if list.set_extract(&title, normalize_extract(&extract)) {
                    batch_matched += 1;
                } else {
                    trace!(title = %title, "extract for a title not on the list");
                }
            }
            debug!(batch = index + 1, matched = batch_matched, "extract batch merged");
            matched += batch_matched;
        }

        info!(batches = batches.len(), matched, "extracts merged");
        Ok(matched)
    }

    async fn fetch_batch(
        &self,
        transport: &dyn HttpTransport,
        batch: &str,
    ) -> Result<ExtractResponse, PipelineError> {
        let url = self.batch_url(batch);
        let response = transport.execute(HttpRequest::get(url.as_str())).await?;
        if response.status != 200 {
            return Err(TransportError::unexpected_status(url, response.status, 200).into());
        }
        serde_json::from_str(&response.body).map_err(|e| PipelineError::malformed_payload(url, e))
    }
}
