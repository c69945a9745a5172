//! Cache-fronted reading list orchestrator.
//!
//! On a cache hit the stored JSON is returned as-is and no request is made.
//! On a miss one pipeline run authenticates, pages through the list, merges
//! extracts, and stores the serialized result before returning it. Every run
//! gets a fresh [`Session`], so concurrent runs share nothing.
//!
//! Concurrent misses for the same identity each run the full pipeline; the
//! last cache write wins.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use readinglist_core::{Credentials, Endpoints, MemoryCache, ReadingListService, ReqwestTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ReadingListService::new(
//!     Arc::new(ReqwestTransport::new()?),
//!     Arc::new(MemoryCache::new()),
//!     Endpoints::default(),
//! );
//! let list = service
//!     .get_reading_list(&Credentials::new("user", "secret"))
//!     .await?;
//! println!("{} entries", list.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::auth::{Authenticator, Credentials};
use crate::cache::{CACHE_TTL, CacheStore, cache_key};
use crate::config::Endpoints;
use crate::error::PipelineError;
use crate::extract::ExtractEnricher;
use crate::http::HttpTransport;
use crate::list::ListFetcher;
use crate::model::ReadingList;
use crate::session::{DEFAULT_REQUEST_INTERVAL, RateLimiter, Session};

/// Where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Served from the cache without network work.
    Cache,
    /// Produced by a full pipeline run.
    Pipeline,
}

/// Serialized reading list plus its origin.
#[derive(Debug, Clone)]
pub struct ReadingListJson {
    /// JSON object mapping title → `{created, extract?}`.
    pub body: String,
    /// Whether `body` came from the cache.
    pub source: Source,
}

/// Read-through orchestrator for the reading list.
#[derive(Clone)]
pub struct ReadingListService {
    transport: Arc<dyn HttpTransport>,
    cache: Option<Arc<dyn CacheStore>>,
    endpoints: Endpoints,
    request_interval: Duration,
    cache_ttl: Duration,
}

impl ReadingListService {
    /// Creates a service with the default 500 ms request interval and cache TTL.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn CacheStore>,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            transport,
            cache: Some(cache),
            endpoints,
            request_interval: DEFAULT_REQUEST_INTERVAL,
            cache_ttl: CACHE_TTL,
        }
    }

    /// Creates a service that never reads or writes a cache.
    #[must_use]
    pub fn uncached(transport: Arc<dyn HttpTransport>, endpoints: Endpoints) -> Self {
        Self {
            transport,
            cache: None,
            endpoints,
            request_interval: DEFAULT_REQUEST_INTERVAL,
            cache_ttl: CACHE_TTL,
        }
    }

    /// Overrides the delay applied before each remote call.
    #[must_use]
    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    /// Overrides the cache TTL.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Returns the reading list, from the cache when possible.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when a pipeline run fails; nothing is cached
    /// in that case.
    pub async fn get_reading_list(
        &self,
        credentials: &Credentials,
    ) -> Result<ReadingList, PipelineError> {
        if let Some(list) = self.cached(credentials).await {
            return Ok(list);
        }
        let list = self.run_pipeline(credentials).await?;
        self.store(credentials, &list).await;
        Ok(list)
    }

    /// Returns the reading list serialized as JSON.
    ///
    /// A cache hit returns the stored bytes unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when a pipeline run fails.
    pub async fn get_reading_list_json(
        &self,
        credentials: &Credentials,
    ) -> Result<ReadingListJson, PipelineError> {
        if let Some(body) = self.cached_raw(credentials).await
            && decode_cached(&body).is_some()
        {
            return Ok(ReadingListJson {
                body,
                source: Source::Cache,
            });
        }
        let list = self.run_pipeline(credentials).await?;
        let body = self.store(credentials, &list).await;
        Ok(ReadingListJson {
            body,
            source: Source::Pipeline,
        })
    }

    /// Runs authenticate → fetch → enrich without touching the cache.
    ///
    /// # Errors
    ///
    /// Returns the first [`PipelineError`] raised by any stage.
    #[instrument(skip_all, fields(username = %credentials.username()))]
    pub async fn run_pipeline(
        &self,
        credentials: &Credentials,
    ) -> Result<ReadingList, PipelineError> {
        let transport = self.transport.as_ref();
        let mut session = Session::new(RateLimiter::new(self.request_interval));

        let mut authenticator = Authenticator::new(&self.endpoints.login_url);
        authenticator
            .authenticate(transport, &mut session, credentials)
            .await?;

        let mut list = ListFetcher::new(&self.endpoints.entries_url)
            .fetch_all(transport, &mut session)
            .await?;

        ExtractEnricher::new(&self.endpoints.extracts_url)
            .enrich(transport, &mut session.limiter, &mut list)
            .await?;

        info!(
            entries = list.len(),
            extracts = list.extract_count(),
            requests = session.limiter.waits(),
            delay_ms = session.limiter.cumulative_delay().as_millis(),
            "pipeline complete"
        );
        Ok(list)
    }

    async fn cached_raw(&self, credentials: &Credentials) -> Option<String> {
        let cache = self.cache.as_ref()?;
        let key = cache_key(credentials.username());
        match cache.get(&key).await {
            Ok(Some(body)) => {
                info!("reading list served from cache");
                Some(body)
            }
            Ok(None) => {
                info!("cache miss");
                None
            }
            Err(error) => {
                warn!(error = %error, "cache read failed; treating as miss");
                None
            }
        }
    }

    async fn cached(&self, credentials: &Credentials) -> Option<ReadingList> {
        let body = self.cached_raw(credentials).await?;
        decode_cached(&body)
    }

    /// Serializes `list`, writes it to the cache, and returns the JSON.
    async fn store(&self, credentials: &Credentials, list: &ReadingList) -> String {
        // A map of strings always serializes.
        let body = serde_json::to_string(list).unwrap_or_else(|_| String::from("{}"));
        if let Some(cache) = &self.cache {
            let key = cache_key(credentials.username());
            if let Err(error) = cache.put(&key, &body, self.cache_ttl).await {
                warn!(error = %error, "cache write failed; returning fresh result");
            }
        }
        body
    }
}

/// Decodes a cached body; an unreadable value counts as a miss.
fn decode_cached(body: &str) -> Option<ReadingList> {
    match serde_json::from_str(body) {
        Ok(list) => Some(list),
        Err(error) => {
            warn!(error = %error, "cached reading list is unreadable; treating as miss");
            None
        }
    }
}

impl std::fmt::Debug for ReadingListService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingListService")
            .field("endpoints", &self.endpoints)
            .field("cached", &self.cache.is_some())
            .field("request_interval", &self.request_interval)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}
