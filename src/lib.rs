//! Reading List Core Library
//!
//! This library retrieves a user's saved reading list from a service that
//! only offers cookie-based sessions, enriches every entry with a short page
//! extract from a public batch endpoint, and serves the combined result
//! through a read-through cache.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`http`] - Transport trait and the `reqwest` implementation
//! - [`session`] - Per-run cookie store and fixed-delay rate limiter
//! - [`auth`] - Login flow transition table and authenticator
//! - [`list`] - Cursor-driven list fetcher
//! - [`extract`] - Batch extract enricher
//! - [`cache`] - Cache trait, in-memory and SQLite backends
//! - [`service`] - Cache-fronted orchestrator
//! - [`server`] - HTTP entry point
//! - [`config`] - Endpoint defaults and config-file loading

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod list;
pub mod model;
pub mod server;
pub mod service;
pub mod session;

// Re-export commonly used types
pub use auth::{AuthState, AuthStep, Authenticator, Credentials};
pub use cache::{CACHE_TTL, CacheError, CacheStore, MemoryCache, SqliteCache, cache_key};
pub use config::{ConfigError, Endpoints, FileConfig};
pub use error::{ErrorKind, PipelineError};
pub use extract::{EXTRACT_BATCH_SIZE, ExtractEnricher};
pub use http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
pub use list::ListFetcher;
pub use model::{ListEntry, ReadingList};
pub use service::{ReadingListJson, ReadingListService, Source};
pub use session::{CookieStore, DEFAULT_REQUEST_INTERVAL_MS, RateLimiter, Session};
