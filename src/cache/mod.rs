//! Cache collaborators for the read-through path.
//!
//! - [`CacheStore`] - Async key-value contract with per-entry TTL
//! - [`MemoryCache`] - Process-lifetime store backed by `DashMap`
//! - [`SqliteCache`] - Persistent store backed by SQLite
//! - [`cache_key`] - Derives the key for an identity without storing it raw

mod memory;
mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Lifetime of a cached reading list: just under 24 hours.
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24 - 60);

/// Prefix of every reading-list cache key.
const CACHE_KEY_PREFIX: &str = "reading-list#default#";

/// Cache-related errors.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Query or connection failure.
    #[error("cache database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("failed to run cache migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Key-value store with TTL, treated as an external capability.
///
/// Reads and writes are assumed atomic per key; callers add no locking.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the live value for `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key` until `ttl` elapses, replacing any previous value.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// Derives the cache key for `identity`.
///
/// The key embeds the lowercase hex SHA-256 of the identity, never the
/// identity itself.
#[must_use]
pub fn cache_key(identity: &str) -> String {
    let digest = Sha256::digest(identity.as_bytes());
    format!("{CACHE_KEY_PREFIX}{digest:x}")
}
