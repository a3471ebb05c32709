//! Key-value store port and its backends.
//!
//! The cache-aside layer never holds state of its own: counts and cached
//! content live in a [`KvStore`]. Each trait method is a single primitive
//! that the backend must execute atomically, so callers never need a
//! client-side read-modify-write.
//!
//! Backends:
//!
//! - [`SqliteStore`]: durable, WAL-mode SQLite via tokio-rusqlite
//! - [`MemoryStore`]: in-process map, used by tests and ephemeral runs

pub mod memory;
pub mod migrations;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AppConfig, StoreBackend};
use crate::{ConfigError, Error};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Primitive operations the cache-aside layer needs from a store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Atomically add one to the integer at `key` and return the new value.
    ///
    /// A missing or expired key counts as zero.
    async fn incr(&self, key: &str) -> Result<u64, Error>;

    /// Fetch the value at `key`, or `None` if it was never set or has expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Store `value` at `key`, unreachable through [`get`](Self::get) once
    /// `ttl_seconds` have elapsed. Replaces any previous value and expiry.
    async fn set_ex(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), Error>;

    /// Physically drop expired entries. Returns the number removed.
    async fn purge_expired(&self) -> Result<u64, Error>;
}

/// Open the backend selected by `config`.
pub async fn open_configured(config: &AppConfig) -> Result<Arc<dyn KvStore>, Error> {
    match config.store_backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Sqlite => {
            let path = config
                .require_db_path()
                .map_err(|e: ConfigError| Error::InvalidInput(e.to_string()))?;
            tracing::debug!(path = %path.display(), "opening sqlite store");
            Ok(Arc::new(SqliteStore::open(path).await?))
        }
    }
}

/// Decode a counter stored as ASCII decimal.
pub fn parse_counter(key: &str, raw: &[u8]) -> Result<u64, Error> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or_else(|| Error::StoreUnavailable(format!("value at {key} is not an integer")))
}
