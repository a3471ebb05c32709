//! Fixed-TTL content cache.

use std::sync::Arc;

use crate::Error;
use crate::keys::content_key;
use crate::store::KvStore;

/// Reject zero or negative TTLs.
pub fn validate_ttl(ttl_seconds: i64) -> Result<u64, Error> {
    u64::try_from(ttl_seconds)
        .ok()
        .filter(|ttl| *ttl > 0)
        .ok_or(Error::InvalidTtl(ttl_seconds))
}

/// Memoizes fetched bodies in the `content:` namespace.
///
/// A missing entry and an expired one are both reported as `None`.
#[derive(Clone)]
pub struct ContentCache {
    store: Arc<dyn KvStore>,
}

impl ContentCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Cached body for `url`, if one is present and unexpired.
    pub async fn get(&self, url: &str) -> Result<Option<String>, Error> {
        let raw = self.store.get(&content_key(url)).await?;
        Ok(raw.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Store `content` for `url` for `ttl_seconds`, replacing any existing
    /// entry and restarting its expiry window.
    pub async fn put(&self, url: &str, content: &str, ttl_seconds: i64) -> Result<(), Error> {
        let ttl = validate_ttl(ttl_seconds)?;
        self.store.set_ex(&content_key(url), content.as_bytes(), ttl).await
    }
}
