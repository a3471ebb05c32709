//! In-process key-value store.
//!
//! Entries expire against `tokio::time::Instant`, so tests running on a
//! paused runtime can move past a TTL with `tokio::time::advance`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{KvStore, parse_counter};
use crate::Error;

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Map-backed store with lazy expiry.
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn incr(&self, key: &str) -> Result<u64, Error> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        let (current, expires_at) = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => (parse_counter(key, &entry.value)?, entry.expires_at),
            _ => (0, None),
        };

        let next = current
            .checked_add(1)
            .ok_or_else(|| Error::StoreUnavailable(format!("counter at {key} overflowed")))?;

        entries.insert(key.to_string(), Entry { value: next.to_string().into_bytes(), expires_at });
        Ok(next)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), Error> {
        if ttl_seconds == 0 {
            return Err(Error::InvalidTtl(0));
        }
        let expires_at = Instant::now().checked_add(Duration::from_secs(ttl_seconds));

        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), Entry { value: value.to_vec(), expires_at });
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, Error> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok((before - entries.len()) as u64)
    }
}
