//! Per-URL access counter.

use std::sync::Arc;

use crate::Error;
use crate::keys::count_key;
use crate::store::{KvStore, parse_counter};

/// Counts requests per URL in the `count:` namespace.
///
/// Counts never expire and are independent of whether the content was
/// served from cache.
#[derive(Clone)]
pub struct AccessCounter {
    store: Arc<dyn KvStore>,
}

impl AccessCounter {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Record one access to `url` and return the new total.
    pub async fn increment(&self, url: &str) -> Result<u64, Error> {
        self.store.incr(&count_key(url)).await
    }

    /// Current total for `url`; zero if it was never accessed.
    pub async fn count(&self, url: &str) -> Result<u64, Error> {
        let key = count_key(url);
        match self.store.get(&key).await? {
            Some(raw) => parse_counter(&key, &raw),
            None => Ok(0),
        }
    }
}
