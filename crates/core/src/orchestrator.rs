//! Cache-aside fetch with access counting.
//!
//! Per request:
//!
//! 1. Count the access. A store failure here aborts the request.
//! 2. Serve from cache if an unexpired entry exists.
//! 3. Otherwise fetch. A failed fetch is returned as-is and nothing is cached.
//! 4. Cache the fetched body. A failure here is logged, not returned.
//!
//! Concurrent misses for the same URL each fetch and each write; the store's
//! last write wins. Dropping the returned future cancels the request, possibly
//! after the count was already recorded.

use std::sync::Arc;

use serde::Serialize;

use crate::Error;
use crate::content::{ContentCache, validate_ttl};
use crate::counter::AccessCounter;
use crate::fetch::Fetcher;
use crate::store::KvStore;

/// Whether a request was served from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lookup {
    Hit,
    Miss,
}

/// Result of a tracked fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracked {
    pub content: String,
    /// Access count after this request.
    pub count: u64,
    pub lookup: Lookup,
}

/// Composes an [`AccessCounter`], a [`ContentCache`] and a [`Fetcher`].
#[derive(Clone)]
pub struct FetchOrchestrator {
    counter: AccessCounter,
    cache: ContentCache,
    fetcher: Arc<dyn Fetcher>,
}

impl FetchOrchestrator {
    /// Build counter and cache over the same store.
    pub fn new(store: Arc<dyn KvStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::from_parts(AccessCounter::new(store.clone()), ContentCache::new(store), fetcher)
    }

    pub fn from_parts(counter: AccessCounter, cache: ContentCache, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { counter, cache, fetcher }
    }

    pub fn counter(&self) -> &AccessCounter {
        &self.counter
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Return the body of `url`, from cache when fresh, counting the access.
    pub async fn fetch_and_track(&self, url: &str, ttl_seconds: i64) -> Result<String, Error> {
        self.fetch_and_track_detailed(url, ttl_seconds)
            .await
            .map(|tracked| tracked.content)
    }

    /// Like [`fetch_and_track`](Self::fetch_and_track), with the count and
    /// cache outcome.
    pub async fn fetch_and_track_detailed(&self, url: &str, ttl_seconds: i64) -> Result<Tracked, Error> {
        self.fetch_and_track_with(url, ttl_seconds, self.fetcher.as_ref())
            .await
    }

    /// Run the request with a caller-supplied fetcher instead of the
    /// configured one.
    pub async fn fetch_and_track_with(
        &self, url: &str, ttl_seconds: i64, fetcher: &dyn Fetcher,
    ) -> Result<Tracked, Error> {
        validate_ttl(ttl_seconds)?;

        let count = self.counter.increment(url).await?;

        if let Some(content) = self.cache.get(url).await? {
            tracing::debug!(url, count, "cache hit");
            return Ok(Tracked { content, count, lookup: Lookup::Hit });
        }

        tracing::debug!(url, count, "cache miss, fetching");
        let bytes = fetcher.fetch(url).await.inspect_err(|e| {
            tracing::debug!(url, status = ?e.status, error = %e, "fetch failed");
        })?;
        let content = String::from_utf8_lossy(&bytes).into_owned();

        if let Err(e) = self.cache.put(url, &content, ttl_seconds).await {
            tracing::warn!(url, error = %e, "failed to cache fetched content");
        }

        Ok(Tracked { content, count, lookup: Lookup::Miss })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Replays scripted responses and records every URL it was asked for.
    #[derive(Default)]
    struct StubFetcher {
        responses: Mutex<VecDeque<Result<Bytes, FetchError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn with_responses(responses: Vec<Result<&'static str, FetchError>>) -> Arc<Self> {
            let responses = responses
                .into_iter()
                .map(|r| r.map(|body| Bytes::from_static(body.as_bytes())))
                .collect();
            Arc::new(Self { responses: Mutex::new(responses), calls: Mutex::default() })
        }

        async fn call_count(&self) -> usize {
            self.calls.lock().await.len()
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
            self.calls.lock().await.push(url.to_string());
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::transport("no scripted response")))
        }
    }

    /// Never completes.
    struct HangingFetcher;

    #[async_trait]
    impl Fetcher for HangingFetcher {
        async fn fetch(&self, _url: &str) -> Result<Bytes, FetchError> {
            std::future::pending().await
        }
    }

    /// Memory store whose primitives can be switched to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_incr: AtomicBool,
        fail_get: AtomicBool,
        fail_set: AtomicBool,
    }

    fn down(op: &str) -> Error {
        Error::StoreUnavailable(format!("{op}: connection refused"))
    }

    #[async_trait]
    impl KvStore for FlakyStore {
        async fn incr(&self, key: &str) -> Result<u64, Error> {
            if self.fail_incr.load(Ordering::SeqCst) {
                return Err(down("incr"));
            }
            self.inner.incr(key).await
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
            if self.fail_get.load(Ordering::SeqCst) {
                return Err(down("get"));
            }
            self.inner.get(key).await
        }

        async fn set_ex(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), Error> {
            if self.fail_set.load(Ordering::SeqCst) {
                return Err(down("set"));
            }
            self.inner.set_ex(key, value, ttl_seconds).await
        }

        async fn purge_expired(&self) -> Result<u64, Error> {
            self.inner.purge_expired().await
        }
    }

    fn setup(fetcher: Arc<StubFetcher>) -> (FetchOrchestrator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (FetchOrchestrator::new(store.clone(), fetcher), store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_call_within_ttl_is_cache_hit() {
        let fetcher = StubFetcher::with_responses(vec![Ok("HELLO")]);
        let (orch, _) = setup(fetcher.clone());

        let first = orch.fetch_and_track_detailed("http://x", 10).await.unwrap();
        assert_eq!(first, Tracked { content: "HELLO".into(), count: 1, lookup: Lookup::Miss });

        tokio::time::advance(Duration::from_secs(1)).await;

        let second = orch.fetch_and_track_detailed("http://x", 10).await.unwrap();
        assert_eq!(second, Tracked { content: "HELLO".into(), count: 2, lookup: Lookup::Hit });
        assert_eq!(fetcher.call_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_after_expiry() {
        let fetcher = StubFetcher::with_responses(vec![Ok("HELLO"), Ok("WORLD")]);
        let (orch, _) = setup(fetcher.clone());

        assert_eq!(orch.fetch_and_track("http://x", 10).await.unwrap(), "HELLO");

        tokio::time::advance(Duration::from_secs(11)).await;

        let second = orch.fetch_and_track_detailed("http://x", 10).await.unwrap();
        assert_eq!(second.content, "WORLD");
        assert_eq!(second.count, 2);
        assert_eq!(second.lookup, Lookup::Miss);
        assert_eq!(fetcher.call_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_resets_window() {
        let fetcher = StubFetcher::with_responses(vec![Ok("HELLO"), Ok("HELLO")]);
        let (orch, _) = setup(fetcher.clone());

        orch.fetch_and_track("http://x", 10).await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(orch.fetch_and_track("http://x", 10).await.unwrap(), "HELLO");

        tokio::time::advance(Duration::from_secs(9)).await;
        let third = orch.fetch_and_track_detailed("http://x", 10).await.unwrap();
        assert_eq!(third.lookup, Lookup::Hit);
        assert_eq!(third.content, "HELLO");
        assert_eq!(fetcher.call_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_n_calls_fetch_once() {
        let fetcher = StubFetcher::with_responses(vec![Ok("HELLO")]);
        let (orch, _) = setup(fetcher.clone());

        for _ in 0..25 {
            orch.fetch_and_track("http://x", 60).await.unwrap();
        }

        assert_eq!(orch.counter().count("http://x").await.unwrap(), 25);
        assert_eq!(fetcher.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_cached() {
        let fetcher = StubFetcher::with_responses(vec![Err(FetchError::status(503)), Ok("HELLO")]);
        let (orch, store) = setup(fetcher.clone());

        let err = orch.fetch_and_track("http://x", 10).await.unwrap_err();
        assert!(matches!(err, Error::Fetch(FetchError { status: Some(503), .. })));
        assert!(orch.cache().get("http://x").await.unwrap().is_none());
        assert!(store.get("content:http://x").await.unwrap().is_none());

        let retry = orch.fetch_and_track_detailed("http://x", 10).await.unwrap();
        assert_eq!(retry.content, "HELLO");
        assert_eq!(retry.count, 2);
        assert_eq!(retry.lookup, Lookup::Miss);
        assert_eq!(fetcher.call_count().await, 2);
    }

    #[tokio::test]
    async fn test_invalid_ttl_counts_nothing() {
        let fetcher = StubFetcher::with_responses(vec![Ok("HELLO")]);
        let (orch, _) = setup(fetcher.clone());

        assert!(matches!(orch.fetch_and_track("http://x", 0).await, Err(Error::InvalidTtl(0))));
        assert!(matches!(orch.fetch_and_track("http://x", -3).await, Err(Error::InvalidTtl(-3))));
        assert_eq!(orch.counter().count("http://x").await.unwrap(), 0);
        assert_eq!(fetcher.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_counter_failure_aborts_before_fetch() {
        let store = Arc::new(FlakyStore::default());
        store.fail_incr.store(true, Ordering::SeqCst);
        let fetcher = StubFetcher::with_responses(vec![Ok("HELLO")]);
        let orch = FetchOrchestrator::new(store.clone(), fetcher.clone());

        let err = orch.fetch_and_track("http://x", 10).await.unwrap_err();
        assert!(err.is_store_failure());
        assert_eq!(fetcher.call_count().await, 0);
        assert!(store.inner.is_empty().await);
    }

    #[tokio::test]
    async fn test_cache_read_failure_propagates() {
        let store = Arc::new(FlakyStore::default());
        store.fail_get.store(true, Ordering::SeqCst);
        let fetcher = StubFetcher::with_responses(vec![Ok("HELLO")]);
        let orch = FetchOrchestrator::new(store.clone(), fetcher.clone());

        let err = orch.fetch_and_track("http://x", 10).await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
        assert_eq!(fetcher.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_returns_content() {
        let store = Arc::new(FlakyStore::default());
        store.fail_set.store(true, Ordering::SeqCst);
        let fetcher = StubFetcher::with_responses(vec![Ok("HELLO"), Ok("HELLO")]);
        let orch = FetchOrchestrator::new(store.clone(), fetcher.clone());

        assert_eq!(orch.fetch_and_track("http://x", 10).await.unwrap(), "HELLO");

        store.fail_set.store(false, Ordering::SeqCst);
        let second = orch.fetch_and_track_detailed("http://x", 10).await.unwrap();
        assert_eq!(second.lookup, Lookup::Miss);
        assert_eq!(second.count, 2);
        assert_eq!(fetcher.call_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_fetch_leaves_count_only() {
        let store = Arc::new(MemoryStore::new());
        let orch = FetchOrchestrator::new(store.clone(), Arc::new(HangingFetcher));

        let result = tokio::time::timeout(Duration::from_secs(5), orch.fetch_and_track("http://x", 10)).await;
        assert!(result.is_err());

        assert_eq!(orch.counter().count("http://x").await.unwrap(), 1);
        assert!(orch.cache().get("http://x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_per_call_fetcher() {
        let configured = StubFetcher::with_responses(vec![]);
        let (orch, _) = setup(configured.clone());
        let override_fetcher = StubFetcher::with_responses(vec![Ok("OVERRIDE")]);

        let tracked = orch
            .fetch_and_track_with("http://x", 10, override_fetcher.as_ref())
            .await
            .unwrap();
        assert_eq!(tracked.content, "OVERRIDE");
        assert_eq!(configured.call_count().await, 0);
        assert_eq!(override_fetcher.call_count().await, 1);

        assert_eq!(orch.fetch_and_track("http://x", 10).await.unwrap(), "OVERRIDE");
        assert_eq!(configured.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_urls_tracked_independently() {
        let fetcher = StubFetcher::with_responses(vec![Ok("A"), Ok("B")]);
        let (orch, _) = setup(fetcher.clone());

        assert_eq!(orch.fetch_and_track("http://a", 10).await.unwrap(), "A");
        assert_eq!(orch.fetch_and_track("http://b", 10).await.unwrap(), "B");
        assert_eq!(orch.fetch_and_track("http://a", 10).await.unwrap(), "A");

        assert_eq!(orch.counter().count("http://a").await.unwrap(), 2);
        assert_eq!(orch.counter().count("http://b").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_count_exactly() {
        let responses = (0..16).map(|_| Ok("HELLO")).collect();
        let fetcher = StubFetcher::with_responses(responses);
        let (orch, _) = setup(fetcher);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let orch = orch.clone();
                tokio::spawn(async move { orch.fetch_and_track("http://x", 60).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "HELLO");
        }
        assert_eq!(orch.counter().count("http://x").await.unwrap(), 16);
    }
}
