//! Read-through orchestration.
//!
//! Combines a [`TtlStore`] with the [`Coalescer`] so that concurrent misses on
//! one key cost a single upstream fetch:
//!
//! 1. Fast path: a live entry is returned without touching the coalescer.
//! 2. Otherwise the caller becomes the holder of the key (or queues for it)
//!    and checks the store again, since the previous holder may have just
//!    filled it.
//! 3. Only a holder that still sees a miss calls the fetcher. A successful
//!    result is stored before the key is released; a failure is returned to
//!    that caller alone and nothing is stored.
//!
//! [`ReadThrough::get_shared`] extends this with a second key: the request's
//! [`ResourceKey`] resolves to an [`UpstreamKey`], and requests of different
//! shapes that resolve to the same upstream document share one fetch.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use boxscore_core::{BoxscoreResult, FetchError, Payload, ResourceKey, UpstreamKey};

use crate::coalescer::Coalescer;
use crate::store::TtlStore;

/// Configuration for read-through lookups.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Upper bound on a single upstream fetch. `None` waits indefinitely.
    pub fetch_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Some(Duration::from_secs(15)),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Let fetches run for as long as they take.
    pub fn without_fetch_timeout(mut self) -> Self {
        self.fetch_timeout = None;
        self
    }
}

/// Where a read-through answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    /// Served from a live entry; no fetch ran for this request.
    Cache,
    /// This request's fetch produced the value.
    Upstream,
}

/// Result of a read-through lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRead {
    value: Payload,
    source: ReadSource,
}

impl CacheRead {
    pub fn from_cache(value: Payload) -> Self {
        Self {
            value,
            source: ReadSource::Cache,
        }
    }

    pub fn from_upstream(value: Payload) -> Self {
        Self {
            value,
            source: ReadSource::Upstream,
        }
    }

    pub fn value(&self) -> &Payload {
        &self.value
    }

    pub fn source(&self) -> ReadSource {
        self.source
    }

    pub fn was_cache_hit(&self) -> bool {
        self.source == ReadSource::Cache
    }

    pub fn was_cache_miss(&self) -> bool {
        self.source == ReadSource::Upstream
    }

    pub fn into_value(self) -> Payload {
        self.value
    }
}

/// Coalesced read-through over any [`TtlStore`].
///
/// One instance is shared by every store so that a key held while filling
/// the long-lived store also excludes fills of the same key elsewhere.
#[derive(Debug, Clone)]
pub struct ReadThrough {
    coalescer: Arc<Coalescer>,
    config: CacheConfig,
}

impl Default for ReadThrough {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl ReadThrough {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_coalescer(Arc::new(Coalescer::new()), config)
    }

    pub fn with_coalescer(coalescer: Arc<Coalescer>, config: CacheConfig) -> Self {
        Self { coalescer, config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn coalescer(&self) -> &Coalescer {
        &self.coalescer
    }

    /// Return the value stored under `key`, fetching and storing it on a miss.
    ///
    /// Entries are written with the store's default TTL.
    pub async fn get<F, Fut>(
        &self,
        store: &TtlStore,
        key: &ResourceKey,
        fetch: F,
    ) -> BoxscoreResult<CacheRead>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = BoxscoreResult<Payload>>,
    {
        if let Some(value) = store.get(key.as_str()) {
            return Ok(CacheRead::from_cache(value));
        }

        let _guard = self.coalescer.acquire(key.as_str()).await;

        if let Some(value) = store.get(key.as_str()) {
            tracing::debug!(store = store.name(), key = %key, "Filled while queued");
            return Ok(CacheRead::from_cache(value));
        }

        let value = self.fetch_within_limit(key.as_str(), fetch()).await?;
        store.set(key.as_str(), value.clone(), store.default_ttl());
        tracing::debug!(store = store.name(), key = %key, "Stored fetched value");
        Ok(CacheRead::from_upstream(value))
    }

    /// Like [`get`](Self::get), but the fetch is deduplicated by the upstream
    /// document it reads rather than by the request key alone.
    ///
    /// `resolve` runs only on a miss of `key`, while `key` is held. It names
    /// the upstream document and returns whatever `fetch` needs to load it.
    /// Keys are always taken in the order request key, then upstream key.
    /// When both name the same string only one is taken.
    ///
    /// An upstream hit is also written under `key`. A fetched value is
    /// written under both keys.
    pub async fn get_shared<R, RFut, T, F, FFut>(
        &self,
        store: &TtlStore,
        key: &ResourceKey,
        resolve: R,
        fetch: F,
    ) -> BoxscoreResult<CacheRead>
    where
        R: FnOnce() -> RFut,
        RFut: Future<Output = BoxscoreResult<(UpstreamKey, T)>>,
        F: FnOnce(T) -> FFut,
        FFut: Future<Output = BoxscoreResult<Payload>>,
    {
        if let Some(value) = store.get(key.as_str()) {
            return Ok(CacheRead::from_cache(value));
        }

        let _request_guard = self.coalescer.acquire(key.as_str()).await;

        if let Some(value) = store.get(key.as_str()) {
            return Ok(CacheRead::from_cache(value));
        }

        let (upstream, plan) = resolve().await?;
        let ttl = store.default_ttl();

        let _upstream_guard = if upstream.as_str() == key.as_str() {
            None
        } else {
            Some(self.coalescer.acquire(upstream.as_str()).await)
        };

        if let Some(value) = store.get(upstream.as_str()) {
            store.set(key.as_str(), value.clone(), ttl);
            tracing::debug!(
                store = store.name(),
                key = %key,
                upstream = %upstream,
                "Served from shared upstream entry"
            );
            return Ok(CacheRead::from_cache(value));
        }

        let value = self
            .fetch_within_limit(upstream.as_str(), fetch(plan))
            .await?;
        store.set(upstream.as_str(), value.clone(), ttl);
        store.set(key.as_str(), value.clone(), ttl);
        tracing::debug!(
            store = store.name(),
            key = %key,
            upstream = %upstream,
            "Stored fetched value under request and upstream keys"
        );
        Ok(CacheRead::from_upstream(value))
    }

    async fn fetch_within_limit<Fut>(&self, target: &str, fetch: Fut) -> BoxscoreResult<Payload>
    where
        Fut: Future<Output = BoxscoreResult<Payload>>,
    {
        let Some(after) = self.config.fetch_timeout else {
            return fetch.await;
        };

        match tokio::time::timeout(after, fetch).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(target_key = target, ?after, "Upstream fetch timed out");
                Err(FetchError::Timeout {
                    target: target.to_string(),
                    after,
                }
                .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxscore_core::{BoxscoreError, ExtractError};
    use boxscore_test_utils::assertions::{assert_extract_error, assert_fetch_status};
    use futures_util::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn short_store() -> TtlStore {
        TtlStore::new("short", Duration::from_secs(60))
    }

    fn upstream_down(url: &str) -> BoxscoreError {
        FetchError::Status {
            url: url.to_string(),
            status: 502,
        }
        .into()
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let store = short_store();
        let rt = ReadThrough::default();
        let key = ResourceKey::from("/game/6305900");
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let first = rt
            .get(&store, &key, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Payload::from("{\"id\":\"6305900\"}"))
            })
            .await
            .unwrap();
        assert!(first.was_cache_miss());

        let second = rt
            .get(&store, &key, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Payload::from("unused"))
            })
            .await
            .unwrap();
        assert!(second.was_cache_hit());
        assert_eq!(second.value().as_ref(), "{\"id\":\"6305900\"}");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_share_one_fetch() {
        let store = short_store();
        let rt = ReadThrough::default();
        let key = ResourceKey::from("/rankings/football/fbs/associated-press");
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let reads = join_all((0..10).map(|_| {
            rt.get(&store, &key, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(Payload::from("[]"))
            })
        }))
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let reads: Vec<CacheRead> = reads.into_iter().map(Result::unwrap).collect();
        assert_eq!(reads.iter().filter(|r| r.was_cache_miss()).count(), 1);
        assert!(reads.iter().all(|r| r.value().as_ref() == "[]"));
        assert_eq!(rt.coalescer().active_groups(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let store = short_store();
        let rt = ReadThrough::default();
        let key = ResourceKey::from("/schools-index");

        let result = rt
            .get(&store, &key, || async { Err(upstream_down("https://web/json/schools")) })
            .await;
        assert_fetch_status(&result, 502);
        assert!(!store.has(key.as_str()));
        assert!(!rt.coalescer().is_held(key.as_str()));

        let read = rt
            .get(&store, &key, || async { Ok(Payload::from("[]")) })
            .await
            .unwrap();
        assert!(read.was_cache_miss());
    }

    #[tokio::test]
    async fn test_extraction_failure_is_not_cached() {
        let store = short_store();
        let rt = ReadThrough::default();
        let key = ResourceKey::from("/history/football/fbs");

        let result = rt
            .get(&store, &key, || async {
                Err(ExtractError::MissingElement {
                    selector: "main table".to_string(),
                }
                .into())
            })
            .await;
        assert_extract_error(&result);
        assert!(store.is_empty());
        assert!(!rt.coalescer().is_held(key.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_lets_next_waiter_retry() {
        let store = short_store();
        let rt = ReadThrough::default();
        let key = ResourceKey::from("/standings/basketball-men/d1");
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let reads = join_all((0..3).map(|_| {
            rt.get(&store, &key, move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                if n == 0 {
                    Err(upstream_down("https://web/standings"))
                } else {
                    Ok(Payload::from("{\"data\":[]}"))
                }
            })
        }))
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_fetch_status(&reads[0], 502);
        assert!(reads[1].as_ref().unwrap().was_cache_miss());
        assert!(reads[2].as_ref().unwrap().was_cache_hit());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_key() {
        let store = short_store();
        let rt = ReadThrough::new(CacheConfig::new().with_fetch_timeout(Duration::from_secs(1)));
        let key = ResourceKey::from("/game/1");

        let err = rt
            .get(&store, &key, move || async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Payload::from("late"))
            })
            .await
            .unwrap_err();

        match err {
            BoxscoreError::Fetch(FetchError::Timeout { target, after }) => {
                assert_eq!(target, "/game/1");
                assert_eq!(after, Duration::from_secs(1));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(!rt.coalescer().is_held("/game/1"));
        assert!(!store.has("/game/1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_holder_releases_key() {
        let store = short_store();
        let rt = ReadThrough::new(CacheConfig::new().without_fetch_timeout());
        let key = ResourceKey::from("/game/2");

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            rt.get(&store, &key, move || async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Payload::from("never"))
            }),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(!rt.coalescer().is_held("/game/2"));

        let read = rt
            .get(&store, &key, || async { Ok(Payload::from("ok")) })
            .await
            .unwrap();
        assert!(read.was_cache_miss());
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_shapes_share_upstream_fetch() {
        let store = short_store();
        let rt = ReadThrough::default();
        let calls = AtomicUsize::new(0);
        let upstream = "https://data.example/scoreboard/baseball/d1/2024/06/24/scoreboard.json";

        let paths = [
            "/scoreboard/baseball/d1",
            "/scoreboard/baseball/d1/2024/06/24",
            "/scoreboard/baseball/d1/2024/06/24/all-conf",
            "/scoreboard/baseball/d1/2024/06/24/",
            "/scoreboard/baseball/d1/2024/06/24/all-conf/",
            "/scoreboard/baseball/d1/2024/06/24/all-conf?x",
        ];
        let keys: Vec<ResourceKey> = paths.iter().map(|p| ResourceKey::from(*p)).collect();

        let reads = join_all(keys.iter().map(|key| {
            rt.get_shared(
                &store,
                key,
                || async { Ok((UpstreamKey::from(upstream), upstream.to_string())) },
                |url: String| {
                    let calls = &calls;
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(Payload::from(format!("{{\"source\":\"{url}\"}}")))
                    }
                },
            )
        }))
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let reads: Vec<CacheRead> = reads.into_iter().map(Result::unwrap).collect();
        assert_eq!(reads.iter().filter(|r| r.was_cache_miss()).count(), 1);
        assert_eq!(reads.iter().filter(|r| r.was_cache_hit()).count(), 5);
        for path in paths {
            assert!(store.has(path), "{path} should be cached");
        }
        assert!(store.has(upstream));
        assert_eq!(rt.coalescer().active_groups(), 0);
    }

    #[tokio::test]
    async fn test_upstream_hit_fills_request_key() {
        let store = short_store();
        let rt = ReadThrough::default();
        store.set("https://u/doc.json", Payload::from("doc"), Duration::from_secs(60));

        let read = rt
            .get_shared(
                &store,
                &ResourceKey::from("/scoreboard/football/fbs"),
                || async { Ok((UpstreamKey::from("https://u/doc.json"), ())) },
                |()| async { Ok(Payload::from("unused")) },
            )
            .await
            .unwrap();

        assert!(read.was_cache_hit());
        assert_eq!(store.get("/scoreboard/football/fbs").as_deref(), Some("doc"));
    }

    #[tokio::test]
    async fn test_identical_keys_take_one_lock() {
        let store = short_store();
        let rt = ReadThrough::default();

        let read = tokio::time::timeout(
            Duration::from_secs(1),
            rt.get_shared(
                &store,
                &ResourceKey::from("same"),
                || async { Ok((UpstreamKey::from("same"), ())) },
                |()| async { Ok(Payload::from("v")) },
            ),
        )
        .await
        .expect("must not self-deadlock")
        .unwrap();

        assert!(read.was_cache_miss());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_failure_stores_nothing() {
        let store = short_store();
        let rt = ReadThrough::default();

        let err = rt
            .get_shared(
                &store,
                &ResourceKey::from("/scoreboard/baseball/d1"),
                || async { Err::<(UpstreamKey, ()), _>(upstream_down("https://data/today.json")) },
                |()| async { Ok(Payload::from("unused")) },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BoxscoreError::Fetch(_)));
        assert!(store.is_empty());
        assert_eq!(rt.coalescer().active_groups(), 0);
    }
}
