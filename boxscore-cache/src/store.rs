//! In-memory TTL store.
//!
//! Entries expire lazily: a read past an entry's deadline treats it as absent
//! and drops it. [`TtlStore::spawn_sweeper`] additionally purges expired
//! entries on an interval so keys that are never read again do not pile up.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use boxscore_core::Payload;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A stored value and its expiry clock.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    value: Payload,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn new(value: Payload, ttl: Duration) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
            ttl,
        }
    }

    pub fn value(&self) -> &Payload {
        &self.value
    }

    pub fn stored_at(&self) -> Instant {
        self.stored_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Visible while `now < stored_at + ttl`.
    pub fn is_live_at(&self, now: Instant) -> bool {
        now < self.stored_at + self.ttl
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of reads that found a live entry.
    pub hits: u64,
    /// Number of reads that found nothing or an expired entry.
    pub misses: u64,
    /// Entries currently stored, expired ones included until purged.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// String-keyed store of serialized payloads with per-entry expiry.
///
/// The store knows nothing about routes. Which store backs which resource is
/// decided by the caller; the store only carries a default TTL for callers
/// that do not pick one per entry.
#[derive(Debug)]
pub struct TtlStore {
    name: &'static str,
    default_ttl: Duration,
    entries: DashMap<String, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TtlStore {
    pub fn new(name: &'static str, default_ttl: Duration) -> Self {
        Self {
            name,
            default_ttl,
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Label used in logs and metrics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// True iff `key` holds an unexpired entry. Never touches the entry.
    pub fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .map(|entry| entry.is_live_at(now))
            .unwrap_or(false)
    }

    /// Return the stored value if unexpired.
    pub fn get(&self, key: &str) -> Option<Payload> {
        let now = Instant::now();
        let found = self.entries.get(key).map(|entry| {
            if entry.is_live_at(now) {
                Some(entry.value.clone())
            } else {
                None
            }
        });

        match found {
            Some(Some(value)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Some(None) => {
                // Read guard is gone by now; re-check under the shard lock in
                // case a fresh `set` landed in between.
                self.entries.remove_if(key, |_, entry| !entry.is_live_at(now));
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or fully replace the entry for `key`; it expires `ttl` from now.
    pub fn set(&self, key: &str, value: Payload, ttl: Duration) {
        self.entries.insert(key.to_string(), CacheEntry::new(value, ttl));
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live_at(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
        }
    }

    /// Purge expired entries every `every` until the task is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = store.purge_expired();
                let stats = store.stats();
                tracing::debug!(
                    store = store.name(),
                    purged,
                    entries = stats.entry_count,
                    hits = stats.hits,
                    misses = stats.misses,
                    hit_rate = stats.hit_rate(),
                    "Swept cache store"
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn payload(s: &str) -> Payload {
        Payload::from(s)
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_visible_until_ttl_elapses() {
        let store = TtlStore::new("short", Duration::from_secs(60));
        store.set("/scoreboard/baseball/d1", payload("{\"games\":[]}"), Duration::from_secs(60));

        tokio::time::advance(Duration::from_millis(59_999)).await;
        assert!(store.has("/scoreboard/baseball/d1"));
        assert_eq!(
            store.get("/scoreboard/baseball/d1").as_deref(),
            Some("{\"games\":[]}")
        );

        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(!store.has("/scoreboard/baseball/d1"));
        assert!(store.get("/scoreboard/baseball/d1").is_none());
    }

    #[tokio::test]
    async fn test_get_returns_stored_payload() {
        let store = TtlStore::new("test", Duration::from_secs(60));
        let value = payload(r#"{"games":[]}"#);
        store.set("/scoreboard/baseball/d1", value.clone(), Duration::from_secs(60));

        let found = store.get("/scoreboard/baseball/d1").unwrap();
        assert!(Arc::ptr_eq(&found, &value));
        assert_eq!(store.get("/scoreboard/baseball/d2"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_exclusive_at_deadline() {
        let store = TtlStore::new("short", Duration::from_secs(1));
        store.set("k", payload("v"), Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!store.has("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_has_does_not_extend_ttl() {
        let store = TtlStore::new("short", Duration::from_secs(10));
        store.set("k", payload("v"), Duration::from_secs(10));

        for _ in 0..9 {
            tokio::time::advance(Duration::from_secs(1)).await;
            assert!(store.has("k"));
        }
        tokio::time::advance(Duration::from_millis(1_001)).await;
        assert!(!store.has("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_replaces_value_and_resets_clock() {
        let store = TtlStore::new("long", Duration::from_secs(30));
        store.set("k", payload("old"), Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(20)).await;
        store.set("k", payload("new"), Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(store.get("k").as_deref(), Some("new"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_drops_expired_entry() {
        let store = TtlStore::new("short", Duration::from_secs(1));
        store.set("k", payload("v"), Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(store.len(), 1);
        assert!(store.get("k").is_none());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_keeps_live_entries() {
        let store = TtlStore::new("mixed", Duration::from_secs(60));
        store.set("short", payload("a"), Duration::from_secs(1));
        store.set("long", payload("b"), Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.purge_expired(), 1);
        assert!(store.has("long"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_in_background() {
        let store = Arc::new(TtlStore::new("short", Duration::from_secs(1)));
        store.set("k", payload("v"), Duration::from_secs(1));
        let handle = store.spawn_sweeper(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(store.is_empty());
        handle.abort();
    }

    #[tokio::test]
    async fn test_stats_count_hits_and_misses() {
        let store = TtlStore::new("long", Duration::from_secs(60));
        assert!(store.get("missing").is_none());
        store.set("k", payload("v"), Duration::from_secs(60));
        assert!(store.get("k").is_some());
        assert!(store.get("k").is_some());

        let stats = store.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 0.001);
        assert!((CacheStats::default().hit_rate() - 0.0).abs() < 0.001);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: an entry is visible strictly before its ttl and absent after.
        #[test]
        fn prop_visibility_follows_ttl(
            ttl_ms in 1u64..10_000,
            probe_ms in 0u64..20_000,
            key in "[a-z/]{1,24}",
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            rt.block_on(async {
                let store = TtlStore::new("prop", Duration::from_millis(ttl_ms));
                store.set(&key, Payload::from("v"), Duration::from_millis(ttl_ms));
                tokio::time::advance(Duration::from_millis(probe_ms)).await;
                prop_assert_eq!(store.has(&key), probe_ms < ttl_ms);
                prop_assert_eq!(store.get(&key).is_some(), probe_ms < ttl_ms);
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}
