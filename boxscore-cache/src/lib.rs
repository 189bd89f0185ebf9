//! boxscore Cache - TTL Storage and Request Coalescing
//!
//! Three pieces that together guarantee at most one in-flight upstream fetch
//! per cache key:
//!
//! - [`TtlStore`]: string-keyed payloads with per-entry expiry.
//! - [`Coalescer`]: a FIFO mutual-exclusion lock per key.
//! - [`ReadThrough`]: check, lock, double-check, fetch, store.
//!
//! # Example
//!
//! ```ignore
//! let store = TtlStore::new("short", Duration::from_secs(60));
//! let rt = ReadThrough::new(CacheConfig::new().with_fetch_timeout(Duration::from_secs(15)));
//!
//! let read = rt
//!     .get(&store, &ResourceKey::from("/game/6305900"), || async {
//!         fetch_game("6305900").await
//!     })
//!     .await?;
//!
//! if read.was_cache_hit() {
//!     tracing::debug!("served without touching upstream");
//! }
//! ```

pub mod coalescer;
pub mod read_through;
pub mod store;

pub use coalescer::{CoalesceGuard, Coalescer};
pub use read_through::{CacheConfig, CacheRead, ReadSource, ReadThrough};
pub use store::{CacheEntry, CacheStats, TtlStore};
