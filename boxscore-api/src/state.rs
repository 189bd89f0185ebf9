//! Shared application state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use boxscore_cache::{CacheConfig, CacheRead, ReadThrough, TtlStore};
use boxscore_core::{BoxscoreResult, Payload, ResourceKey, Upstream};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::impl_from_ref;
use crate::resource::CacheTier;
use crate::telemetry::METRICS;
use crate::upstream::{HttpUpstream, UpstreamUrls};

/// The long and short cache stores.
#[derive(Debug, Clone)]
pub struct CacheTiers {
    pub long: Arc<TtlStore>,
    pub short: Arc<TtlStore>,
}

impl CacheTiers {
    pub fn new(long_ttl: Duration, short_ttl: Duration) -> Self {
        Self {
            long: Arc::new(TtlStore::new("long", long_ttl)),
            short: Arc::new(TtlStore::new("short", short_ttl)),
        }
    }

    pub fn store(&self, tier: CacheTier) -> &TtlStore {
        match tier {
            CacheTier::Long => &self.long,
            CacheTier::Short => &self.short,
        }
    }

    /// Start one purge task per store.
    pub fn spawn_sweepers(&self, every: Duration) -> Vec<JoinHandle<()>> {
        vec![
            self.long.spawn_sweeper(every),
            self.short.spawn_sweeper(every),
        ]
    }
}

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub caches: CacheTiers,
    pub read_through: Arc<ReadThrough>,
    pub upstream: Arc<dyn Upstream>,
    pub urls: Arc<UpstreamUrls>,
    /// Identifies this process in converted scoreboards.
    pub instance_id: Arc<str>,
}

impl AppState {
    pub fn new(config: ApiConfig, upstream: Arc<dyn Upstream>) -> Self {
        let caches = CacheTiers::new(config.long_ttl, config.short_ttl);
        let read_through = ReadThrough::new(
            CacheConfig::new().with_fetch_timeout(config.fetch_timeout),
        );
        let urls = UpstreamUrls::from_config(&config);

        Self {
            config: Arc::new(config),
            caches,
            read_through: Arc::new(read_through),
            upstream,
            urls: Arc::new(urls),
            instance_id: Uuid::now_v7().simple().to_string().into(),
        }
    }

    /// State talking to the real upstream hosts.
    pub fn with_http_upstream(config: ApiConfig) -> ApiResult<Self> {
        let upstream = HttpUpstream::new(config.fetch_timeout, config.metrics_enabled)?;
        Ok(Self::new(config, Arc::new(upstream)))
    }

    /// Read `key` from the given tier through the coalescing read-through.
    pub async fn read<F, Fut>(
        &self,
        tier: CacheTier,
        key: &ResourceKey,
        fetch: F,
    ) -> BoxscoreResult<CacheRead>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = BoxscoreResult<Payload>>,
    {
        let read = self
            .read_through
            .get(self.caches.store(tier), key, fetch)
            .await?;
        self.record_lookup(tier, &read);
        Ok(read)
    }

    pub(crate) fn record_lookup(&self, tier: CacheTier, read: &CacheRead) {
        if !self.config.metrics_enabled {
            return;
        }
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_cache_lookup(tier.as_str(), read.was_cache_hit());
        }
    }
}

impl_from_ref!(Arc<ApiConfig>, config);
impl_from_ref!(CacheTiers, caches);
