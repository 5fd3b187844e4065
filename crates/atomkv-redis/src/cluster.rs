//! Redis cluster adapter.
//!
//! Commands are routed per key slot by the cluster client. Multi-key calls
//! are only admitted when every key hashes to the same slot; `scan_keys` and
//! `zadd_to_fixed` are refused outright.

use atomkv_cache::{Cache, CacheError, CacheResult, Topology};
use deadpool_redis::Runtime;
use deadpool_redis::cluster::{Config, Pool};
use tracing::info;

use crate::adapter::RedisCache;
use crate::config::{ClusterConfig, connection_url, redact_url};
use crate::pool::PoolSource;

pub type ClusterCache = RedisCache<PoolSource<Pool>>;

impl RedisCache<PoolSource<Pool>> {
    /// Builds the pool and checks the cluster answers `PING`.
    pub async fn connect(config: &ClusterConfig) -> CacheResult<Self> {
        let cache = Self::build(config)?;
        cache.ping().await?;
        let nodes: Vec<String> = config
            .nodes
            .iter()
            .map(|node| redact_url(&connection_url(node)))
            .collect();
        info!(
            topology = %Topology::Cluster,
            ?nodes,
            max_active = config.pool.max_active,
            "cache connected"
        );
        Ok(cache)
    }

    pub(crate) fn build(config: &ClusterConfig) -> CacheResult<Self> {
        config.validate().map_err(CacheError::invalid_argument)?;
        let urls: Vec<String> = config
            .nodes
            .iter()
            .map(|node| connection_url(node))
            .collect();
        let mut cluster_config = Config::from_urls(urls);
        cluster_config.pool = Some(config.pool.deadpool_config());
        let pool = cluster_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::connection(format!("failed to create cluster pool: {e}")))?;
        Ok(RedisCache::new(
            PoolSource::new(pool, config.pool.clone(), Topology::Cluster),
            config.pool.call_timeout(),
            config.use_common_err,
        ))
    }
}
