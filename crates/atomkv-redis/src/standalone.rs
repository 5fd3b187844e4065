//! Single-node adapter.

use atomkv_cache::{Cache, CacheError, CacheResult, Topology};
use deadpool_redis::{Pool, Runtime};
use tracing::info;

use crate::adapter::RedisCache;
use crate::config::{StandaloneConfig, connection_url, redact_url};
use crate::pool::PoolSource;

/// Adapter for one Redis node behind a local connection pool.
pub type StandaloneCache = RedisCache<PoolSource<Pool>>;

impl RedisCache<PoolSource<Pool>> {
    /// Builds the pool and checks the node answers `PING`.
    pub async fn connect(config: &StandaloneConfig) -> CacheResult<Self> {
        let cache = Self::build(config)?;
        cache.ping().await?;
        info!(
            topology = %Topology::Standalone,
            addr = %redact_url(&connection_url(&config.server_addr)),
            max_active = config.pool.max_active,
            "cache connected"
        );
        Ok(cache)
    }

    /// Builds the pool without opening any connection.
    pub(crate) fn build(config: &StandaloneConfig) -> CacheResult<Self> {
        config.validate().map_err(CacheError::invalid_argument)?;
        let mut redis_config =
            deadpool_redis::Config::from_url(connection_url(&config.server_addr));
        redis_config.pool = Some(config.pool.deadpool_config());
        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::connection(format!("failed to create pool: {e}")))?;
        Ok(RedisCache::new(
            PoolSource::new(pool, config.pool.clone(), Topology::Standalone),
            config.pool.call_timeout(),
            config.use_common_err,
        ))
    }
}
