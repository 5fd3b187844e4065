//! Sentinel-managed adapter.
//!
//! The primary is discovered through the sentinels on every new connection,
//! so a failover is picked up as soon as stale connections are recycled.

use atomkv_cache::{Cache, CacheError, CacheResult, Topology};
use deadpool_redis::Runtime;
use deadpool_redis::sentinel::{Manager, Pool, SentinelServerType};
use redis::RedisConnectionInfo;
use redis::sentinel::SentinelNodeConnectionInfo;
use tracing::info;

use crate::adapter::RedisCache;
use crate::config::{SentinelConfig, connection_url, redact_url};
use crate::pool::PoolSource;

pub type SentinelCache = RedisCache<PoolSource<Pool>>;

impl RedisCache<PoolSource<Pool>> {
    /// Builds the pool and checks the current primary answers `PING`.
    pub async fn connect(config: &SentinelConfig) -> CacheResult<Self> {
        let cache = Self::build(config)?;
        cache.ping().await?;
        let sentinels: Vec<String> = config
            .sentinels
            .iter()
            .map(|addr| redact_url(&connection_url(addr)))
            .collect();
        info!(
            topology = %Topology::Sentinel,
            master = %config.master_name,
            ?sentinels,
            db = config.db,
            "cache connected"
        );
        Ok(cache)
    }

    pub(crate) fn build(config: &SentinelConfig) -> CacheResult<Self> {
        config.validate().map_err(CacheError::invalid_argument)?;
        let urls: Vec<String> = config
            .sentinels
            .iter()
            .map(|addr| connection_url(addr))
            .collect();
        let primary = SentinelNodeConnectionInfo {
            tls_mode: None,
            redis_connection_info: Some(RedisConnectionInfo {
                db: config.db,
                username: config.username.clone(),
                password: config.password.clone(),
                ..RedisConnectionInfo::default()
            }),
        };
        let manager = Manager::new(
            urls,
            config.master_name.clone(),
            Some(primary),
            SentinelServerType::Master,
        )
        .map_err(|e| CacheError::invalid_argument(format!("invalid sentinel address: {e}")))?;
        let pool = Pool::builder(manager)
            .config(config.pool.deadpool_config())
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| CacheError::connection(format!("failed to create sentinel pool: {e}")))?;
        Ok(RedisCache::new(
            PoolSource::new(pool, config.pool.clone(), Topology::Sentinel),
            config.pool.call_timeout(),
            config.use_common_err,
        ))
    }
}
