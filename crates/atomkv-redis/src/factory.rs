use std::sync::Arc;

use atomkv_cache::{CacheResult, DynCache};

use crate::cluster::ClusterCache;
use crate::config::CacheConfig;
use crate::sentinel::SentinelCache;
use crate::standalone::StandaloneCache;

/// Connects the adapter selected by `config` and returns it as a trait object.
///
/// # Errors
///
/// Fails with `CacheError::InvalidArgument` for an invalid config and with a
/// connection or timeout error if the liveness `PING` fails.
pub async fn create_cache(config: &CacheConfig) -> CacheResult<DynCache> {
    let cache: DynCache = match config {
        CacheConfig::Standalone(cfg) => Arc::new(StandaloneCache::connect(cfg).await?),
        CacheConfig::Cluster(cfg) => Arc::new(ClusterCache::connect(cfg).await?),
        CacheConfig::Sentinel(cfg) => Arc::new(SentinelCache::connect(cfg).await?),
    };
    Ok(cache)
}
