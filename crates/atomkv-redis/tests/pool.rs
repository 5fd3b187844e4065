//! Pool sizing, checkout and deadline behaviour against a real Redis.

mod common;

use std::time::Duration;

use atomkv_cache::prelude::*;
use atomkv_redis::{PoolSettings, StandaloneCache};
use common::{config, init_tracing, key};
use futures_util::future::join_all;

async fn cache_with(pool: PoolSettings) -> anyhow::Result<StandaloneCache> {
    init_tracing();
    let mut config = config(true).await;
    config.pool = pool;
    Ok(StandaloneCache::connect(&config).await?)
}

#[tokio::test]
async fn test_exhausted_pool_without_wait_fails_fast() -> anyhow::Result<()> {
    let cache = cache_with(PoolSettings {
        max_active: 1,
        max_idle: 1,
        wait: false,
        ..PoolSettings::default()
    })
    .await?;
    let k = key("busy");
    cache.set(&k, "v", Duration::ZERO).await?;

    let results = join_all((0..4).map(|_| cache.get(&k))).await;
    let busy = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.kind() == ErrorKind::Timeout))
        .count();
    assert!(busy >= 1, "expected checkouts to fail: {results:?}");
    assert!(results.iter().any(|r| r.as_deref() == Ok("v")));
    Ok(())
}

#[tokio::test]
async fn test_exhausted_pool_with_wait_queues_callers() -> anyhow::Result<()> {
    let cache = cache_with(PoolSettings {
        max_active: 2,
        max_idle: 2,
        ..PoolSettings::default()
    })
    .await?;
    let k = key("queue");

    let results = join_all((0..20).map(|_| cache.incr_by(&k, 1))).await;
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(cache.get(&k).await?, "20");

    let status = cache.pool_status();
    assert_eq!(status.max_size, 2);
    assert!(status.size <= 2);
    Ok(())
}

#[tokio::test]
async fn test_idle_connections_are_trimmed_to_max_idle() -> anyhow::Result<()> {
    let cache = cache_with(PoolSettings {
        max_active: 8,
        max_idle: 1,
        ..PoolSettings::default()
    })
    .await?;
    let k = key("idle");

    for result in join_all((0..8).map(|_| cache.incr_by(&k, 1))).await {
        result?;
    }
    cache.get(&k).await?;
    assert_eq!(cache.pool_status().size, 1);
    Ok(())
}

#[tokio::test]
async fn test_expired_deadline_fails_before_checkout() -> anyhow::Result<()> {
    let cache = cache_with(PoolSettings::default()).await?;
    let rushed = cache.with_deadline(Duration::ZERO);

    let err = rushed
        .set(&key("rushed"), "v", Duration::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    // the original handle keeps its deadline
    assert_eq!(cache.deadline(), Duration::from_secs(6));
    cache.ping().await?;
    Ok(())
}
