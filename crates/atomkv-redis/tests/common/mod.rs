//! Shared fixtures for the Redis integration tests.
//!
//! One Redis container is started per test binary and reused by every test;
//! each test builds its own adapter and works on uuid-suffixed keys.

#![allow(dead_code)]

use atomkv_redis::{PoolSettings, StandaloneCache, StandaloneConfig};
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Address of the shared container, started on first use.
pub async fn redis_addr() -> String {
    let (_, addr) = SHARED_REDIS
        .get_or_init(|| async {
            // LPOP/RPOP with a count need Redis 6.2+
            let container = Redis::default()
                .with_tag("7.2-alpine")
                .start()
                .await
                .expect("start redis container");
            let port = container.get_host_port_ipv4(6379).await.expect("get port");
            (container, format!("127.0.0.1:{port}"))
        })
        .await;
    addr.clone()
}

pub async fn config(use_common_err: bool) -> StandaloneConfig {
    StandaloneConfig {
        server_addr: redis_addr().await,
        pool: PoolSettings {
            max_active: 16,
            ..PoolSettings::default()
        },
        use_common_err,
    }
}

pub async fn cache() -> StandaloneCache {
    init_tracing();
    StandaloneCache::connect(&config(true).await)
        .await
        .expect("connect standalone cache")
}

/// A key no other test touches.
pub fn key(prefix: &str) -> String {
    format!("{prefix}:{}", uuid::Uuid::new_v4())
}

/// Keys sharing one hash tag, so they also colocate on a cluster.
pub fn tagged_keys(n: usize) -> Vec<String> {
    let tag = uuid::Uuid::new_v4();
    (0..n).map(|i| format!("{{{tag}}}:{i}")).collect()
}
