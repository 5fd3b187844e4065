//! # atomkv-redis
//!
//! Redis backend for the `atomkv-cache` capability traits.
//!
//! One adapter, [`RedisCache`], implements every trait; it is instantiated
//! per topology over a pooled connection source:
//!
//! - [`StandaloneCache`]: a single node
//! - [`ClusterCache`]: a Redis cluster, with cross-slot calls refused
//! - [`SentinelCache`]: a sentinel-monitored primary
//!
//! The compound operations of [`Scripter`](atomkv_cache::Scripter) run as
//! Lua scripts, so concurrent callers never interleave inside one of them.
//!
//! ## Example
//!
//! ```ignore
//! use atomkv_cache::prelude::*;
//! use atomkv_redis::{create_cache, loader};
//!
//! let config = loader::load_config(None)?;
//! let cache = create_cache(&config).await?;
//! cache.set("greeting", "hello", Duration::from_secs(60)).await?;
//! ```

mod adapter;
pub mod cluster;
mod commands;
pub mod config;
mod error;
mod factory;
mod geo;
pub mod pool;
mod scripts;
pub mod sentinel;
pub mod slot;
pub mod standalone;
#[cfg(test)]
mod testing;

pub use adapter::RedisCache;
pub use cluster::ClusterCache;
pub use config::{
    CacheConfig, ClusterConfig, ConfigError, PoolSettings, SentinelConfig, StandaloneConfig,
    loader, redact_url,
};
pub use factory::create_cache;
pub use pool::{ConnectionSource, Lease, PoolSource, PoolStatus};
pub use sentinel::SentinelCache;
pub use standalone::StandaloneCache;
