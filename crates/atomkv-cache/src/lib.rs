//! # atomkv-cache
//!
//! Cache abstraction layer over a Redis-protocol key-value store.
//!
//! This crate defines the capability traits, value types and error taxonomy
//! that every cache backend implements. It does not contain any backend;
//! see `atomkv-redis` for the standalone, cluster and sentinel adapters.
//!
//! ## Overview
//!
//! The contract is split by data structure:
//! - [`Cacher`] for scalar keys and counters
//! - [`HashCacher`], [`SetCacher`], [`SortedSetCacher`], [`ListCacher`]
//! - [`MultiCacher`] for batch reads and writes
//! - [`GeoCacher`] for geospatial indexes
//! - [`Scripter`] for the compound operations that run atomically on the server
//!
//! [`Cache`] combines all of them and adds lifecycle methods.
//!
//! ## Example
//!
//! ```ignore
//! use atomkv_cache::{Cache, CacheError, CacheResult};
//!
//! async fn reserve_seat(cache: &dyn Cache, event: &str) -> CacheResult<i64> {
//!     match cache.decr_with_limit(event, 1, 0).await {
//!         Ok(left) => Ok(left),
//!         Err(err) if err.error.is_cache_miss() => Ok(0),
//!         Err(err) => Err(err.into()),
//!     }
//! }
//! ```
//!
//! ## Misses
//!
//! A read that finds nothing always fails with an error of kind
//! [`ErrorKind::CacheMiss`]. Whether that is [`CacheError::CacheMiss`] or
//! [`CacheError::NilReply`] depends on the adapter's configuration; callers
//! should test [`CacheError::is_cache_miss`] rather than match a variant.

mod error;
mod traits;
mod types;

pub use error::{BoundedError, CacheError, ErrorKind};
pub use traits::{
    Cache, Cacher, GeoCacher, HashCacher, ListCacher, MultiCacher, Scripter, SetCacher,
    SortedSetCacher,
};
pub use types::{
    GeoLocation, GeoPoint, GeoRadiusQuery, GeoSort, GeoUnit, Operation, ScoredMember, Support,
    Topology,
};

/// Type alias for a cache result.
pub type CacheResult<T> = Result<T, CacheError>;

/// Type alias for a shared cache trait object.
pub type DynCache = std::sync::Arc<dyn Cache>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use atomkv_cache::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{BoundedError, CacheError, ErrorKind};
    pub use crate::traits::{
        Cache, Cacher, GeoCacher, HashCacher, ListCacher, MultiCacher, Scripter, SetCacher,
        SortedSetCacher,
    };
    pub use crate::types::{
        GeoLocation, GeoPoint, GeoRadiusQuery, GeoSort, GeoUnit, Operation, ScoredMember,
        Support, Topology,
    };
    pub use crate::{CacheResult, DynCache};
}
