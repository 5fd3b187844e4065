//! Capability traits of the cache layer.
//!
//! Each trait covers one data structure family. Backends implement all of
//! them and the umbrella [`Cache`] trait; callers depend on the narrowest
//! trait they need.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::CacheResult;
use crate::error::{BoundedError, CacheError};
use crate::types::{GeoLocation, GeoPoint, GeoRadiusQuery, ScoredMember, Topology};

/// Scalar key operations.
///
/// A zero `ttl` means "no expiry" in every method that takes one.
#[async_trait]
pub trait Cacher: Send + Sync {
    /// Returns the value stored at `key`.
    ///
    /// # Errors
    ///
    /// Returns the adapter's miss error (see [`Cacher::error_on_cache_miss`])
    /// if the key does not exist.
    async fn get(&self, key: &str) -> CacheResult<String>;

    /// Stores `value` at `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Stores `value` at `key` only if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::KeyExists` if the key is already present; the
    /// stored value and its TTL are left untouched.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Deletes `keys` and returns how many existed.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidArgument` if `keys` is empty.
    async fn del(&self, keys: &[&str]) -> CacheResult<u64>;

    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Sets the expiry of `key`. Returns `false` if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool>;

    /// Returns the remaining time to live of `key`, `None` if it has no expiry.
    ///
    /// # Errors
    ///
    /// Returns the adapter's miss error if the key does not exist.
    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>>;

    /// Adds `delta` to the counter at `key`; a missing key counts as 0.
    async fn incr_by(&self, key: &str, delta: i64) -> CacheResult<i64>;

    /// Returns every key matching the glob `pattern`.
    async fn scan_keys(&self, pattern: &str) -> CacheResult<Vec<String>>;

    /// The error this adapter reports when `key` is absent on read.
    fn error_on_cache_miss(&self, key: &str) -> CacheError;
}

/// Hash operations.
#[async_trait]
pub trait HashCacher: Send + Sync {
    /// Sets `field` of the hash at `key`, then applies `ttl` to the whole key.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::PartialWrite` if the field was written but the
    /// expiry could not be applied.
    async fn hset(&self, key: &str, field: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Sets `field` only if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::HashFieldExists` if the field is present; no TTL is
    /// applied in that case.
    async fn hset_nx(&self, key: &str, field: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    async fn hmset(&self, key: &str, fields: &[(&str, &str)], ttl: Duration) -> CacheResult<()>;

    /// Returns the value of `field`, or the hash miss error if it is absent.
    async fn hget(&self, key: &str, field: &str) -> CacheResult<String>;

    /// Returns the values of `fields` in order; absent fields are `None`.
    async fn hmget(&self, key: &str, fields: &[&str]) -> CacheResult<Vec<Option<String>>>;

    async fn hdel(&self, key: &str, fields: &[&str]) -> CacheResult<u64>;

    async fn hkeys(&self, key: &str) -> CacheResult<Vec<String>>;

    async fn hvals(&self, key: &str) -> CacheResult<Vec<String>>;

    async fn hgetall(&self, key: &str) -> CacheResult<HashMap<String, String>>;

    async fn hexists(&self, key: &str, field: &str) -> CacheResult<bool>;

    async fn hincr_by(&self, key: &str, field: &str, delta: i64) -> CacheResult<i64>;

    /// Returns the number of fields in the hash at `key`.
    async fn hlen(&self, key: &str) -> CacheResult<u64>;

    /// The error this adapter reports when `field` of `key` is absent.
    fn error_on_hash_cache_miss(&self, key: &str, field: &str) -> CacheError;
}

/// Set operations.
///
/// The multi-key forms need at least one source key; otherwise they fail
/// with `CacheError::InvalidArgument` without touching the backend.
#[async_trait]
pub trait SetCacher: Send + Sync {
    async fn sadd(&self, key: &str, members: &[&str]) -> CacheResult<u64>;

    async fn srem(&self, key: &str, members: &[&str]) -> CacheResult<u64>;

    async fn smembers(&self, key: &str) -> CacheResult<Vec<String>>;

    async fn scard(&self, key: &str) -> CacheResult<u64>;

    async fn sismember(&self, key: &str, member: &str) -> CacheResult<bool>;

    /// Members of the first set that are in none of the others.
    async fn sdiff(&self, keys: &[&str]) -> CacheResult<Vec<String>>;

    /// Like [`SetCacher::sdiff`], storing the result at `destination`.
    async fn sdiff_store(&self, destination: &str, keys: &[&str]) -> CacheResult<u64>;

    async fn sinter(&self, keys: &[&str]) -> CacheResult<Vec<String>>;

    async fn sinter_store(&self, destination: &str, keys: &[&str]) -> CacheResult<u64>;

    async fn sunion(&self, keys: &[&str]) -> CacheResult<Vec<String>>;

    async fn sunion_store(&self, destination: &str, keys: &[&str]) -> CacheResult<u64>;

    /// Moves `member` from `source` to `destination` atomically.
    ///
    /// Returns `false` if `member` was not in `source`.
    async fn smove(&self, member: &str, source: &str, destination: &str) -> CacheResult<bool>;

    /// Removes and returns up to `count` random members.
    async fn spop(&self, key: &str, count: usize) -> CacheResult<Vec<String>>;

    /// Returns up to `count` distinct random members without removing them.
    async fn srandmember(&self, key: &str, count: usize) -> CacheResult<Vec<String>>;
}

/// Sorted-set operations.
#[async_trait]
pub trait SortedSetCacher: Send + Sync {
    // ==================== Writes ====================

    async fn zadd(&self, key: &str, member: &str, score: f64) -> CacheResult<()>;

    /// Updates the score of an existing member; never adds one.
    async fn zadd_xx(&self, key: &str, member: &str, score: f64) -> CacheResult<()>;

    /// Adds a new member; never updates an existing score. Returns the number
    /// of members added.
    async fn zadd_nx(&self, key: &str, member: &str, score: f64) -> CacheResult<u64>;

    /// Increments the score of `member`, adding it if needed. Returns the new
    /// score.
    async fn zadd_incr(&self, key: &str, member: &str, delta: f64) -> CacheResult<f64>;

    /// Increments the score of an existing member only.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::KeyNotFound` if `member` is not in the set.
    async fn zadd_xx_incr_by(&self, key: &str, member: &str, delta: f64) -> CacheResult<f64>;

    async fn zrem(&self, key: &str, members: &[&str]) -> CacheResult<u64>;

    async fn zrem_range_by_score(&self, key: &str, min: f64, max: f64) -> CacheResult<u64>;

    // ==================== Reads ====================

    async fn zcard(&self, key: &str) -> CacheResult<u64>;

    /// Members ranked `start..=stop`, ascending. Negative ranks count from
    /// the end.
    async fn zrange(&self, key: &str, start: isize, stop: isize) -> CacheResult<Vec<String>>;

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> CacheResult<Vec<String>>;

    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> CacheResult<Vec<ScoredMember>>;

    async fn zrange_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
        offset: isize,
        count: isize,
    ) -> CacheResult<Vec<String>>;

    async fn zrevrange_by_score(
        &self,
        key: &str,
        max: f64,
        min: f64,
        offset: isize,
        count: isize,
    ) -> CacheResult<Vec<String>>;

    /// Ascending rank of `member`, or the miss error if it is absent.
    async fn zrank(&self, key: &str, member: &str) -> CacheResult<u64>;

    async fn zrevrank(&self, key: &str, member: &str) -> CacheResult<u64>;

    /// Score of `member`, or the miss error if it is absent.
    async fn zscore(&self, key: &str, member: &str) -> CacheResult<f64>;

    async fn zcount(&self, key: &str, min: f64, max: f64) -> CacheResult<u64>;
}

/// List operations.
///
/// Push operations need at least one value.
#[async_trait]
pub trait ListCacher: Send + Sync {
    async fn llen(&self, key: &str) -> CacheResult<u64>;

    /// Prepends `values` and returns the new length.
    async fn lpush(&self, key: &str, values: &[&str]) -> CacheResult<u64>;

    async fn rpush(&self, key: &str, values: &[&str]) -> CacheResult<u64>;

    /// Prepends `values` only if the list exists.
    ///
    /// # Errors
    ///
    /// Returns the miss error if the list does not exist; nothing is pushed.
    async fn lpushx(&self, key: &str, values: &[&str]) -> CacheResult<u64>;

    async fn rpushx(&self, key: &str, values: &[&str]) -> CacheResult<u64>;

    /// Removes and returns up to `count` elements from the head.
    ///
    /// # Errors
    ///
    /// Returns the miss error if the list does not exist.
    async fn lpop(&self, key: &str, count: usize) -> CacheResult<Vec<String>>;

    async fn rpop(&self, key: &str, count: usize) -> CacheResult<Vec<String>>;
}

/// Batch operations over several scalar keys.
#[async_trait]
pub trait MultiCacher: Send + Sync {
    /// Returns the values of `keys` in order; absent keys are `None`.
    async fn mget(&self, keys: &[&str]) -> CacheResult<Vec<Option<String>>>;

    async fn mset(&self, pairs: &[(&str, &str)]) -> CacheResult<()>;

    /// Writes every pair and expires every key in one transaction.
    async fn mset_ex(&self, pairs: &[(&str, &str)], ttl: Duration) -> CacheResult<()>;
}

/// Geospatial index operations.
#[async_trait]
pub trait GeoCacher: Send + Sync {
    /// Adds `points` and returns how many were new.
    async fn geo_add(&self, key: &str, points: &[GeoPoint]) -> CacheResult<u64>;

    /// Returns the geohash string of each member; unknown members are `None`.
    async fn geo_hash(&self, key: &str, members: &[&str]) -> CacheResult<Vec<Option<String>>>;

    async fn geo_radius(
        &self,
        key: &str,
        longitude: f64,
        latitude: f64,
        query: &GeoRadiusQuery,
    ) -> CacheResult<Vec<GeoLocation>>;
}

/// Compound operations executed atomically on the server.
///
/// Concurrent callers on the same key observe each call as a single step.
#[async_trait]
pub trait Scripter: Send + Sync {
    /// Adds `delta` to the counter at `key` only if the key exists.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::KeyNotFound` if the key is absent; nothing is
    /// created.
    async fn incr_xx(&self, key: &str, delta: i64) -> CacheResult<i64>;

    /// Subtracts `decrement` unless the result would drop below `lower_bound`.
    ///
    /// A missing key counts as 0. Returns the new value.
    ///
    /// # Errors
    ///
    /// Every failure carries the sentinel `lower_bound - 1`. Crossing the
    /// bound reports `CacheError::BoundExceeded` and leaves the counter as is.
    async fn decr_with_limit(
        &self,
        key: &str,
        decrement: i64,
        lower_bound: i64,
    ) -> Result<i64, BoundedError>;

    /// Writes `value` to `field` only if it currently holds `prev`.
    ///
    /// An absent field matches only an empty `prev`. On success a non-zero
    /// `ttl` is reapplied to the whole key and the new value is returned.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ValueMismatch` without mutating anything if the
    /// current value differs.
    async fn hget_set(
        &self,
        key: &str,
        field: &str,
        value: &str,
        prev: &str,
        ttl: Duration,
    ) -> CacheResult<String>;

    /// Inserts `member` into a sorted set capped at `max_size` members.
    ///
    /// Below capacity the member is always added. At capacity it is added
    /// only if `score` is strictly greater than the lowest kept score, and the
    /// set is trimmed back to `max_size`. Returns whether the member was
    /// written.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidArgument` if `max_size` is zero.
    async fn zadd_to_fixed(
        &self,
        key: &str,
        member: &str,
        score: f64,
        max_size: usize,
    ) -> CacheResult<bool>;
}

/// Every capability plus lifecycle.
#[async_trait]
pub trait Cache:
    Cacher
    + HashCacher
    + SetCacher
    + SortedSetCacher
    + ListCacher
    + MultiCacher
    + GeoCacher
    + Scripter
{
    /// The deployment shape this adapter talks to.
    fn topology(&self) -> Topology;

    /// Round-trips a `PING`.
    async fn ping(&self) -> CacheResult<()>;

    /// Closes the pool. Later calls fail with `CacheError::Connection`.
    async fn close(&self);
}
