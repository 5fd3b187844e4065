//! The topology-agnostic adapter.
//!
//! [`RedisCache`] implements every capability trait once, over any
//! [`ConnectionSource`]. Topology differences are limited to the connection
//! source and the support policy of [`Topology::support`], which is checked
//! before a connection is ever requested.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use atomkv_cache::{
    BoundedError, Cache, CacheError, CacheResult, Cacher, GeoCacher, GeoLocation, GeoPoint,
    GeoRadiusQuery, HashCacher, ListCacher, MultiCacher, Operation, ScoredMember, Scripter,
    SetCacher, SortedSetCacher, Support, Topology,
};
use redis::{Cmd, FromRedisValue, ScriptInvocation, Value};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::commands;
use crate::geo;
use crate::pool::{ConnectionSource, Lease, PoolStatus};
use crate::scripts;
use crate::slot;

/// A cache adapter over one connection source.
///
/// Clones share the source. Every call runs under the adapter's deadline,
/// which covers connection checkout and every round trip of the call.
pub struct RedisCache<S: ConnectionSource> {
    source: Arc<S>,
    deadline: Duration,
    use_common_err: bool,
}

impl<S: ConnectionSource> Clone for RedisCache<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            deadline: self.deadline,
            use_common_err: self.use_common_err,
        }
    }
}

impl<S: ConnectionSource> RedisCache<S> {
    pub(crate) fn new(source: S, deadline: Duration, use_common_err: bool) -> Self {
        Self {
            source: Arc::new(source),
            deadline,
            use_common_err,
        }
    }

    /// Returns a handle on the same pool whose calls use `deadline`.
    #[must_use]
    pub fn with_deadline(&self, deadline: Duration) -> Self {
        Self {
            deadline,
            ..self.clone()
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.source.status()
    }

    #[cfg(test)]
    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    fn miss(&self, key: &str) -> CacheError {
        if self.use_common_err {
            CacheError::cache_miss(key)
        } else {
            CacheError::nil_reply(key)
        }
    }

    /// Applies the topology's support policy to a call touching `keys`.
    fn admit<'k>(
        &self,
        operation: Operation,
        keys: impl IntoIterator<Item = &'k str>,
    ) -> CacheResult<()> {
        let topology = self.source.topology();
        let admitted = match topology.support(operation) {
            Support::Always => true,
            Support::Colocated => slot::same_slot(keys),
            Support::Never => false,
        };
        if admitted {
            Ok(())
        } else {
            debug!(op = %operation, %topology, "operation refused by topology");
            Err(CacheError::unsupported(operation, topology))
        }
    }

    fn require(operation: Operation, present: bool, what: &str) -> CacheResult<()> {
        if present {
            Ok(())
        } else {
            Err(CacheError::invalid_argument(format!("{operation} requires at least one {what}")))
        }
    }

    async fn lease(&self, operation: Operation) -> CacheResult<Lease<'_, S>> {
        Lease::acquire(&*self.source, operation, Instant::now() + self.deadline).await
    }

    /// Admits, then sends one command on a fresh lease.
    async fn run<T: FromRedisValue>(
        &self,
        operation: Operation,
        keys: &[&str],
        cmd: Cmd,
    ) -> CacheResult<T> {
        self.admit(operation, keys.iter().copied())?;
        debug!(
            op = %operation,
            key = keys.first().copied().unwrap_or_default(),
            "cache command"
        );
        let mut lease = self.lease(operation).await?;
        lease.query(&cmd).await
    }

    /// Runs an admitted script on a fresh lease.
    async fn script<T: FromRedisValue>(
        &self,
        operation: Operation,
        key: &str,
        invocation: ScriptInvocation<'static>,
    ) -> CacheResult<T> {
        debug!(op = %operation, key, "running script");
        let mut lease = self.lease(operation).await?;
        lease.invoke(&invocation).await
    }

    /// Applies `ttl` after a successful primary write on the same lease.
    async fn expire_after_write(
        &self,
        lease: &mut Lease<'_, S>,
        operation: Operation,
        key: &str,
        ttl: Duration,
    ) -> CacheResult<()> {
        if ttl.is_zero() {
            return Ok(());
        }
        lease
            .query::<()>(&commands::expire(key, ttl))
            .await
            .map_err(|err| {
                warn!(op = %operation, key, error = %err, "value written but TTL not applied");
                CacheError::partial_write(key, err)
            })
    }

    async fn write_then_expire(
        &self,
        operation: Operation,
        key: &str,
        primary: Cmd,
        ttl: Duration,
    ) -> CacheResult<()> {
        self.admit(operation, [key])?;
        debug!(op = %operation, key, "cache command");
        let mut lease = self.lease(operation).await?;
        lease.query::<()>(&primary).await?;
        self.expire_after_write(&mut lease, operation, key, ttl)
            .await
    }
}

#[async_trait]
impl<S: ConnectionSource> Cacher for RedisCache<S> {
    async fn get(&self, key: &str) -> CacheResult<String> {
        let reply: Option<String> = self.run(Operation::Get, &[key], commands::get(key)).await?;
        reply.ok_or_else(|| self.miss(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.run(Operation::Set, &[key], commands::set(key, value, ttl))
            .await
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let reply: Option<String> = self
            .run(Operation::SetNx, &[key], commands::set_nx(key, value, ttl))
            .await?;
        match reply {
            Some(_) => Ok(()),
            None => Err(CacheError::key_exists(key)),
        }
    }

    async fn del(&self, keys: &[&str]) -> CacheResult<u64> {
        Self::require(Operation::Del, !keys.is_empty(), "key")?;
        self.run(Operation::Del, keys, commands::del(keys)).await
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.run(Operation::Exists, &[key], commands::exists(key))
            .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        if !ttl.is_zero() {
            return self
                .run(Operation::Expire, &[key], commands::expire(key, ttl))
                .await;
        }
        self.admit(Operation::Expire, [key])?;
        debug!(op = %Operation::Expire, key, "cache command");
        let mut lease = self.lease(Operation::Expire).await?;
        let (exists,): (bool,) = lease.pipeline(&commands::persist_then_exists(key)).await?;
        Ok(exists)
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        let millis: i64 = self.run(Operation::Ttl, &[key], commands::pttl(key)).await?;
        match millis {
            -2 => Err(self.miss(key)),
            ms => Ok(u64::try_from(ms).ok().map(Duration::from_millis)),
        }
    }

    async fn incr_by(&self, key: &str, delta: i64) -> CacheResult<i64> {
        self.run(Operation::IncrBy, &[key], commands::incr_by(key, delta))
            .await
    }

    async fn scan_keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        self.admit(Operation::ScanKeys, std::iter::empty())?;
        debug!(op = %Operation::ScanKeys, pattern, "cache command");
        let mut lease = self.lease(Operation::ScanKeys).await?;
        let mut cursor = 0u64;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) =
                lease.query(&commands::scan(cursor, pattern)).await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may return a key more than once
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }

    fn error_on_cache_miss(&self, key: &str) -> CacheError {
        self.miss(key)
    }
}

#[async_trait]
impl<S: ConnectionSource> HashCacher for RedisCache<S> {
    async fn hset(&self, key: &str, field: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.write_then_expire(
            Operation::HSet,
            key,
            commands::hset(key, &[(field, value)]),
            ttl,
        )
        .await
    }

    async fn hset_nx(&self, key: &str, field: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.admit(Operation::HSetNx, [key])?;
        debug!(op = %Operation::HSetNx, key, field, "cache command");
        let mut lease = self.lease(Operation::HSetNx).await?;
        let created: bool = lease.query(&commands::hset_nx(key, field, value)).await?;
        if !created {
            return Err(CacheError::hash_field_exists(key, field));
        }
        self.expire_after_write(&mut lease, Operation::HSetNx, key, ttl)
            .await
    }

    async fn hmset(&self, key: &str, fields: &[(&str, &str)], ttl: Duration) -> CacheResult<()> {
        Self::require(Operation::HMSet, !fields.is_empty(), "field")?;
        self.write_then_expire(Operation::HMSet, key, commands::hset(key, fields), ttl)
            .await
    }

    async fn hget(&self, key: &str, field: &str) -> CacheResult<String> {
        let reply: Option<String> = self
            .run(Operation::HGet, &[key], commands::hget(key, field))
            .await?;
        reply.ok_or_else(|| self.error_on_hash_cache_miss(key, field))
    }

    async fn hmget(&self, key: &str, fields: &[&str]) -> CacheResult<Vec<Option<String>>> {
        Self::require(Operation::HMGet, !fields.is_empty(), "field")?;
        self.run(
            Operation::HMGet,
            &[key],
            commands::key_with_members("HMGET", key, fields),
        )
        .await
    }

    async fn hdel(&self, key: &str, fields: &[&str]) -> CacheResult<u64> {
        Self::require(Operation::HDel, !fields.is_empty(), "field")?;
        self.run(
            Operation::HDel,
            &[key],
            commands::key_with_members("HDEL", key, fields),
        )
        .await
    }

    async fn hkeys(&self, key: &str) -> CacheResult<Vec<String>> {
        self.run(Operation::HKeys, &[key], commands::key_only("HKEYS", key))
            .await
    }

    async fn hvals(&self, key: &str) -> CacheResult<Vec<String>> {
        self.run(Operation::HVals, &[key], commands::key_only("HVALS", key))
            .await
    }

    async fn hgetall(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        self.run(
            Operation::HGetAll,
            &[key],
            commands::key_only("HGETALL", key),
        )
        .await
    }

    async fn hexists(&self, key: &str, field: &str) -> CacheResult<bool> {
        self.run(Operation::HExists, &[key], commands::hexists(key, field))
            .await
    }

    async fn hincr_by(&self, key: &str, field: &str, delta: i64) -> CacheResult<i64> {
        self.run(
            Operation::HIncrBy,
            &[key],
            commands::hincr_by(key, field, delta),
        )
        .await
    }

    async fn hlen(&self, key: &str) -> CacheResult<u64> {
        self.run(Operation::HLen, &[key], commands::key_only("HLEN", key))
            .await
    }

    fn error_on_hash_cache_miss(&self, key: &str, field: &str) -> CacheError {
        self.miss(&format!("{key}/{field}"))
    }
}

#[async_trait]
impl<S: ConnectionSource> SetCacher for RedisCache<S> {
    async fn sadd(&self, key: &str, members: &[&str]) -> CacheResult<u64> {
        Self::require(Operation::SAdd, !members.is_empty(), "member")?;
        self.run(
            Operation::SAdd,
            &[key],
            commands::key_with_members("SADD", key, members),
        )
        .await
    }

    async fn srem(&self, key: &str, members: &[&str]) -> CacheResult<u64> {
        Self::require(Operation::SRem, !members.is_empty(), "member")?;
        self.run(
            Operation::SRem,
            &[key],
            commands::key_with_members("SREM", key, members),
        )
        .await
    }

    async fn smembers(&self, key: &str) -> CacheResult<Vec<String>> {
        self.run(
            Operation::SMembers,
            &[key],
            commands::key_only("SMEMBERS", key),
        )
        .await
    }

    async fn scard(&self, key: &str) -> CacheResult<u64> {
        self.run(Operation::SCard, &[key], commands::key_only("SCARD", key))
            .await
    }

    async fn sismember(&self, key: &str, member: &str) -> CacheResult<bool> {
        self.run(
            Operation::SIsMember,
            &[key],
            commands::sismember(key, member),
        )
        .await
    }

    async fn sdiff(&self, keys: &[&str]) -> CacheResult<Vec<String>> {
        Self::require(Operation::SDiff, !keys.is_empty(), "key")?;
        self.run(Operation::SDiff, keys, commands::set_algebra("SDIFF", keys))
            .await
    }

    async fn sdiff_store(&self, destination: &str, keys: &[&str]) -> CacheResult<u64> {
        self.store(Operation::SDiffStore, "SDIFFSTORE", destination, keys)
            .await
    }

    async fn sinter(&self, keys: &[&str]) -> CacheResult<Vec<String>> {
        Self::require(Operation::SInter, !keys.is_empty(), "key")?;
        self.run(Operation::SInter, keys, commands::set_algebra("SINTER", keys))
            .await
    }

    async fn sinter_store(&self, destination: &str, keys: &[&str]) -> CacheResult<u64> {
        self.store(Operation::SInterStore, "SINTERSTORE", destination, keys)
            .await
    }

    async fn sunion(&self, keys: &[&str]) -> CacheResult<Vec<String>> {
        Self::require(Operation::SUnion, !keys.is_empty(), "key")?;
        self.run(Operation::SUnion, keys, commands::set_algebra("SUNION", keys))
            .await
    }

    async fn sunion_store(&self, destination: &str, keys: &[&str]) -> CacheResult<u64> {
        self.store(Operation::SUnionStore, "SUNIONSTORE", destination, keys)
            .await
    }

    async fn smove(&self, member: &str, source: &str, destination: &str) -> CacheResult<bool> {
        self.run(
            Operation::SMove,
            &[source, destination],
            commands::smove(member, source, destination),
        )
        .await
    }

    async fn spop(&self, key: &str, count: usize) -> CacheResult<Vec<String>> {
        self.run(
            Operation::SPop,
            &[key],
            commands::with_count("SPOP", key, count),
        )
        .await
    }

    async fn srandmember(&self, key: &str, count: usize) -> CacheResult<Vec<String>> {
        self.run(
            Operation::SRandMember,
            &[key],
            commands::with_count("SRANDMEMBER", key, count),
        )
        .await
    }
}

impl<S: ConnectionSource> RedisCache<S> {
    async fn store(
        &self,
        operation: Operation,
        name: &str,
        destination: &str,
        keys: &[&str],
    ) -> CacheResult<u64> {
        Self::require(operation, !keys.is_empty(), "source key")?;
        let mut touched = Vec::with_capacity(keys.len() + 1);
        touched.push(destination);
        touched.extend_from_slice(keys);
        self.run(
            operation,
            &touched,
            commands::set_algebra_store(name, destination, keys),
        )
        .await
    }
}

#[async_trait]
impl<S: ConnectionSource> SortedSetCacher for RedisCache<S> {
    async fn zadd(&self, key: &str, member: &str, score: f64) -> CacheResult<()> {
        self.run(
            Operation::ZAdd,
            &[key],
            commands::zadd(key, &[], member, score),
        )
        .await
    }

    async fn zadd_xx(&self, key: &str, member: &str, score: f64) -> CacheResult<()> {
        self.run(
            Operation::ZAddXx,
            &[key],
            commands::zadd(key, &["XX"], member, score),
        )
        .await
    }

    async fn zadd_nx(&self, key: &str, member: &str, score: f64) -> CacheResult<u64> {
        self.run(
            Operation::ZAddNx,
            &[key],
            commands::zadd(key, &["NX"], member, score),
        )
        .await
    }

    async fn zadd_incr(&self, key: &str, member: &str, delta: f64) -> CacheResult<f64> {
        self.run(
            Operation::ZAddIncr,
            &[key],
            commands::zadd(key, &["INCR"], member, delta),
        )
        .await
    }

    async fn zadd_xx_incr_by(&self, key: &str, member: &str, delta: f64) -> CacheResult<f64> {
        let reply: Option<f64> = self
            .run(
                Operation::ZAddXxIncrBy,
                &[key],
                commands::zadd(key, &["XX", "INCR"], member, delta),
            )
            .await?;
        reply.ok_or_else(|| CacheError::key_not_found(format!("{key}/{member}")))
    }

    async fn zrem(&self, key: &str, members: &[&str]) -> CacheResult<u64> {
        Self::require(Operation::ZRem, !members.is_empty(), "member")?;
        self.run(
            Operation::ZRem,
            &[key],
            commands::key_with_members("ZREM", key, members),
        )
        .await
    }

    async fn zrem_range_by_score(&self, key: &str, min: f64, max: f64) -> CacheResult<u64> {
        self.run(
            Operation::ZRemRangeByScore,
            &[key],
            commands::zscore_range("ZREMRANGEBYSCORE", key, min, max),
        )
        .await
    }

    async fn zcard(&self, key: &str) -> CacheResult<u64> {
        self.run(Operation::ZCard, &[key], commands::key_only("ZCARD", key))
            .await
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> CacheResult<Vec<String>> {
        self.run(
            Operation::ZRange,
            &[key],
            commands::zrange("ZRANGE", key, start, stop),
        )
        .await
    }

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> CacheResult<Vec<String>> {
        self.run(
            Operation::ZRevRange,
            &[key],
            commands::zrange("ZREVRANGE", key, start, stop),
        )
        .await
    }

    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> CacheResult<Vec<ScoredMember>> {
        let pairs: Vec<(String, f64)> = self
            .run(
                Operation::ZRevRangeWithScores,
                &[key],
                commands::zrevrange_with_scores(key, start, stop),
            )
            .await?;
        Ok(pairs
            .into_iter()
            .map(|(member, score)| ScoredMember::new(member, score))
            .collect())
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
        offset: isize,
        count: isize,
    ) -> CacheResult<Vec<String>> {
        self.run(
            Operation::ZRangeByScore,
            &[key],
            commands::zrange_by_score("ZRANGEBYSCORE", key, min, max, offset, count),
        )
        .await
    }

    async fn zrevrange_by_score(
        &self,
        key: &str,
        max: f64,
        min: f64,
        offset: isize,
        count: isize,
    ) -> CacheResult<Vec<String>> {
        self.run(
            Operation::ZRevRangeByScore,
            &[key],
            commands::zrange_by_score("ZREVRANGEBYSCORE", key, max, min, offset, count),
        )
        .await
    }

    async fn zrank(&self, key: &str, member: &str) -> CacheResult<u64> {
        let rank: Option<u64> = self
            .run(
                Operation::ZRank,
                &[key],
                commands::zmember("ZRANK", key, member),
            )
            .await?;
        rank.ok_or_else(|| self.miss(&format!("{key}/{member}")))
    }

    async fn zrevrank(&self, key: &str, member: &str) -> CacheResult<u64> {
        let rank: Option<u64> = self
            .run(
                Operation::ZRevRank,
                &[key],
                commands::zmember("ZREVRANK", key, member),
            )
            .await?;
        rank.ok_or_else(|| self.miss(&format!("{key}/{member}")))
    }

    async fn zscore(&self, key: &str, member: &str) -> CacheResult<f64> {
        let score: Option<f64> = self
            .run(
                Operation::ZScore,
                &[key],
                commands::zmember("ZSCORE", key, member),
            )
            .await?;
        score.ok_or_else(|| self.miss(&format!("{key}/{member}")))
    }

    async fn zcount(&self, key: &str, min: f64, max: f64) -> CacheResult<u64> {
        self.run(
            Operation::ZCount,
            &[key],
            commands::zscore_range("ZCOUNT", key, min, max),
        )
        .await
    }
}

#[async_trait]
impl<S: ConnectionSource> ListCacher for RedisCache<S> {
    async fn llen(&self, key: &str) -> CacheResult<u64> {
        self.run(Operation::LLen, &[key], commands::key_only("LLEN", key))
            .await
    }

    async fn lpush(&self, key: &str, values: &[&str]) -> CacheResult<u64> {
        Self::require(Operation::LPush, !values.is_empty(), "value")?;
        self.run(
            Operation::LPush,
            &[key],
            commands::key_with_members("LPUSH", key, values),
        )
        .await
    }

    async fn rpush(&self, key: &str, values: &[&str]) -> CacheResult<u64> {
        Self::require(Operation::RPush, !values.is_empty(), "value")?;
        self.run(
            Operation::RPush,
            &[key],
            commands::key_with_members("RPUSH", key, values),
        )
        .await
    }

    async fn lpushx(&self, key: &str, values: &[&str]) -> CacheResult<u64> {
        Self::require(Operation::LPushX, !values.is_empty(), "value")?;
        let len: u64 = self
            .run(
                Operation::LPushX,
                &[key],
                commands::key_with_members("LPUSHX", key, values),
            )
            .await?;
        if len == 0 {
            return Err(self.miss(key));
        }
        Ok(len)
    }

    async fn rpushx(&self, key: &str, values: &[&str]) -> CacheResult<u64> {
        Self::require(Operation::RPushX, !values.is_empty(), "value")?;
        let len: u64 = self
            .run(
                Operation::RPushX,
                &[key],
                commands::key_with_members("RPUSHX", key, values),
            )
            .await?;
        if len == 0 {
            return Err(self.miss(key));
        }
        Ok(len)
    }

    async fn lpop(&self, key: &str, count: usize) -> CacheResult<Vec<String>> {
        let popped: Option<Vec<String>> = self
            .run(
                Operation::LPop,
                &[key],
                commands::with_count("LPOP", key, count),
            )
            .await?;
        popped.ok_or_else(|| self.miss(key))
    }

    async fn rpop(&self, key: &str, count: usize) -> CacheResult<Vec<String>> {
        let popped: Option<Vec<String>> = self
            .run(
                Operation::RPop,
                &[key],
                commands::with_count("RPOP", key, count),
            )
            .await?;
        popped.ok_or_else(|| self.miss(key))
    }
}

#[async_trait]
impl<S: ConnectionSource> MultiCacher for RedisCache<S> {
    async fn mget(&self, keys: &[&str]) -> CacheResult<Vec<Option<String>>> {
        Self::require(Operation::MGet, !keys.is_empty(), "key")?;
        self.run(Operation::MGet, keys, commands::mget(keys)).await
    }

    async fn mset(&self, pairs: &[(&str, &str)]) -> CacheResult<()> {
        Self::require(Operation::MSet, !pairs.is_empty(), "key")?;
        let keys: Vec<&str> = pairs.iter().map(|(key, _)| *key).collect();
        self.run(Operation::MSet, &keys, commands::mset(pairs)).await
    }

    async fn mset_ex(&self, pairs: &[(&str, &str)], ttl: Duration) -> CacheResult<()> {
        Self::require(Operation::MSetEx, !pairs.is_empty(), "key")?;
        self.admit(Operation::MSetEx, pairs.iter().map(|(key, _)| *key))?;
        debug!(op = %Operation::MSetEx, keys = pairs.len(), "cache command");
        let mut lease = self.lease(Operation::MSetEx).await?;
        lease.pipeline(&commands::mset_ex(pairs, ttl)).await
    }
}

#[async_trait]
impl<S: ConnectionSource> GeoCacher for RedisCache<S> {
    async fn geo_add(&self, key: &str, points: &[GeoPoint]) -> CacheResult<u64> {
        Self::require(Operation::GeoAdd, !points.is_empty(), "point")?;
        self.run(Operation::GeoAdd, &[key], commands::geo_add(key, points))
            .await
    }

    async fn geo_hash(&self, key: &str, members: &[&str]) -> CacheResult<Vec<Option<String>>> {
        Self::require(Operation::GeoHash, !members.is_empty(), "member")?;
        self.run(
            Operation::GeoHash,
            &[key],
            commands::key_with_members("GEOHASH", key, members),
        )
        .await
    }

    async fn geo_radius(
        &self,
        key: &str,
        longitude: f64,
        latitude: f64,
        query: &GeoRadiusQuery,
    ) -> CacheResult<Vec<GeoLocation>> {
        let reply: Value = self
            .run(
                Operation::GeoRadius,
                &[key],
                geo::georadius(key, longitude, latitude, query),
            )
            .await?;
        geo::parse_radius_reply(&reply, query).map_err(|err| CacheError::backend(err.to_string()))
    }
}

#[async_trait]
impl<S: ConnectionSource> Scripter for RedisCache<S> {
    async fn incr_xx(&self, key: &str, delta: i64) -> CacheResult<i64> {
        self.admit(Operation::IncrXx, [key])?;
        let reply: Option<i64> = self
            .script(Operation::IncrXx, key, scripts::incr_xx(key, delta))
            .await?;
        debug!(op = %Operation::IncrXx, key, applied = reply.is_some(), "script finished");
        scripts::incr_xx_outcome(key, reply)
    }

    async fn decr_with_limit(
        &self,
        key: &str,
        decrement: i64,
        lower_bound: i64,
    ) -> Result<i64, BoundedError> {
        let reply: CacheResult<Option<i64>> = match self.admit(Operation::DecrWithLimit, [key]) {
            Ok(()) => {
                self.script(
                    Operation::DecrWithLimit,
                    key,
                    scripts::decr_with_limit(key, decrement, lower_bound),
                )
                .await
            }
            Err(err) => Err(err),
        };
        debug!(
            op = %Operation::DecrWithLimit,
            key,
            lower_bound,
            applied = matches!(reply, Ok(Some(_))),
            "script finished"
        );
        scripts::decr_with_limit_outcome(key, lower_bound, reply)
    }

    async fn hget_set(
        &self,
        key: &str,
        field: &str,
        value: &str,
        prev: &str,
        ttl: Duration,
    ) -> CacheResult<String> {
        self.admit(Operation::HGetSet, [key])?;
        let reply: Option<String> = self
            .script(
                Operation::HGetSet,
                key,
                scripts::hget_set(key, field, value, prev, ttl),
            )
            .await?;
        debug!(op = %Operation::HGetSet, key, field, applied = reply.is_some(), "script finished");
        scripts::hget_set_outcome(key, field, reply)
    }

    async fn zadd_to_fixed(
        &self,
        key: &str,
        member: &str,
        score: f64,
        max_size: usize,
    ) -> CacheResult<bool> {
        self.admit(Operation::ZAddToFixed, [key])?;
        if max_size == 0 {
            return Err(CacheError::invalid_argument("zadd_to_fixed requires max_size > 0"));
        }
        let written: bool = self
            .script(
                Operation::ZAddToFixed,
                key,
                scripts::zadd_to_fixed(key, member, score, max_size),
            )
            .await?;
        debug!(op = %Operation::ZAddToFixed, key, member, written, "script finished");
        Ok(written)
    }
}

#[async_trait]
impl<S: ConnectionSource> Cache for RedisCache<S> {
    fn topology(&self) -> Topology {
        self.source.topology()
    }

    async fn ping(&self) -> CacheResult<()> {
        self.run(Operation::Ping, &[], commands::ping()).await
    }

    async fn close(&self) {
        self.source.close();
        info!(topology = %self.source.topology(), "cache closed");
    }
}
