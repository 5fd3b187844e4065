//! Server-side scripts behind the [`Scripter`](atomkv_cache::Scripter)
//! operations.
//!
//! Every script takes its target key as the only `KEYS` entry, so it routes
//! to one node on a cluster, and reports "did nothing" with a nil reply
//! (Lua `false`) rather than an in-band magic value.

use std::sync::LazyLock;
use std::time::Duration;

use atomkv_cache::{BoundedError, CacheError, CacheResult};
use redis::{Script, ScriptInvocation};

use crate::commands::ttl_secs;

/// `ARGV`: delta. Replies with the new value, or nil if the key is absent.
static INCR_XX: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return redis.call('INCRBY', KEYS[1], ARGV[1])
end
return false
",
    )
});

/// `ARGV`: decrement, lower bound. Replies with the new value, or nil if
/// the result would drop below the bound.
static DECR_WITH_LIMIT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
local decrement = tonumber(ARGV[1])
if current - decrement < tonumber(ARGV[2]) then
    return false
end
return redis.call('DECRBY', KEYS[1], decrement)
",
    )
});

/// `ARGV`: field, value, expected previous value, ttl seconds. Replies with
/// the written value, or nil on mismatch. An absent field reads as `''`.
static HGET_SET: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
local current = redis.call('HGET', KEYS[1], ARGV[1]) or ''
if current ~= ARGV[3] then
    return false
end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
local ttl = tonumber(ARGV[4])
if ttl > 0 then
    redis.call('EXPIRE', KEYS[1], ttl)
end
return ARGV[2]
",
    )
});

/// `ARGV`: score, member, max size. Replies 1 if the member was written,
/// 0 otherwise. At capacity the candidate must beat the member at descending
/// rank `max - 1`; everything ranked past `max` is trimmed afterwards.
static ZADD_TO_FIXED: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
local max = tonumber(ARGV[3])
if redis.call('ZCARD', KEYS[1]) < max then
    redis.call('ZADD', KEYS[1], ARGV[1], ARGV[2])
    return 1
end
local tail = redis.call('ZREVRANGE', KEYS[1], max - 1, max - 1, 'WITHSCORES')
if tonumber(ARGV[1]) > tonumber(tail[2]) then
    redis.call('ZADD', KEYS[1], ARGV[1], ARGV[2])
    redis.call('ZREMRANGEBYRANK', KEYS[1], 0, -(max + 1))
    return 1
end
return 0
",
    )
});

pub(crate) fn incr_xx(key: &str, delta: i64) -> ScriptInvocation<'static> {
    let mut invocation = INCR_XX.prepare_invoke();
    invocation.key(key).arg(delta);
    invocation
}

pub(crate) fn decr_with_limit(
    key: &str,
    decrement: i64,
    lower_bound: i64,
) -> ScriptInvocation<'static> {
    let mut invocation = DECR_WITH_LIMIT.prepare_invoke();
    invocation.key(key).arg(decrement).arg(lower_bound);
    invocation
}

pub(crate) fn hget_set(
    key: &str,
    field: &str,
    value: &str,
    prev: &str,
    ttl: Duration,
) -> ScriptInvocation<'static> {
    let mut invocation = HGET_SET.prepare_invoke();
    invocation
        .key(key)
        .arg(field)
        .arg(value)
        .arg(prev)
        .arg(ttl_secs(ttl));
    invocation
}

pub(crate) fn zadd_to_fixed(
    key: &str,
    member: &str,
    score: f64,
    max_size: usize,
) -> ScriptInvocation<'static> {
    let mut invocation = ZADD_TO_FIXED.prepare_invoke();
    invocation.key(key).arg(score).arg(member).arg(max_size);
    invocation
}

pub(crate) fn incr_xx_outcome(key: &str, reply: Option<i64>) -> CacheResult<i64> {
    reply.ok_or_else(|| CacheError::key_not_found(key))
}

pub(crate) fn decr_with_limit_outcome(
    key: &str,
    lower_bound: i64,
    reply: CacheResult<Option<i64>>,
) -> Result<i64, BoundedError> {
    match reply {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(BoundedError::new(
            lower_bound,
            CacheError::bound_exceeded(key, lower_bound),
        )),
        Err(err) => Err(BoundedError::new(lower_bound, err)),
    }
}

pub(crate) fn hget_set_outcome(
    key: &str,
    field: &str,
    reply: Option<String>,
) -> CacheResult<String> {
    reply.ok_or_else(|| CacheError::value_mismatch(key, field))
}
