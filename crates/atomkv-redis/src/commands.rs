//! Command builders.
//!
//! Each function returns the exact command an adapter sends for one
//! operation. Keeping them apart from the I/O makes the argument vectors
//! testable without a server.

use std::time::Duration;

use atomkv_cache::GeoPoint;
use redis::{Cmd, Pipeline, cmd};

/// Batch size hint for `SCAN`.
pub(crate) const SCAN_COUNT: usize = 100;

/// Converts a TTL to whole seconds for `EX`/`EXPIRE`.
///
/// Zero stays zero ("no expiry"); any other TTL is at least one second.
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    if ttl.is_zero() { 0 } else { ttl.as_secs().max(1) }
}

pub(crate) fn ping() -> Cmd {
    cmd("PING")
}

// ==================== Scalar ====================

pub(crate) fn get(key: &str) -> Cmd {
    let mut c = cmd("GET");
    c.arg(key);
    c
}

pub(crate) fn set(key: &str, value: &str, ttl: Duration) -> Cmd {
    let mut c = cmd("SET");
    c.arg(key).arg(value);
    with_ex(&mut c, ttl);
    c
}

pub(crate) fn set_nx(key: &str, value: &str, ttl: Duration) -> Cmd {
    let mut c = set(key, value, ttl);
    c.arg("NX");
    c
}

fn with_ex(c: &mut Cmd, ttl: Duration) {
    let secs = ttl_secs(ttl);
    if secs > 0 {
        c.arg("EX").arg(secs);
    }
}

pub(crate) fn del(keys: &[&str]) -> Cmd {
    let mut c = cmd("DEL");
    c.arg(keys);
    c
}

pub(crate) fn exists(key: &str) -> Cmd {
    let mut c = cmd("EXISTS");
    c.arg(key);
    c
}

/// `EXPIRE key secs`, the follow-up step of compound writes.
pub(crate) fn expire(key: &str, ttl: Duration) -> Cmd {
    let mut c = cmd("EXPIRE");
    c.arg(key).arg(ttl_secs(ttl));
    c
}

pub(crate) fn persist(key: &str) -> Cmd {
    let mut c = cmd("PERSIST");
    c.arg(key);
    c
}

pub(crate) fn pttl(key: &str) -> Cmd {
    let mut c = cmd("PTTL");
    c.arg(key);
    c
}

pub(crate) fn incr_by(key: &str, delta: i64) -> Cmd {
    let mut c = cmd("INCRBY");
    c.arg(key).arg(delta);
    c
}

pub(crate) fn scan(cursor: u64, pattern: &str) -> Cmd {
    let mut c = cmd("SCAN");
    c.arg(cursor)
        .arg("MATCH")
        .arg(pattern)
        .arg("COUNT")
        .arg(SCAN_COUNT);
    c
}

// ==================== Hash ====================

pub(crate) fn hset(key: &str, fields: &[(&str, &str)]) -> Cmd {
    let mut c = cmd("HSET");
    c.arg(key);
    for (field, value) in fields {
        c.arg(*field).arg(*value);
    }
    c
}

pub(crate) fn hset_nx(key: &str, field: &str, value: &str) -> Cmd {
    let mut c = cmd("HSETNX");
    c.arg(key).arg(field).arg(value);
    c
}

pub(crate) fn hget(key: &str, field: &str) -> Cmd {
    let mut c = cmd("HGET");
    c.arg(key).arg(field);
    c
}

/// Commands of the form `NAME key member...`.
pub(crate) fn key_with_members(name: &str, key: &str, members: &[&str]) -> Cmd {
    let mut c = cmd(name);
    c.arg(key).arg(members);
    c
}

/// Commands of the form `NAME key`.
pub(crate) fn key_only(name: &str, key: &str) -> Cmd {
    let mut c = cmd(name);
    c.arg(key);
    c
}

pub(crate) fn hexists(key: &str, field: &str) -> Cmd {
    let mut c = cmd("HEXISTS");
    c.arg(key).arg(field);
    c
}

pub(crate) fn hincr_by(key: &str, field: &str, delta: i64) -> Cmd {
    let mut c = cmd("HINCRBY");
    c.arg(key).arg(field).arg(delta);
    c
}

// ==================== Set ====================

pub(crate) fn sismember(key: &str, member: &str) -> Cmd {
    let mut c = cmd("SISMEMBER");
    c.arg(key).arg(member);
    c
}

/// `SDIFF`/`SINTER`/`SUNION` over `keys`.
pub(crate) fn set_algebra(name: &str, keys: &[&str]) -> Cmd {
    let mut c = cmd(name);
    c.arg(keys);
    c
}

/// `SDIFFSTORE`/`SINTERSTORE`/`SUNIONSTORE destination keys...`.
pub(crate) fn set_algebra_store(name: &str, destination: &str, keys: &[&str]) -> Cmd {
    let mut c = cmd(name);
    c.arg(destination).arg(keys);
    c
}

pub(crate) fn smove(member: &str, source: &str, destination: &str) -> Cmd {
    let mut c = cmd("SMOVE");
    c.arg(source).arg(destination).arg(member);
    c
}

/// `SPOP`/`SRANDMEMBER`/`LPOP`/`RPOP key count`.
pub(crate) fn with_count(name: &str, key: &str, count: usize) -> Cmd {
    let mut c = cmd(name);
    c.arg(key).arg(count);
    c
}

// ==================== Sorted set ====================

/// `ZADD key [flags...] score member`.
pub(crate) fn zadd(key: &str, flags: &[&str], member: &str, score: f64) -> Cmd {
    let mut c = cmd("ZADD");
    c.arg(key).arg(flags).arg(score).arg(member);
    c
}

pub(crate) fn zrange(name: &str, key: &str, start: isize, stop: isize) -> Cmd {
    let mut c = cmd(name);
    c.arg(key).arg(start).arg(stop);
    c
}

pub(crate) fn zrevrange_with_scores(key: &str, start: isize, stop: isize) -> Cmd {
    let mut c = zrange("ZREVRANGE", key, start, stop);
    c.arg("WITHSCORES");
    c
}

/// `ZRANGEBYSCORE key min max LIMIT offset count`, or the reverse form
/// with `max` first.
pub(crate) fn zrange_by_score(
    name: &str,
    key: &str,
    from: f64,
    to: f64,
    offset: isize,
    count: isize,
) -> Cmd {
    let mut c = cmd(name);
    c.arg(key)
        .arg(from)
        .arg(to)
        .arg("LIMIT")
        .arg(offset)
        .arg(count);
    c
}

/// `ZRANK`/`ZREVRANK`/`ZSCORE key member`.
pub(crate) fn zmember(name: &str, key: &str, member: &str) -> Cmd {
    let mut c = cmd(name);
    c.arg(key).arg(member);
    c
}

/// `ZCOUNT`/`ZREMRANGEBYSCORE key min max`.
pub(crate) fn zscore_range(name: &str, key: &str, min: f64, max: f64) -> Cmd {
    let mut c = cmd(name);
    c.arg(key).arg(min).arg(max);
    c
}

// ==================== Multi ====================

pub(crate) fn mget(keys: &[&str]) -> Cmd {
    let mut c = cmd("MGET");
    c.arg(keys);
    c
}

pub(crate) fn mset(pairs: &[(&str, &str)]) -> Cmd {
    let mut c = cmd("MSET");
    for (key, value) in pairs {
        c.arg(*key).arg(*value);
    }
    c
}

/// One `MULTI`/`EXEC` block that writes and expires every pair.
pub(crate) fn mset_ex(pairs: &[(&str, &str)], ttl: Duration) -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic();
    for (key, value) in pairs {
        pipe.add_command(set(key, value, ttl)).ignore();
    }
    pipe
}

/// `PERSIST key` followed by `EXISTS key`, used for a zero-TTL expire.
pub(crate) fn persist_then_exists(key: &str) -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.add_command(persist(key))
        .ignore()
        .add_command(exists(key));
    pipe
}

// ==================== Geo ====================

pub(crate) fn geo_add(key: &str, points: &[GeoPoint]) -> Cmd {
    let mut c = cmd("GEOADD");
    c.arg(key);
    for point in points {
        c.arg(point.longitude)
            .arg(point.latitude)
            .arg(point.member.as_str());
    }
    c
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use redis::Arg;

    /// Renders a command's arguments as strings.
    pub(crate) fn args(c: &Cmd) -> Vec<String> {
        c.args_iter()
            .map(|arg| match arg {
                Arg::Simple(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                Arg::Cursor => "<cursor>".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_ttl_secs() {
        assert_eq!(ttl_secs(Duration::ZERO), 0);
        assert_eq!(ttl_secs(Duration::from_millis(1)), 1);
        assert_eq!(ttl_secs(Duration::from_millis(1500)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(90)), 90);
    }

    #[test]
    fn test_set_variants() {
        assert_eq!(args(&set("k", "v", Duration::ZERO)), ["SET", "k", "v"]);
        assert_eq!(
            args(&set("k", "v", Duration::from_secs(30))),
            ["SET", "k", "v", "EX", "30"]
        );
        assert_eq!(
            args(&set_nx("k", "v", Duration::from_millis(200))),
            ["SET", "k", "v", "EX", "1", "NX"]
        );
    }

    #[test]
    fn test_multi_key_commands() {
        assert_eq!(args(&del(&["a", "b"])), ["DEL", "a", "b"]);
        assert_eq!(args(&mget(&["a", "b"])), ["MGET", "a", "b"]);
        assert_eq!(
            args(&mset(&[("a", "1"), ("b", "2")])),
            ["MSET", "a", "1", "b", "2"]
        );
        assert_eq!(
            args(&set_algebra_store("SUNIONSTORE", "dst", &["s1", "s2"])),
            ["SUNIONSTORE", "dst", "s1", "s2"]
        );
        assert_eq!(
            args(&smove("m", "src", "dst")),
            ["SMOVE", "src", "dst", "m"]
        );
    }

    #[test]
    fn test_hash_commands() {
        assert_eq!(
            args(&hset("h", &[("f1", "v1"), ("f2", "v2")])),
            ["HSET", "h", "f1", "v1", "f2", "v2"]
        );
        assert_eq!(
            args(&key_with_members("HMGET", "h", &["f1", "f2"])),
            ["HMGET", "h", "f1", "f2"]
        );
        assert_eq!(args(&hincr_by("h", "f", -3)), ["HINCRBY", "h", "f", "-3"]);
    }

    #[test]
    fn test_sorted_set_commands() {
        assert_eq!(
            args(&zadd("z", &["XX", "INCR"], "m", 2.5)),
            ["ZADD", "z", "XX", "INCR", "2.5", "m"]
        );
        assert_eq!(
            args(&zrevrange_with_scores("z", 0, -1)),
            ["ZREVRANGE", "z", "0", "-1", "WITHSCORES"]
        );
        assert_eq!(
            args(&zrange_by_score("ZREVRANGEBYSCORE", "z", 100.5, 0.5, 0, 10)),
            ["ZREVRANGEBYSCORE", "z", "100.5", "0.5", "LIMIT", "0", "10"]
        );
    }

    #[test]
    fn test_scan_and_pop() {
        assert_eq!(
            args(&scan(0, "user:*")),
            ["SCAN", "0", "MATCH", "user:*", "COUNT", "100"]
        );
        assert_eq!(args(&with_count("LPOP", "l", 2)), ["LPOP", "l", "2"]);
    }

    #[test]
    fn test_geo_add() {
        let points = [GeoPoint::new("Palermo", 13.361389, 38.115556)];
        assert_eq!(
            args(&geo_add("Sicily", &points)),
            ["GEOADD", "Sicily", "13.361389", "38.115556", "Palermo"]
        );
    }

    #[test]
    fn test_mset_ex_is_atomic() {
        let pipe = mset_ex(&[("a", "1"), ("b", "2")], Duration::from_secs(5));
        let packed = String::from_utf8(pipe.get_packed_pipeline()).unwrap();
        assert!(packed.starts_with("*1\r\n$5\r\nMULTI\r\n"));
        assert!(packed.contains("EXEC"));
        assert_eq!(packed.matches("$2\r\nEX\r\n").count(), 2);
    }
}
