//! Value types shared by the capability traits.
//!
//! This module defines the topology and operation enumerations used by the
//! support policy, plus the reply and argument types of the sorted-set and
//! geo capabilities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Deployment shape of the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// A single node reached through a local connection pool.
    Standalone,
    /// A sharded cluster; commands are routed per key slot.
    Cluster,
    /// A primary/replica set whose primary is discovered through sentinels.
    Sentinel,
}

impl Topology {
    /// Returns how this topology supports `operation`.
    ///
    /// The answer depends only on the operation, never on its arguments;
    /// [`Support::Colocated`] tells the adapter to inspect the keys.
    #[must_use]
    pub fn support(self, operation: Operation) -> Support {
        match self {
            Self::Standalone | Self::Sentinel => Support::Always,
            Self::Cluster => match operation {
                // SCAN only walks the node it lands on.
                Operation::ScanKeys => Support::Never,
                Operation::ZAddToFixed => Support::Never,
                op if op.is_multi_key() => Support::Colocated,
                _ => Support::Always,
            },
        }
    }

    /// Returns `true` if `operation` can run on this topology for at least
    /// some arguments.
    #[must_use]
    pub fn supports(self, operation: Operation) -> bool {
        self.support(operation) != Support::Never
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::Cluster => write!(f, "cluster"),
            Self::Sentinel => write!(f, "sentinel"),
        }
    }
}

/// How a topology supports an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    /// Always supported.
    Always,
    /// Supported only when every key of the call lives on the same node.
    Colocated,
    /// Never supported.
    Never,
}

macro_rules! operations {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Every operation exposed by the capability traits.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Operation {
            $($variant,)*
        }

        impl Operation {
            /// Stable snake_case name, used in errors and log fields.
            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

operations! {
    Ping => "ping",
    Get => "get",
    Set => "set",
    SetNx => "set_nx",
    Del => "del",
    Exists => "exists",
    Expire => "expire",
    Ttl => "ttl",
    IncrBy => "incr_by",
    ScanKeys => "scan_keys",
    HSet => "hset",
    HSetNx => "hset_nx",
    HMSet => "hmset",
    HGet => "hget",
    HMGet => "hmget",
    HDel => "hdel",
    HKeys => "hkeys",
    HVals => "hvals",
    HGetAll => "hgetall",
    HExists => "hexists",
    HIncrBy => "hincr_by",
    HLen => "hlen",
    SAdd => "sadd",
    SRem => "srem",
    SMembers => "smembers",
    SCard => "scard",
    SIsMember => "sismember",
    SDiff => "sdiff",
    SDiffStore => "sdiff_store",
    SInter => "sinter",
    SInterStore => "sinter_store",
    SUnion => "sunion",
    SUnionStore => "sunion_store",
    SMove => "smove",
    SPop => "spop",
    SRandMember => "srandmember",
    ZAdd => "zadd",
    ZAddXx => "zadd_xx",
    ZAddNx => "zadd_nx",
    ZAddIncr => "zadd_incr",
    ZAddXxIncrBy => "zadd_xx_incr_by",
    ZCard => "zcard",
    ZRange => "zrange",
    ZRevRange => "zrevrange",
    ZRevRangeWithScores => "zrevrange_with_scores",
    ZRangeByScore => "zrange_by_score",
    ZRevRangeByScore => "zrevrange_by_score",
    ZRank => "zrank",
    ZRevRank => "zrevrank",
    ZScore => "zscore",
    ZCount => "zcount",
    ZRem => "zrem",
    ZRemRangeByScore => "zrem_range_by_score",
    LLen => "llen",
    LPush => "lpush",
    LPushX => "lpushx",
    RPush => "rpush",
    RPushX => "rpushx",
    LPop => "lpop",
    RPop => "rpop",
    MGet => "mget",
    MSet => "mset",
    MSetEx => "mset_ex",
    GeoAdd => "geo_add",
    GeoHash => "geo_hash",
    GeoRadius => "geo_radius",
    IncrXx => "incr_xx",
    DecrWithLimit => "decr_with_limit",
    HGetSet => "hget_set",
    ZAddToFixed => "zadd_to_fixed",
}

impl Operation {
    /// Returns `true` for operations that may touch more than one key.
    #[must_use]
    pub fn is_multi_key(self) -> bool {
        matches!(
            self,
            Self::Del
                | Self::MGet
                | Self::MSet
                | Self::MSetEx
                | Self::SDiff
                | Self::SDiffStore
                | Self::SInter
                | Self::SInterStore
                | Self::SUnion
                | Self::SUnionStore
                | Self::SMove
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A sorted-set member together with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMember {
    pub member: String,
    pub score: f64,
}

impl ScoredMember {
    #[must_use]
    pub fn new(member: impl Into<String>, score: f64) -> Self {
        Self {
            member: member.into(),
            score,
        }
    }
}

/// A named point of a geospatial index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub member: String,
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    #[must_use]
    pub fn new(member: impl Into<String>, longitude: f64, latitude: f64) -> Self {
        Self {
            member: member.into(),
            longitude,
            latitude,
        }
    }
}

/// Distance unit of a radius query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoUnit {
    #[serde(rename = "m")]
    Meters,
    #[default]
    #[serde(rename = "km")]
    Kilometers,
    #[serde(rename = "ft")]
    Feet,
    #[serde(rename = "mi")]
    Miles,
}

impl GeoUnit {
    /// The unit token understood by the server.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meters => "m",
            Self::Kilometers => "km",
            Self::Feet => "ft",
            Self::Miles => "mi",
        }
    }
}

/// Ordering of radius query results by distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoSort {
    /// Server order.
    #[default]
    Unsorted,
    Asc,
    Desc,
}

/// Parameters of a radius query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoRadiusQuery {
    pub radius: f64,
    #[serde(default)]
    pub unit: GeoUnit,
    #[serde(default)]
    pub with_coord: bool,
    #[serde(default)]
    pub with_dist: bool,
    #[serde(default)]
    pub with_hash: bool,
    /// Maximum number of results; `0` means unlimited.
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub sort: GeoSort,
}

impl GeoRadiusQuery {
    /// Creates a query for `radius` kilometers with no extra reply fields.
    #[must_use]
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_unit(mut self, unit: GeoUnit) -> Self {
        self.unit = unit;
        self
    }

    #[must_use]
    pub fn with_coord(mut self) -> Self {
        self.with_coord = true;
        self
    }

    #[must_use]
    pub fn with_dist(mut self) -> Self {
        self.with_dist = true;
        self
    }

    #[must_use]
    pub fn with_hash(mut self) -> Self {
        self.with_hash = true;
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: GeoSort) -> Self {
        self.sort = sort;
        self
    }
}

/// One result of a radius query.
///
/// Fields that were not requested by the query stay at their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoLocation {
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
    pub distance: f64,
    pub geohash: i64,
}
