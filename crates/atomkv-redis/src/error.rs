//! Translation of backend failures into [`CacheError`].

use atomkv_cache::{CacheError, Operation, Topology};
use deadpool_redis::PoolError;
use redis::{ErrorKind as RedisErrorKind, RedisError};

/// Context of a failed call, used to build the translated error.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallContext {
    pub operation: Operation,
    pub topology: Topology,
}

impl CallContext {
    pub(crate) fn new(operation: Operation, topology: Topology) -> Self {
        Self {
            operation,
            topology,
        }
    }

    /// Maps a redis-rs error onto the cache error taxonomy.
    pub(crate) fn translate(&self, err: RedisError) -> CacheError {
        if err.is_timeout() {
            return CacheError::timeout(format!("{}: {err}", self.operation));
        }
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
            return CacheError::connection(err.to_string());
        }
        match err.kind() {
            RedisErrorKind::CrossSlot => {
                return CacheError::unsupported(self.operation, self.topology);
            }
            RedisErrorKind::ClusterDown
            | RedisErrorKind::MasterDown
            | RedisErrorKind::AuthenticationFailed
            | RedisErrorKind::MasterNameNotFoundBySentinel
            | RedisErrorKind::NoValidReplicasFoundBySentinel
            | RedisErrorKind::EmptySentinelList => {
                return CacheError::connection(err.to_string());
            }
            _ => {}
        }
        let message = err.to_string();
        if message.to_ascii_lowercase().contains("wrong number of arguments") {
            return CacheError::invalid_argument(message);
        }
        CacheError::backend(message)
    }

    /// Maps a pool checkout failure onto the cache error taxonomy.
    pub(crate) fn translate_pool(&self, err: PoolError) -> CacheError {
        match err {
            PoolError::Timeout(kind) => CacheError::timeout(format!(
                "{}: waiting for a pooled connection ({kind:?})",
                self.operation
            )),
            PoolError::Backend(err) => self.translate(err),
            PoolError::Closed => CacheError::connection("connection pool is closed"),
            other => CacheError::connection(other.to_string()),
        }
    }
}
