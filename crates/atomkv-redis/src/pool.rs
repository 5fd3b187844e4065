//! Connection sources and the per-call [`Lease`] guard.
//!
//! Adapters never hold a connection across calls. Each call checks one out
//! through a [`ConnectionSource`], wraps it in a [`Lease`] that enforces the
//! call deadline, and lets the lease drop to hand the connection back.

use std::cell::Cell;
use std::time::Duration;

use async_trait::async_trait;
use atomkv_cache::{CacheError, CacheResult, Operation, Topology};
use deadpool_redis::Timeouts;
use redis::aio::ConnectionLike;
use redis::{Cmd, FromRedisValue, Pipeline, RedisResult, ScriptInvocation};
use tokio::time::{Instant, error::Elapsed, timeout_at};
use tracing::{debug, warn};

use crate::config::PoolSettings;
use crate::error::CallContext;

/// Snapshot of a pool's occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Configured upper bound of open connections.
    pub max_size: usize,
    /// Connections currently open, idle or checked out.
    pub size: usize,
    /// Idle connections ready for checkout.
    pub available: usize,
}

/// Where a topology adapter gets its connections from.
#[async_trait]
pub trait ConnectionSource: Send + Sync + 'static {
    type Conn: ConnectionLike + Send + 'static;

    fn topology(&self) -> Topology;

    /// Checks out a connection, waiting no later than `deadline`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Timeout` if no connection became available in
    /// time and `CacheError::Connection` if none could be opened.
    async fn acquire(&self, operation: Operation, deadline: Instant) -> CacheResult<Self::Conn>;

    /// Detaches `conn` from the pool so it is closed instead of reused.
    fn discard(&self, conn: Self::Conn);

    fn status(&self) -> PoolStatus;

    /// Closes the pool. Later checkouts fail with `CacheError::Connection`.
    fn close(&self);
}

/// A deadpool-backed connection source.
pub struct PoolSource<P> {
    pool: P,
    settings: PoolSettings,
    topology: Topology,
}

impl<P> PoolSource<P> {
    pub(crate) fn new(pool: P, settings: PoolSettings, topology: Topology) -> Self {
        Self {
            pool,
            settings,
            topology,
        }
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Checkout timeouts for a call that must finish by `deadline`.
    ///
    /// `wait = false` turns the wait timeout to zero, which makes deadpool
    /// fail right away when every connection is busy.
    fn checkout_timeouts(&self, remaining: Duration) -> Timeouts {
        let dial = self.settings.dial_timeout().min(remaining);
        let wait = if self.settings.wait {
            remaining
        } else {
            Duration::ZERO
        };
        let mut timeouts = Timeouts::default();
        timeouts.wait = Some(wait);
        timeouts.create = Some(dial);
        timeouts.recycle = Some(dial);
        timeouts
    }
}

macro_rules! impl_pool_source {
    ($pool:ty, $conn:ty) => {
        impl PoolSource<$pool> {
            /// Drops stale idle connections and trims the idle set to
            /// `max_idle`.
            fn prune(&self) {
                let max_lifetime = self.settings.max_conn_lifetime();
                let idle_timeout = self.settings.idle_timeout();
                let max_idle = self.settings.max_idle;
                let kept = Cell::new(0usize);
                let result = self.pool.retain(|_, metrics| {
                    let stale = max_lifetime.is_some_and(|max| metrics.age() >= max)
                        || idle_timeout.is_some_and(|idle| metrics.last_used() >= idle);
                    if stale {
                        return false;
                    }
                    kept.set(kept.get() + 1);
                    kept.get() <= max_idle
                });
                if !result.removed.is_empty() {
                    warn!(
                        topology = %self.topology,
                        removed = result.removed.len(),
                        retained = result.retained,
                        "pruned idle connections"
                    );
                }
            }
        }

        #[async_trait]
        impl ConnectionSource for PoolSource<$pool> {
            type Conn = $conn;

            fn topology(&self) -> Topology {
                self.topology
            }

            async fn acquire(
                &self,
                operation: Operation,
                deadline: Instant,
            ) -> CacheResult<Self::Conn> {
                let ctx = CallContext::new(operation, self.topology);
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(CacheError::timeout(format!(
                        "{operation}: deadline expired before checkout"
                    )));
                }
                self.prune();
                self.pool
                    .timeout_get(&self.checkout_timeouts(remaining))
                    .await
                    .map_err(|err| ctx.translate_pool(err))
            }

            fn discard(&self, conn: Self::Conn) {
                drop(<$conn>::take(conn));
            }

            fn status(&self) -> PoolStatus {
                let status = self.pool.status();
                PoolStatus {
                    max_size: status.max_size,
                    size: status.size,
                    available: status.available,
                }
            }

            fn close(&self) {
                self.pool.close();
            }
        }
    };
}

impl_pool_source!(deadpool_redis::Pool, deadpool_redis::Connection);
impl_pool_source!(
    deadpool_redis::cluster::Pool,
    deadpool_redis::cluster::Connection
);
impl_pool_source!(
    deadpool_redis::sentinel::Pool,
    deadpool_redis::sentinel::Connection
);

/// One checked-out connection, bound to one logical operation.
///
/// Every round trip runs under the lease's deadline. When a step overruns,
/// the connection is discarded (its reply may still be in flight) and every
/// later step of the lease fails with `CacheError::Timeout`. Dropping the
/// lease returns a healthy connection to the pool.
pub struct Lease<'a, S: ConnectionSource> {
    source: &'a S,
    conn: Option<S::Conn>,
    deadline: Instant,
    ctx: CallContext,
}

impl<'a, S: ConnectionSource> Lease<'a, S> {
    pub async fn acquire(
        source: &'a S,
        operation: Operation,
        deadline: Instant,
    ) -> CacheResult<Self> {
        let conn = source.acquire(operation, deadline).await?;
        Ok(Self {
            source,
            conn: Some(conn),
            deadline,
            ctx: CallContext::new(operation, source.topology()),
        })
    }

    /// Sends one command and decodes its reply.
    pub async fn query<T: FromRedisValue>(&mut self, cmd: &Cmd) -> CacheResult<T> {
        let deadline = self.deadline;
        let conn = self.conn()?;
        let result = timeout_at(deadline, cmd.query_async(conn)).await;
        self.finish(result)
    }

    /// Sends a pipeline (or a MULTI/EXEC block) and decodes its reply.
    pub async fn pipeline<T: FromRedisValue>(&mut self, pipe: &Pipeline) -> CacheResult<T> {
        let deadline = self.deadline;
        let conn = self.conn()?;
        let result = timeout_at(deadline, pipe.query_async(conn)).await;
        self.finish(result)
    }

    /// Runs a script with `EVALSHA`, loading it first if the server lacks it.
    pub async fn invoke<T: FromRedisValue>(
        &mut self,
        invocation: &ScriptInvocation<'_>,
    ) -> CacheResult<T> {
        let deadline = self.deadline;
        let conn = self.conn()?;
        let result = timeout_at(deadline, invocation.invoke_async(conn)).await;
        self.finish(result)
    }

    fn conn(&mut self) -> CacheResult<&mut S::Conn> {
        match self.conn.as_mut() {
            Some(conn) => Ok(conn),
            None => Err(CacheError::timeout(format!(
                "{}: connection abandoned after an earlier timeout",
                self.ctx.operation
            ))),
        }
    }

    fn finish<T>(&mut self, result: Result<RedisResult<T>, Elapsed>) -> CacheResult<T> {
        match result {
            Ok(reply) => reply.map_err(|err| {
                debug!(op = %self.ctx.operation, error = %err, "command failed");
                self.ctx.translate(err)
            }),
            Err(_) => {
                self.abandon();
                Err(CacheError::timeout(format!(
                    "{}: deadline expired waiting for the reply",
                    self.ctx.operation
                )))
            }
        }
    }

    fn abandon(&mut self) {
        if let Some(conn) = self.conn.take() {
            warn!(
                op = %self.ctx.operation,
                topology = %self.ctx.topology,
                "discarding connection after deadline expired"
            );
            self.source.discard(conn);
        }
    }
}
