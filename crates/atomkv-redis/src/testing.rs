//! In-memory connection doubles for lease and adapter tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use atomkv_cache::{CacheResult, Operation, Topology};
use redis::aio::ConnectionLike;
use redis::{Cmd, ErrorKind, Pipeline, RedisError, RedisFuture, RedisResult, Value};
use tokio::time::Instant;

use crate::commands::tests::args;
use crate::pool::{ConnectionSource, PoolStatus};

/// Decides the reply to one command; `None` leaves the reply pending forever.
pub(crate) type Responder = fn(&[String]) -> Option<RedisResult<Value>>;

/// A connection that answers from a [`Responder`] and records what it was sent.
#[derive(Clone)]
pub(crate) struct FakeConn {
    respond: Responder,
    sent: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ConnectionLike for FakeConn {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        let args = args(cmd);
        let reply = (self.respond)(&args);
        self.sent.lock().unwrap().push(args);
        match reply {
            Some(reply) => Box::pin(std::future::ready(reply)),
            None => Box::pin(std::future::pending()),
        }
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        _pipeline: &'a Pipeline,
        _offset: usize,
        _count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        Box::pin(std::future::ready(Err(RedisError::from((
            ErrorKind::ClientError,
            "pipelines are not supported by the fake connection",
        )))))
    }

    fn get_db(&self) -> i64 {
        0
    }
}

/// A source handing out clones of one [`FakeConn`].
pub(crate) struct FakeSource {
    topology: Topology,
    conn: FakeConn,
    discards: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn new(topology: Topology, respond: Responder) -> Self {
        Self {
            topology,
            conn: FakeConn {
                respond,
                sent: Arc::default(),
            },
            discards: AtomicUsize::new(0),
        }
    }

    /// Argument vectors of every command sent so far.
    pub(crate) fn sent(&self) -> Vec<Vec<String>> {
        self.conn.sent.lock().unwrap().clone()
    }

    pub(crate) fn discards(&self) -> usize {
        self.discards.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionSource for FakeSource {
    type Conn = FakeConn;

    fn topology(&self) -> Topology {
        self.topology
    }

    async fn acquire(&self, _operation: Operation, _deadline: Instant) -> CacheResult<FakeConn> {
        Ok(self.conn.clone())
    }

    fn discard(&self, _conn: FakeConn) {
        self.discards.fetch_add(1, Ordering::SeqCst);
    }

    fn status(&self) -> PoolStatus {
        PoolStatus {
            max_size: 1,
            size: 1,
            available: 0,
        }
    }

    fn close(&self) {}
}
