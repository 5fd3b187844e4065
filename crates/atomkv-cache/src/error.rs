//! Error taxonomy for the cache layer.
//!
//! Every failure surfaced by a capability trait is a [`CacheError`], and every
//! `CacheError` belongs to exactly one [`ErrorKind`]. Callers branch on the
//! kind; the variant carries the context for logs.

use std::fmt;

use crate::types::{Operation, Topology};

/// The closed set of failure kinds a cache call can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A key or field was absent on read.
    CacheMiss,
    /// An existence-gated write found no key.
    KeyNotFound,
    /// A set-if-absent write found the key already present.
    KeyExists,
    /// A field-level set-if-absent write found the field already present.
    HashFieldExists,
    /// A bounded decrement would cross its lower bound.
    BoundExceeded,
    /// A compare-and-swap precondition failed.
    ValueMismatch,
    /// The active topology cannot run the operation.
    UnsupportedOnTopology,
    /// The call itself was malformed.
    Argument,
    /// Transport-level failure.
    Connection,
    /// The call deadline expired.
    Timeout,
    /// Any other failure reported by the backend.
    Backend,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CacheMiss => write!(f, "cache_miss"),
            Self::KeyNotFound => write!(f, "key_not_found"),
            Self::KeyExists => write!(f, "key_exists"),
            Self::HashFieldExists => write!(f, "hash_field_exists"),
            Self::BoundExceeded => write!(f, "bound_exceeded"),
            Self::ValueMismatch => write!(f, "value_mismatch"),
            Self::UnsupportedOnTopology => write!(f, "unsupported_on_topology"),
            Self::Argument => write!(f, "argument_error"),
            Self::Connection => write!(f, "connection_error"),
            Self::Timeout => write!(f, "timeout"),
            Self::Backend => write!(f, "backend"),
        }
    }
}

/// Errors that can occur during cache operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CacheError {
    /// The key or field is absent (common miss error).
    #[error("redis status: nil ({key})")]
    CacheMiss {
        /// The key that was read.
        key: String,
    },

    /// The key or field is absent, reported as the backend's raw nil reply.
    #[error("nil returned ({key})")]
    NilReply {
        /// The key that was read.
        key: String,
    },

    /// The key does not exist.
    #[error("key is not exists: {key}")]
    KeyNotFound {
        /// The key that was expected to exist.
        key: String,
    },

    /// The key already exists.
    #[error("key already exist: {key}")]
    KeyExists {
        /// The key that was expected to be absent.
        key: String,
    },

    /// The hash field already exists.
    #[error("(key,field) combination already exists: {key}/{field}")]
    HashFieldExists {
        /// The hash key.
        key: String,
        /// The field that was expected to be absent.
        field: String,
    },

    /// The decrement would cross the lower bound.
    #[error("limit exceeded: {key} cannot go below {lower_bound}")]
    BoundExceeded {
        /// The counter key.
        key: String,
        /// The lower bound of the call.
        lower_bound: i64,
    },

    /// The field did not hold the expected previous value.
    #[error("value invalid: {key}/{field} does not hold the expected value")]
    ValueMismatch {
        /// The hash key.
        key: String,
        /// The compared field.
        field: String,
    },

    /// The operation cannot run on the active topology.
    #[error("{operation} is not supported on {topology}")]
    Unsupported {
        /// The refused operation.
        operation: Operation,
        /// The topology that refused it.
        topology: Topology,
    },

    /// The call was malformed.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// The backend could not be reached.
    #[error("connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// The call deadline expired.
    #[error("operation timed out: {message}")]
    Timeout {
        /// What was in flight when the deadline expired.
        message: String,
    },

    /// The backend rejected the command.
    #[error("backend error: {message}")]
    Backend {
        /// The backend's message.
        message: String,
    },

    /// The primary mutation succeeded but the follow-up expiry did not.
    #[error("{key} was written but its TTL was not applied: {source}")]
    PartialWrite {
        /// The key that was written.
        key: String,
        /// Why the TTL step failed.
        source: Box<CacheError>,
    },
}

impl CacheError {
    /// Creates a new `CacheMiss` error.
    #[must_use]
    pub fn cache_miss(key: impl Into<String>) -> Self {
        Self::CacheMiss { key: key.into() }
    }

    /// Creates a new `NilReply` error.
    #[must_use]
    pub fn nil_reply(key: impl Into<String>) -> Self {
        Self::NilReply { key: key.into() }
    }

    /// Creates a new `KeyNotFound` error.
    #[must_use]
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Creates a new `KeyExists` error.
    #[must_use]
    pub fn key_exists(key: impl Into<String>) -> Self {
        Self::KeyExists { key: key.into() }
    }

    /// Creates a new `HashFieldExists` error.
    #[must_use]
    pub fn hash_field_exists(key: impl Into<String>, field: impl Into<String>) -> Self {
        Self::HashFieldExists {
            key: key.into(),
            field: field.into(),
        }
    }

    /// Creates a new `BoundExceeded` error.
    #[must_use]
    pub fn bound_exceeded(key: impl Into<String>, lower_bound: i64) -> Self {
        Self::BoundExceeded {
            key: key.into(),
            lower_bound,
        }
    }

    /// Creates a new `ValueMismatch` error.
    #[must_use]
    pub fn value_mismatch(key: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValueMismatch {
            key: key.into(),
            field: field.into(),
        }
    }

    /// Creates a new `Unsupported` error.
    #[must_use]
    pub fn unsupported(operation: Operation, topology: Topology) -> Self {
        Self::Unsupported {
            operation,
            topology,
        }
    }

    /// Creates a new `InvalidArgument` error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Creates a new `PartialWrite` error.
    #[must_use]
    pub fn partial_write(key: impl Into<String>, source: CacheError) -> Self {
        Self::PartialWrite {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// Returns the kind of this error.
    ///
    /// A partial write reports the kind of the failed TTL step.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CacheMiss { .. } | Self::NilReply { .. } => ErrorKind::CacheMiss,
            Self::KeyNotFound { .. } => ErrorKind::KeyNotFound,
            Self::KeyExists { .. } => ErrorKind::KeyExists,
            Self::HashFieldExists { .. } => ErrorKind::HashFieldExists,
            Self::BoundExceeded { .. } => ErrorKind::BoundExceeded,
            Self::ValueMismatch { .. } => ErrorKind::ValueMismatch,
            Self::Unsupported { .. } => ErrorKind::UnsupportedOnTopology,
            Self::InvalidArgument { .. } => ErrorKind::Argument,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Backend { .. } => ErrorKind::Backend,
            Self::PartialWrite { source, .. } => source.kind(),
        }
    }

    /// Returns `true` if the key or field was absent on read.
    ///
    /// This is the only kind a read-through wrapper should treat as
    /// "recompute"; every other error is a hard failure.
    #[must_use]
    pub fn is_cache_miss(&self) -> bool {
        self.kind() == ErrorKind::CacheMiss
    }

    /// Returns `true` if the active topology refused the operation.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        self.kind() == ErrorKind::UnsupportedOnTopology
    }

    /// Returns `true` for transport failures and expired deadlines.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self.kind(), ErrorKind::Connection | ErrorKind::Timeout)
    }

    /// Returns `true` if the primary write landed without its TTL.
    #[must_use]
    pub fn is_partial_write(&self) -> bool {
        matches!(self, Self::PartialWrite { .. })
    }
}

/// Failure of a bounded decrement.
///
/// Callers that branch on the returned value still get the boundary value:
/// `sentinel` is always `lower_bound - 1`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{error} (sentinel {sentinel})")]
pub struct BoundedError {
    /// `lower_bound - 1`.
    pub sentinel: i64,
    /// What went wrong.
    pub error: CacheError,
}

impl BoundedError {
    #[must_use]
    pub fn new(lower_bound: i64, error: CacheError) -> Self {
        Self {
            sentinel: lower_bound.saturating_sub(1),
            error,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl From<BoundedError> for CacheError {
    fn from(err: BoundedError) -> Self {
        err.error
    }
}
