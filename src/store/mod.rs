//! Record Store
//!
//! The storage seam of the service. Handlers only see [`RecordStore`]; the
//! process picks one implementation at startup.
//!
//! ```text
//!                 ┌──────────────────────┐
//!                 │   RecordStore trait  │
//!                 └──────────┬───────────┘
//!              ┌─────────────┴─────────────┐
//!              ▼                           ▼
//!     ┌─────────────────┐         ┌─────────────────┐
//!     │   RedisStore    │         │   MemoryStore   │
//!     │  Pool ─> RESP   │         │  sharded RwLock │
//!     └─────────────────┘         └─────────────────┘
//! ```
//!
//! Both implementations make the existence check and the write of a
//! conditional set a single atomic step, so callers never lock.

pub mod connection;
pub mod memory;
pub mod pool;
pub mod redis;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{Connection, Endpoint};
pub use memory::MemoryStore;
pub use pool::{Pool, PoolStats, PooledConnection};
pub use redis::RedisStore;

use crate::protocol::ParseError;
use std::future::Future;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures talking to the backend.
///
/// A missing key is never an error: it shows up as `None`, `false` or `0`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ParseError),

    #[error("timed out connecting to {0}")]
    ConnectTimeout(String),

    #[error("connection closed by backend")]
    ConnectionClosed,

    /// The backend answered with an error reply (`-ERR ...`).
    #[error("backend error: {0}")]
    Backend(String),

    #[error("unexpected {reply} reply to {command}")]
    UnexpectedReply {
        command: &'static str,
        reply: &'static str,
    },

    #[error("connection pool is closed")]
    PoolClosed,
}

impl StoreError {
    /// Whether the connection that produced this error can no longer be
    /// trusted to be in sync with the backend.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::Io(_)
                | StoreError::Protocol(_)
                | StoreError::ConnectTimeout(_)
                | StoreError::ConnectionClosed
        )
    }
}

/// Atomic single-key primitives over the phone -> address key space.
pub trait RecordStore: Send + Sync + 'static {
    /// Point lookup.
    fn get(&self, key: &str) -> impl Future<Output = StoreResult<Option<String>>> + Send;

    /// Writes `value` only if `key` does not exist. Returns whether it wrote.
    fn set_if_absent(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Writes `value` only if `key` exists. Returns whether it wrote.
    fn set_if_present(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Removes `key`. Returns the number of keys removed (0 or 1).
    fn delete(&self, key: &str) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Round trip to the backend, for health checks.
    fn ping(&self) -> impl Future<Output = StoreResult<()>> + Send;
}
