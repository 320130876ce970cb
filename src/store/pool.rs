//! Connection Pool
//!
//! Process-wide set of backend connections, created once at startup and
//! closed at shutdown. Every store call checks a connection out and gets a
//! [`PooledConnection`] guard back.
//!
//! ## Guard Lifecycle
//!
//! ```text
//! Pool::get()
//!     │  wait for a permit (at most `max_size` checked out)
//!     │  reuse a live idle connection, or dial a new one
//!     ▼
//! PooledConnection ──execute()──> backend
//!     │
//!     ▼ drop (success, error, or cancelled future)
//!  healthy? ──yes──> back to the idle list
//!     │
//!     no ──> closed, permit released
//! ```
//!
//! A connection counts as unhealthy when a command failed at the transport
//! level or when its future was dropped between sending a command and
//! reading the reply; either way a reply may still be pending on the socket.
//! Idle connections the backend closed (restart, idle timeout) are dropped at
//! checkout instead of being handed out.

use crate::protocol::RespValue;
use crate::store::{Connection, Endpoint, StoreError, StoreResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

/// Default number of connections the pool may hold open.
pub const DEFAULT_POOL_SIZE: usize = 16;

/// Pool counters.
#[derive(Debug, Default)]
struct Counters {
    opened: AtomicU64,
    reused: AtomicU64,
    discarded: AtomicU64,
}

/// Point-in-time view of the pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections dialed since the pool was created
    pub opened: u64,
    /// Checkouts served by an idle connection
    pub reused: u64,
    /// Connections dropped instead of being returned
    pub discarded: u64,
    /// Connections waiting in the idle list
    pub idle: usize,
    /// Connections currently checked out
    pub in_use: usize,
}

#[derive(Debug)]
struct Shared {
    endpoint: Endpoint,
    max_size: usize,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
    counters: Counters,
}

impl Shared {
    fn idle(&self) -> MutexGuard<'_, Vec<Connection>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A bounded pool of backend connections. Cloning is cheap and shares the
/// same pool.
#[derive(Debug, Clone)]
pub struct Pool {
    shared: Arc<Shared>,
}

impl Pool {
    /// Creates an empty pool. Connections are dialed on first use.
    pub fn new(endpoint: Endpoint, max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            shared: Arc::new(Shared {
                endpoint,
                max_size,
                idle: Mutex::new(Vec::with_capacity(max_size)),
                permits: Arc::new(Semaphore::new(max_size)),
                counters: Counters::default(),
            }),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.endpoint
    }

    /// Checks a connection out, waiting if `max_size` are already in use.
    pub async fn get(&self) -> StoreResult<PooledConnection> {
        let permit = Arc::clone(&self.shared.permits)
            .acquire_owned()
            .await
            .map_err(|_| StoreError::PoolClosed)?;

        let conn = match self.take_idle() {
            Some(conn) => {
                self.shared.counters.reused.fetch_add(1, Ordering::Relaxed);
                conn
            }
            None => {
                // The permit is released by drop if dialing fails.
                let conn = Connection::open(&self.shared.endpoint).await?;
                self.shared.counters.opened.fetch_add(1, Ordering::Relaxed);
                conn
            }
        };

        Ok(PooledConnection {
            conn: Some(conn),
            healthy: true,
            shared: Arc::clone(&self.shared),
            _permit: permit,
        })
    }

    /// Pops idle connections until one is still usable, discarding any the
    /// backend has closed in the meantime.
    fn take_idle(&self) -> Option<Connection> {
        loop {
            let conn = self.shared.idle().pop()?;
            if !conn.is_stale() {
                return Some(conn);
            }
            self.shared.counters.discarded.fetch_add(1, Ordering::Relaxed);
            debug!(endpoint = %self.shared.endpoint, "Discarding idle connection closed by backend");
        }
    }

    /// Refuses further checkouts and drops idle connections. Connections
    /// still checked out are closed when their guards drop.
    pub fn close(&self) {
        self.shared.permits.close();
        let idle = std::mem::take(&mut *self.shared.idle());
        info!(
            endpoint = %self.shared.endpoint,
            closed = idle.len(),
            "Connection pool closed"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.shared.permits.is_closed()
    }

    pub fn stats(&self) -> PoolStats {
        let counters = &self.shared.counters;
        PoolStats {
            opened: counters.opened.load(Ordering::Relaxed),
            reused: counters.reused.load(Ordering::Relaxed),
            discarded: counters.discarded.load(Ordering::Relaxed),
            idle: self.shared.idle().len(),
            in_use: self.shared.max_size - self.shared.permits.available_permits(),
        }
    }
}

/// A checked-out connection. Returned to the pool on drop.
#[derive(Debug)]
pub struct PooledConnection {
    conn: Option<Connection>,
    healthy: bool,
    shared: Arc<Shared>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    /// Sends one command and reads its reply.
    pub async fn execute(&mut self, command: &RespValue) -> StoreResult<RespValue> {
        let conn = self.conn.as_mut().ok_or(StoreError::PoolClosed)?;

        // Stays false if this future is dropped mid-command.
        self.healthy = false;
        let result = conn.execute(command).await;
        self.healthy = match &result {
            Ok(_) => true,
            Err(e) => !e.is_connection_fatal(),
        };
        result
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        if self.healthy && !self.shared.permits.is_closed() {
            self.shared.idle().push(conn);
        } else {
            self.shared.counters.discarded.fetch_add(1, Ordering::Relaxed);
            if self.healthy {
                debug!("Pool closed, dropping returned connection");
            } else {
                warn!(endpoint = %self.shared.endpoint, "Discarding broken backend connection");
            }
        }
    }
}
