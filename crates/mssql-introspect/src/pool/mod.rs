//! Bounded connection pool with explicit drain.
//!
//! Wraps a bb8 pool so that:
//!
//! - acquisition is bounded by a timeout and fails with `ConnectionUnavailable`
//! - background connection errors are forwarded to the host log sink
//! - `drain()` waits for in-flight acquisitions, then closes the pool
//!
//! Connections are handed out as owned guards; dropping the guard returns the
//! connection to the pool on every exit path.

mod mssql;

pub use mssql::TiberiusConnectionManager;

use std::fmt;
use std::time::Duration;

use bb8::{ManageConnection, Pool, PooledConnection, RunError};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::PoolConfig;
use crate::error::{IntrospectError, Result};
use crate::sink::{PoolErrorSink, SharedSink};

/// Idle connection timeout (5 minutes).
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Maximum connection lifetime (30 minutes).
const POOL_MAX_LIFETIME: Duration = Duration::from_secs(1800);

/// A connection checked out of a [`ConnectionPool`].
pub type PooledConn<M> = PooledConnection<'static, M>;

/// Bounded pool of live connections.
pub struct ConnectionPool<M: ManageConnection> {
    /// `None` once drained. Acquisitions hold the read side for their whole
    /// duration so that drain (write side) waits for them to settle.
    pool: RwLock<Option<Pool<M>>>,
    acquire_timeout: Duration,
    sink: SharedSink,
}

impl<M> ConnectionPool<M>
where
    M: ManageConnection,
    M::Error: fmt::Display,
{
    /// Create a pool. Connections are opened lazily in the background up to
    /// `min_connections`; failures there go to the sink.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(manager: M, config: &PoolConfig, sink: SharedSink) -> Self {
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .min_idle(Some(config.min_connections))
            .connection_timeout(config.acquire_timeout())
            .idle_timeout(Some(POOL_IDLE_TIMEOUT))
            .max_lifetime(Some(POOL_MAX_LIFETIME))
            .test_on_check_out(true)
            .retry_connection(false)
            .error_sink(Box::new(PoolErrorSink::new(sink.clone())))
            .build_unchecked(manager);

        info!(
            "Created connection pool (min={}, max={}, acquire_timeout={}s)",
            config.min_connections, config.max_connections, config.acquire_timeout_secs
        );

        Self {
            pool: RwLock::new(Some(pool)),
            acquire_timeout: config.acquire_timeout(),
            sink,
        }
    }

    /// Acquire a connection using the configured timeout.
    pub async fn acquire(&self) -> Result<PooledConn<M>> {
        self.acquire_within(self.acquire_timeout).await
    }

    /// Acquire a connection, giving up after `timeout`.
    pub async fn acquire_within(&self, timeout: Duration) -> Result<PooledConn<M>> {
        let guard = self.pool.read().await;
        let pool = guard.as_ref().ok_or(IntrospectError::SessionClosed)?;

        match tokio::time::timeout(timeout, pool.get_owned()).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(RunError::User(e))) => {
                self.sink.error("ConnectionPool Error:", &e.to_string());
                Err(IntrospectError::unavailable(e, "acquiring pooled connection"))
            }
            Ok(Err(RunError::TimedOut)) | Err(_) => Err(IntrospectError::unavailable(
                format!("no connection available within {}ms", timeout.as_millis()),
                "acquiring pooled connection",
            )),
        }
    }

    /// Return a connection to the pool.
    pub fn release(&self, conn: PooledConn<M>) {
        drop(conn);
    }

    /// Close the pool. Waits for in-flight acquisitions; a second call is a no-op.
    pub async fn drain(&self) {
        let mut guard = self.pool.write().await;
        match guard.take() {
            Some(pool) => {
                let state = pool.state();
                info!(
                    "Draining connection pool ({} connections, {} idle)",
                    state.connections, state.idle_connections
                );
                drop(pool);
            }
            None => debug!("Connection pool already drained"),
        }
    }

    /// Whether `drain()` has run.
    pub async fn is_drained(&self) -> bool {
        self.pool.read().await.is_none()
    }
}
