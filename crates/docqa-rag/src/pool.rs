//! Bounded connection pool with scoped acquisition

use serde::Serialize;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use docqa_core::{Error, Result};

struct PoolInner<C> {
    idle: Mutex<Vec<Arc<C>>>,
    permits: Arc<Semaphore>,
    size: usize,
    wait_timeout: Duration,
    acquisitions: AtomicU64,
    timeouts: AtomicU64,
}

/// Snapshot of pool usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub size: usize,
    pub idle: usize,
    pub acquisitions: u64,
    pub timeouts: u64,
    pub closed: bool,
}

/// Fixed-size pool of store connections.
///
/// Connections are shared handles (`Arc<C>`), so `C` synchronises its own
/// interior state. Each connection is handed to at most one caller at a
/// time. Callers wait up to the configured timeout for a free connection
/// and get [`Error::ResourceExhausted`] after that.
pub struct ConnectionPool<C> {
    inner: Arc<PoolInner<C>>,
}

impl<C> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Send + 'static> ConnectionPool<C> {
    pub fn new(connections: Vec<C>, wait_timeout: Duration) -> Result<Self> {
        if connections.is_empty() {
            return Err(Error::Configuration(
                "connection pool needs at least one connection".to_string(),
            ));
        }
        let size = connections.len();
        Ok(Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(connections.into_iter().map(Arc::new).collect()),
                permits: Arc::new(Semaphore::new(size)),
                size,
                wait_timeout,
                acquisitions: AtomicU64::new(0),
                timeouts: AtomicU64::new(0),
            }),
        })
    }

    /// Wait for a free connection. It goes back to the pool when the guard drops.
    pub async fn acquire(&self) -> Result<PooledConnection<C>> {
        let inner = &self.inner;
        let permit = match tokio::time::timeout(
            inner.wait_timeout,
            Arc::clone(&inner.permits).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return Err(Error::ResourceExhausted("connection pool is closed".to_string()));
            }
            Err(_) => {
                inner.timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    size = inner.size,
                    wait_ms = inner.wait_timeout.as_millis() as u64,
                    "timed out waiting for a pooled connection"
                );
                return Err(Error::ResourceExhausted(format!(
                    "no connection available within {}ms",
                    inner.wait_timeout.as_millis()
                )));
            }
        };

        let conn = inner
            .idle
            .lock()
            .map_err(|e| Error::Other(format!("Lock error: {}", e)))?
            .pop()
            .ok_or_else(|| Error::ResourceExhausted("connection pool is empty".to_string()))?;

        inner.acquisitions.fetch_add(1, Ordering::Relaxed);
        debug!(available = inner.permits.available_permits(), "acquired pooled connection");

        Ok(PooledConnection {
            conn,
            pool: Arc::clone(inner),
            _permit: permit,
        })
    }

    /// Stop handing out connections; waiting and future callers fail.
    pub fn close(&self) {
        self.inner.permits.close();
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            size: self.inner.size,
            idle: self.inner.idle.lock().map(|idle| idle.len()).unwrap_or(0),
            acquisitions: self.inner.acquisitions.load(Ordering::Relaxed),
            timeouts: self.inner.timeouts.load(Ordering::Relaxed),
            closed: self.inner.permits.is_closed(),
        }
    }
}

/// A connection checked out of a [`ConnectionPool`]
pub struct PooledConnection<C> {
    conn: Arc<C>,
    pool: Arc<PoolInner<C>>,
    // released after the connection is back in `idle`
    _permit: OwnedSemaphorePermit,
}

impl<C> Deref for PooledConnection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.conn
    }
}

impl<C> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        let conn = Arc::clone(&self.conn);
        match self.pool.idle.lock() {
            Ok(mut idle) => idle.push(conn),
            Err(poisoned) => poisoned.into_inner().push(conn),
        }
    }
}
