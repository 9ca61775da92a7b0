//! Fixed-size pool of pre-opened connections.

use std::ops::{Deref, DerefMut};

use crossbeam_channel::{Receiver, Sender};

use crate::connection::{Connection, Connector};
use crate::error::{DispatchError, DispatchResult};

/// A fixed set of connections, each checked out by at most one holder.
///
/// Idle connections sit in a bounded channel; checking one out takes it off
/// the channel and dropping the [`PooledConnection`] guard puts it back. A
/// connection that reports itself broken is swapped for a fresh one from the
/// connector on the way back, so the pool keeps its size.
pub struct ConnectionPool<'k, K: Connector> {
    connector: &'k K,
    size: usize,
    idle_tx: Sender<K::Connection>,
    idle_rx: Receiver<K::Connection>,
}

impl<'k, K: Connector> ConnectionPool<'k, K> {
    /// Open `size` connections.
    ///
    /// Fails without opening anything if `size` is zero. If any connection
    /// fails, those already opened are closed before the error is returned.
    pub fn open(connector: &'k K, size: usize) -> DispatchResult<Self> {
        if size == 0 {
            return Err(DispatchError::config("connection pool size must be at least 1"));
        }

        let (idle_tx, idle_rx) = crossbeam_channel::bounded(size);
        let pool = Self {
            connector,
            size,
            idle_tx,
            idle_rx,
        };

        for index in 0..size {
            match connector.connect() {
                Ok(connection) => pool.release(connection),
                Err(source) => {
                    tracing::error!("Failed to open connection {}/{}: {}", index + 1, size, source);
                    if let Err(e) = pool.close_idle() {
                        tracing::warn!("Error closing partially opened pool: {}", e);
                    }
                    return Err(DispatchError::Connect {
                        index,
                        size,
                        source: Box::new(source),
                    });
                }
            }
        }

        tracing::info!("Opened connection pool with {} connections", size);
        Ok(pool)
    }

    /// Number of connections owned by the pool.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of connections currently idle.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.idle_rx.len()
    }

    /// Check out a connection, blocking until one is idle.
    pub fn acquire(&self) -> DispatchResult<PooledConnection<'_, 'k, K>> {
        let connection = self.idle_rx.recv().map_err(|_| DispatchError::PoolClosed)?;
        Ok(PooledConnection {
            connection: Some(connection),
            pool: self,
        })
    }

    /// Check out a connection if one is idle right now.
    #[must_use]
    pub fn try_acquire(&self) -> Option<PooledConnection<'_, 'k, K>> {
        self.idle_rx.try_recv().ok().map(|connection| PooledConnection {
            connection: Some(connection),
            pool: self,
        })
    }

    /// Close every connection.
    ///
    /// Taking the pool by value guarantees no guard is still alive, so every
    /// connection is idle and gets closed exactly once. All connections are
    /// closed even if some fail; the first failure is returned.
    pub fn close(self) -> DispatchResult<()> {
        let result = self.close_idle();
        tracing::info!("Closed connection pool ({} connections)", self.size);
        result
    }

    /// Put a checked-out connection back, replacing it first if it is broken.
    ///
    /// If no replacement can be opened the broken connection goes back as is;
    /// the next command on it fails and the swap is tried again.
    fn check_in(&self, connection: K::Connection) {
        if !connection.is_broken() {
            self.release(connection);
            return;
        }

        match self.connector.connect() {
            Ok(fresh) => {
                tracing::warn!("Replaced broken connection");
                if let Err(e) = connection.close() {
                    tracing::debug!("Error closing broken connection: {}", e);
                }
                self.release(fresh);
            }
            Err(e) => {
                tracing::warn!("Could not replace broken connection: {}", e);
                self.release(connection);
            }
        }
    }

    fn release(&self, connection: K::Connection) {
        // Capacity equals the number of connections in existence, so this never blocks.
        if self.idle_tx.send(connection).is_err() {
            tracing::error!("Connection pool receiver dropped; discarding connection");
        }
    }

    fn close_idle(&self) -> DispatchResult<()> {
        let mut first_error = None;
        for connection in self.idle_rx.try_iter() {
            if let Err(e) = connection.close() {
                tracing::warn!("Error closing connection: {}", e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// A checked-out connection. Returned to the pool on drop, including on
/// early returns and unwinding.
pub struct PooledConnection<'p, 'k, K: Connector> {
    connection: Option<K::Connection>,
    pool: &'p ConnectionPool<'k, K>,
}

impl<K: Connector> Deref for PooledConnection<'_, '_, K> {
    type Target = K::Connection;

    fn deref(&self) -> &K::Connection {
        self.connection
            .as_ref()
            .unwrap_or_else(|| unreachable!("connection taken before drop"))
    }
}

impl<K: Connector> DerefMut for PooledConnection<'_, '_, K> {
    fn deref_mut(&mut self) -> &mut K::Connection {
        self.connection
            .as_mut()
            .unwrap_or_else(|| unreachable!("connection taken before drop"))
    }
}

impl<K: Connector> Drop for PooledConnection<'_, '_, K> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.pool.check_in(connection);
        }
    }
}
