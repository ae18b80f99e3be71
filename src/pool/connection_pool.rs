use crate::error::TransportError;
use crate::pool::config_pool::PoolConfig;
use crate::pool::pool_key::PoolKey;
use crate::tcp::config_connection::TcpConnectionConfig;
use crate::tcp::tcp_connection::TcpConnection;
use crossbeam_queue::ArrayQueue;
use dashmap::DashMap;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

/// A keyed pool of TCP connections.
///
/// Connections are grouped by [`PoolKey`] (host + port). Each key holds at
/// most `max_per_key` connections, idle and borrowed combined; borrowers
/// wait for capacity up to the borrow timeout. Idle connections are
/// validated before reuse and destroyed when their liveness check fails.
#[derive(Debug)]
pub struct ConnectionPool {
    config: PoolConfig,
    connection_config: Arc<TcpConnectionConfig>,
    slots: DashMap<PoolKey, Arc<KeySlot>>,
    closed: AtomicBool,
}

#[derive(Debug)]
struct KeySlot {
    // Idle connections ready for reuse; lock-free, bounded by max_per_key.
    idle: ArrayQueue<Arc<TcpConnection>>,
    // Permits represent the right to hold a borrowed connection; idle
    // connections do not hold permits.
    permits: Semaphore,
    // Every connection this slot created and not yet destroyed, idle or
    // borrowed, keyed by connection id. Pool close reaches borrowed
    // connections through this registry.
    live: DashMap<u64, Arc<TcpConnection>>,
}

impl KeySlot {
    fn new(capacity: usize) -> Self {
        Self {
            idle: ArrayQueue::new(capacity),
            permits: Semaphore::new(capacity),
            live: DashMap::new(),
        }
    }
}

impl ConnectionPool {
    pub fn new(config: PoolConfig) -> Self {
        let connection_config = Arc::new(config.connection);
        Self {
            config,
            connection_config,
            slots: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Number of idle connections currently pooled for the destination.
    pub fn idle_count(&self, host: &str, port: u16) -> usize {
        self.slots
            .get(&PoolKey::new(host, port))
            .map(|slot| slot.idle.len())
            .unwrap_or(0)
    }

    /// Number of connections the pool manages for the destination, idle and
    /// borrowed combined.
    pub fn live_count(&self, host: &str, port: u16) -> usize {
        self.slots
            .get(&PoolKey::new(host, port))
            .map(|slot| slot.live.len())
            .unwrap_or(0)
    }

    /// Borrows a connection for the destination using the configured borrow
    /// timeout.
    pub async fn borrow(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Arc<TcpConnection>, TransportError> {
        self.borrow_with_timeout(host, port, self.config.borrow_timeout)
            .await
    }

    /// Borrows a connection for the destination: reuses a validated idle
    /// connection when one exists, otherwise opens a fresh one under the
    /// per-key cap, waiting up to `borrow_timeout` for capacity.
    ///
    /// Fails with [`TransportError::PoolExhausted`] when the wait times
    /// out, [`TransportError::PoolClosed`] when the pool is closed, and
    /// [`TransportError::CannotEstablishConnection`] when a fresh open
    /// fails. The borrower owns the connection until it releases or
    /// invalidates it.
    pub async fn borrow_with_timeout(
        &self,
        host: &str,
        port: u16,
        borrow_timeout: Duration,
    ) -> Result<Arc<TcpConnection>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::PoolClosed);
        }

        let key = PoolKey::new(host, port);
        let slot = self.slot(&key);
        let permit = match timeout(borrow_timeout, slot.permits.acquire()).await {
            Err(_) => {
                warn!(
                    "No pooled connection for {key} became available within {}.",
                    humantime::format_duration(borrow_timeout)
                );
                return Err(TransportError::PoolExhausted(key, borrow_timeout));
            }
            Ok(Err(_)) => return Err(TransportError::PoolClosed),
            Ok(Ok(permit)) => permit,
        };
        // The permit stays held for the lifetime of the borrow; release and
        // invalidate give it back through add_permits.
        permit.forget();

        while let Some(connection) = slot.idle.pop() {
            if connection.is_closed() {
                debug!(
                    "Destroying idle connection: {} for {key}: it failed the liveness check.",
                    connection.id()
                );
                slot.live.remove(&connection.id());
                continue;
            }
            trace!("Reusing idle connection: {} for {key}.", connection.id());
            return Ok(connection);
        }

        match TcpConnection::open(host, port, self.connection_config.clone()).await {
            Ok(connection) => {
                let connection = Arc::new(connection);
                if self.is_closed() {
                    connection.close().await;
                    return Err(TransportError::PoolClosed);
                }
                slot.live.insert(connection.id(), connection.clone());
                debug!(
                    "Opened connection: {} for {key} ({} live).",
                    connection.id(),
                    slot.live.len()
                );
                Ok(connection)
            }
            Err(error) => {
                slot.permits.add_permits(1);
                Err(error)
            }
        }
    }

    /// Returns a borrowed connection to the idle set for its key, making it
    /// eligible for reuse by the next borrow.
    ///
    /// A connection released to a closed pool, or under a key that does not
    /// match its own destination, is destroyed instead of pooled.
    pub async fn release(&self, host: &str, port: u16, connection: Arc<TcpConnection>) {
        let key = PoolKey::new(host, port);
        let connection_key = connection.pool_key();
        if connection_key != key {
            warn!(
                "Connection: {} belongs to {connection_key}, not {key}; destroying it instead of pooling.",
                connection.id()
            );
            self.discard(&connection_key, connection).await;
            return;
        }
        if self.is_closed() {
            debug!(
                "Pool is closed; destroying released connection: {} for {key}.",
                connection.id()
            );
            connection.close().await;
            return;
        }

        let slot = self.slot(&key);
        let id = connection.id();
        if let Err(connection) = slot.idle.push(connection) {
            warn!("Idle set for {key} is full; destroying released connection: {id}.");
            slot.live.remove(&id);
            connection.close().await;
        } else {
            trace!("Released connection: {id} back to {key}.");
        }
        slot.permits.add_permits(1);
    }

    /// Discards a borrowed connection without returning it to the idle set:
    /// the connection is closed, the pool forgets it, and the freed
    /// capacity lets a future borrow create a replacement. A subsequent
    /// borrow never returns an invalidated connection.
    ///
    /// Must only be called with a connection currently borrowed from this
    /// pool.
    pub async fn invalidate(&self, host: &str, port: u16, connection: Arc<TcpConnection>) {
        let key = PoolKey::new(host, port);
        let connection_key = connection.pool_key();
        if connection_key != key {
            warn!(
                "Connection: {} belongs to {connection_key}, not {key}; invalidating it under its own key.",
                connection.id()
            );
        }
        debug!("Invalidating connection: {} for {connection_key}.", connection.id());
        self.discard(&connection_key, connection).await;
    }

    /// Opens idle connections for the destination until `min_idle_per_key`
    /// of them are pooled, without exceeding the per-key cap. Propagates
    /// the first open failure.
    pub async fn prewarm(&self, host: &str, port: u16) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::PoolClosed);
        }

        let key = PoolKey::new(host, port);
        let slot = self.slot(&key);
        let capacity = self.config.max_per_key.max(1);
        // The live registry counts idle and borrowed together; permits alone
        // cannot bound the total here because idle connections hold none.
        while slot.idle.len() < self.config.min_idle_per_key && slot.live.len() < capacity {
            let Ok(permit) = slot.permits.try_acquire() else {
                debug!(
                    "Prewarming {key} stopped at capacity with {} idle connections.",
                    slot.idle.len()
                );
                return Ok(());
            };
            permit.forget();

            match TcpConnection::open(host, port, self.connection_config.clone()).await {
                Ok(connection) => {
                    let connection = Arc::new(connection);
                    let id = connection.id();
                    slot.live.insert(id, connection.clone());
                    if let Err(connection) = slot.idle.push(connection) {
                        slot.live.remove(&id);
                        connection.close().await;
                        slot.permits.add_permits(1);
                        return Ok(());
                    }
                    slot.permits.add_permits(1);
                }
                Err(error) => {
                    slot.permits.add_permits(1);
                    return Err(error);
                }
            }
        }
        debug!("Prewarmed {key} to {} idle connections.", slot.idle.len());
        Ok(())
    }

    /// Closes the pool: idempotent. Waiting borrows fail fast with
    /// `PoolClosed`, then every managed connection across all keys, idle
    /// and borrowed alike, is destroyed concurrently.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Closing the connection pool...");

        let mut connections = Vec::new();
        for entry in self.slots.iter() {
            let slot = entry.value();
            slot.permits.close();
            for live in slot.live.iter() {
                connections.push(live.value().clone());
            }
        }
        let count = connections.len();
        join_all(connections.iter().map(|connection| connection.close())).await;
        self.slots.clear();
        info!("Connection pool closed; destroyed {count} connections.");
    }

    /// Closes the connection and repairs its true slot's bookkeeping. The
    /// permit is only given back when the connection was actually tracked,
    /// so foreign connections cannot inflate a slot's capacity.
    async fn discard(&self, key: &PoolKey, connection: Arc<TcpConnection>) {
        if let Some(slot) = self.slots.get(key).map(|slot| slot.value().clone()) {
            if slot.live.remove(&connection.id()).is_some() {
                slot.permits.add_permits(1);
            }
        }
        connection.close().await;
    }

    fn slot(&self, key: &PoolKey) -> Arc<KeySlot> {
        if let Some(slot) = self.slots.get(key) {
            return slot.value().clone();
        }
        self.slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(KeySlot::new(self.config.max_per_key.max(1))))
            .value()
            .clone()
    }
}
