// Connection pool
//
// Idle connections sit in a lock-free queue. A semaphore bounds how many
// connections are leased at once; the permit travels with the leased
// connection and is returned when the connection comes back or is dropped.

use super::Connection;
use crate::command::Command;
use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::protocol::RespValue;
use crossbeam::queue::ArrayQueue;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Source of connections for the dispatcher.
///
/// Every acquired connection must be handed back exactly once: `release`
/// when it is known to be idle and in step, `discard` otherwise.
pub trait ConnectionPool: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    fn acquire(&self) -> impl Future<Output = Result<Connection<Self::Stream>, TransportError>> + Send;

    fn release(&self, conn: Connection<Self::Stream>);

    fn discard(&self, conn: Connection<Self::Stream>);
}

/// Statistics for pool monitoring.
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Connections taken from the idle queue
    pub reused: AtomicUsize,
    /// Connections newly opened
    pub opened: AtomicUsize,
    /// Connections returned to the idle queue
    pub released: AtomicUsize,
    /// Connections closed instead of reused
    pub discarded: AtomicUsize,
}

impl PoolStats {
    pub fn snapshot(&self) -> (usize, usize, usize, usize) {
        (
            self.reused.load(Ordering::Relaxed),
            self.opened.load(Ordering::Relaxed),
            self.released.load(Ordering::Relaxed),
            self.discarded.load(Ordering::Relaxed),
        )
    }
}

/// TCP connection pool with lazy connect and AUTH/SELECT handshake
#[derive(Debug)]
pub struct TcpPool {
    config: ClientConfig,
    idle: ArrayQueue<Connection<TcpStream>>,
    permits: Arc<Semaphore>,
    next_id: AtomicU64,
    stats: PoolStats,
}

impl TcpPool {
    pub fn new(config: ClientConfig) -> Self {
        let size = config.pool_size.max(1);
        Self {
            idle: ArrayQueue::new(size),
            permits: Arc::new(Semaphore::new(size)),
            next_id: AtomicU64::new(1),
            stats: PoolStats::default(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Stop handing out connections and close the idle ones. Leased
    /// connections are closed as they come back.
    pub fn close(&self) {
        self.permits.close();
        while self.idle.pop().is_some() {}
        info!("Connection pool to {} closed", self.config.addr());
    }

    async fn connect(&self) -> Result<Connection<TcpStream>, TransportError> {
        let addr = self.config.addr();
        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| TransportError::ConnectTimeout { addr: addr.clone() })??;
        stream.set_nodelay(true)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut conn = Connection::new(stream, id).with_max_buffer_size(self.config.max_buffer_size);
        self.handshake(&mut conn).await?;

        self.stats.opened.fetch_add(1, Ordering::Relaxed);
        info!(conn = id, "Connected to {}", addr);
        Ok(conn)
    }

    async fn handshake(&self, conn: &mut Connection<TcpStream>) -> Result<(), TransportError> {
        if let Some(password) = &self.config.password {
            let auth = match &self.config.username {
                Some(user) => Command::raw(["AUTH", user.as_str(), password.as_str()]),
                None => Command::raw(["AUTH", password.as_str()]),
            };
            expect_ok(conn.request(&auth).await?, "AUTH")?;
        }

        if self.config.db != 0 {
            let select = Command::raw(["SELECT".to_string(), self.config.db.to_string()]);
            expect_ok(conn.request(&select).await?, "SELECT")?;
        }

        Ok(())
    }
}

fn expect_ok(reply: RespValue, step: &str) -> Result<(), TransportError> {
    match reply {
        RespValue::SimpleString(s) if s == "OK" => Ok(()),
        RespValue::Error(message) => Err(TransportError::Handshake(format!("{}: {}", step, message))),
        other => Err(TransportError::Handshake(format!(
            "{}: unexpected {} reply",
            step,
            other.kind()
        ))),
    }
}

impl ConnectionPool for TcpPool {
    type Stream = TcpStream;

    async fn acquire(&self) -> Result<Connection<TcpStream>, TransportError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TransportError::PoolClosed)?;

        let mut conn = match self.idle.pop() {
            Some(conn) => {
                self.stats.reused.fetch_add(1, Ordering::Relaxed);
                conn
            }
            None => self.connect().await?,
        };
        conn.attach_permit(permit);
        debug!(conn = conn.id(), "Connection leased");
        Ok(conn)
    }

    fn release(&self, mut conn: Connection<TcpStream>) {
        let permit = conn.take_permit();
        if self.permits.is_closed() {
            return;
        }
        let id = conn.id();
        match self.idle.push(conn) {
            Ok(()) => {
                self.stats.released.fetch_add(1, Ordering::Relaxed);
                debug!(conn = id, "Connection released");
            }
            Err(_) => warn!(conn = id, "Idle queue full, closing connection"),
        }
        // Queue the connection before freeing the slot so the next waiter finds it
        drop(permit);
    }

    fn discard(&self, conn: Connection<TcpStream>) {
        self.stats.discarded.fetch_add(1, Ordering::Relaxed);
        debug!(conn = conn.id(), "Connection discarded");
    }
}
