// Client module - typed dispatch of commands over pooled connections
//
// Every wrapper goes through `Dispatcher::call`: acquire a connection, write
// the command, read one reply, hand the connection back, decode.

use crate::cancel::CancellationToken;
use crate::command::Command;
use crate::config::ClientConfig;
use crate::connection::{Connection, ConnectionPool, TcpPool};
use crate::error::{CancelReason, Error, Result, TransportError};
use crate::protocol::RespValue;
use crate::reply::{Decode, RawReply, ResultShape};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

pub mod blocking;
pub mod geo;

pub use blocking::BlockingClient;

/// A built command paired with the decoder for its declared reply shape
#[derive(Debug, Clone)]
pub struct Request<D> {
    command: Command,
    decoder: D,
}

impl<D: Decode> Request<D> {
    pub fn new(command: Command, decoder: D) -> Self {
        Self { command, decoder }
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn shape(&self) -> ResultShape {
        self.decoder.shape()
    }

    pub fn into_parts(self) -> (Command, D) {
        (self.command, self.decoder)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallState {
    Idle,
    Sending,
    AwaitingReply,
    Completed,
}

/// Exclusive hold on one connection for the length of a call.
///
/// The connection goes back to the pool exactly once: released if the
/// exchange never started or completed cleanly, discarded in every other
/// case, including the call future being dropped mid-exchange.
struct Lease<'a, P: ConnectionPool> {
    pool: &'a P,
    conn: Option<Connection<P::Stream>>,
    state: CallState,
}

impl<'a, P: ConnectionPool> Lease<'a, P> {
    fn new(pool: &'a P, conn: Connection<P::Stream>) -> Self {
        Self {
            pool,
            conn: Some(conn),
            state: CallState::Idle,
        }
    }

    async fn exchange(&mut self, command: &Command) -> std::result::Result<RespValue, TransportError> {
        let conn = self.conn.as_mut().ok_or(TransportError::Closed)?;

        self.state = CallState::Sending;
        conn.send(command).await?;

        self.state = CallState::AwaitingReply;
        let reply = conn.read_reply().await?;

        self.state = CallState::Completed;
        Ok(reply)
    }

    fn finish(mut self) {
        self.give_back();
    }

    fn give_back(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        let reusable = match self.state {
            CallState::Idle => true,
            CallState::Completed => !conn.has_pending_input(),
            CallState::Sending | CallState::AwaitingReply => false,
        };

        if reusable {
            self.pool.release(conn);
        } else {
            warn!(conn = conn.id(), state = ?self.state, "Discarding connection");
            self.pool.discard(conn);
        }
    }
}

impl<P: ConnectionPool> Drop for Lease<'_, P> {
    fn drop(&mut self) {
        self.give_back();
    }
}

/// Runs requests against a pool. Cheap to clone.
pub struct Dispatcher<P> {
    pool: Arc<P>,
    command_timeout: Option<Duration>,
}

impl<P> Clone for Dispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            command_timeout: self.command_timeout,
        }
    }
}

impl<P: ConnectionPool> Dispatcher<P> {
    pub fn new(pool: Arc<P>, command_timeout: Option<Duration>) -> Self {
        Self { pool, command_timeout }
    }

    pub fn pool(&self) -> &Arc<P> {
        &self.pool
    }

    /// Send one command and decode its reply.
    ///
    /// Cancellation is honored before the connection is acquired, while
    /// waiting for one, and while the exchange is in flight. The per-call
    /// timeout covers acquire and exchange together.
    pub async fn call<D: Decode>(&self, request: Request<D>, cancel: &CancellationToken) -> Result<D::Output> {
        let (command, decoder) = request.into_parts();
        let started = Instant::now();
        let deadline = self.command_timeout.map(|limit| started + limit);
        debug!(command = %command.name(), shape = %decoder.shape(), "Dispatching");

        if cancel.is_cancelled() {
            return Err(Error::Cancelled(CancelReason::Requested));
        }

        let conn = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled(CancelReason::Requested)),
            conn = until(deadline, self.pool.acquire()) => conn?.map_err(Error::from)?,
        };

        let mut lease = Lease::new(self.pool.as_ref(), conn);
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled(CancelReason::Requested)),
            reply = until(deadline, lease.exchange(&command)) => match reply {
                Ok(reply) => reply.map_err(Error::from),
                Err(timeout) => Err(timeout),
            },
        };
        lease.finish();

        let reply = match outcome {
            Ok(reply) => reply,
            Err(err) => {
                debug!(command = %command.name(), error = %err, "Call failed");
                return Err(err);
            }
        };
        debug!(
            command = %command.name(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Reply received"
        );

        match reply {
            RespValue::Error(message) => Err(Error::Server(message)),
            reply => decoder.decode(reply).map_err(Error::from),
        }
    }
}

/// Await `fut`, failing with a timeout once `deadline` passes
async fn until<F: Future>(deadline: Option<Instant>, fut: F) -> Result<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| Error::Cancelled(CancelReason::Timeout)),
        None => Ok(fut.await),
    }
}

/// Async client. Cloning shares the pool.
pub struct Client<P> {
    dispatcher: Dispatcher<P>,
}

impl<P> Clone for Client<P> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl Client<TcpPool> {
    /// Client over TCP. Connections are opened lazily on first use.
    pub fn connect(config: ClientConfig) -> Self {
        let command_timeout = config.command_timeout;
        Self::with_pool(Arc::new(TcpPool::new(config)), command_timeout)
    }
}

impl<P: ConnectionPool> Client<P> {
    pub fn with_pool(pool: Arc<P>, command_timeout: Option<Duration>) -> Self {
        Self {
            dispatcher: Dispatcher::new(pool, command_timeout),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<P> {
        &self.dispatcher
    }

    pub fn pool(&self) -> &Arc<P> {
        self.dispatcher.pool()
    }

    /// Run any request with its own decoder
    pub async fn query<D: Decode>(&self, request: Request<D>, cancel: &CancellationToken) -> Result<D::Output> {
        self.dispatcher.call(request, cancel).await
    }

    /// Run an arbitrary command and return the reply undecoded. Error
    /// replies still surface as `Error::Server`.
    pub async fn execute(&self, command: Command, cancel: &CancellationToken) -> Result<RespValue> {
        if command.is_empty() {
            return Err(crate::error::BuildError::invalid("command", "empty command").into());
        }
        self.query(Request::new(command, RawReply), cancel).await
    }
}
