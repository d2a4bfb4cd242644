// Connection - one request/reply pipe to the server

use crate::command::Command;
use crate::error::TransportError;
use crate::protocol::{RespParser, RespSerializer, RespValue};
use bytes::BytesMut;
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::OwnedSemaphorePermit;
use tracing::trace;

pub mod pool;

pub use pool::{ConnectionPool, PoolStats, TcpPool};

const READ_CHUNK: usize = 4096;

/// Default cap on buffered reply bytes (512 MiB, the server's bulk limit)
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 512 * 1024 * 1024;

/// A framed RESP connection over any byte stream.
///
/// Replies arrive in request order; callers must read the reply to one
/// command before sending the next.
pub struct Connection<S> {
    stream: BufWriter<S>,
    buffer: BytesMut,
    id: u64,
    max_buffer_size: usize,
    /// Pool slot held while the connection is leased
    permit: Option<OwnedSemaphorePermit>,
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("buffered", &self.buffer.len())
            .field("leased", &self.permit.is_some())
            .finish()
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    pub fn new(stream: S, id: u64) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(READ_CHUNK),
            id,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            permit: None,
        }
    }

    pub fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Write one command and flush it
    pub async fn send(&mut self, command: &Command) -> Result<(), TransportError> {
        let data = RespSerializer::command(command);
        trace!(conn = self.id, bytes = data.len(), "sending {}", command.name());
        self.stream.write_all(&data).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read exactly one reply, waiting for more bytes as needed
    pub async fn read_reply(&mut self) -> Result<RespValue, TransportError> {
        loop {
            if let Some(reply) = RespParser::decode(&mut self.buffer)? {
                return Ok(reply);
            }

            let room = self.max_buffer_size.saturating_sub(self.buffer.len());
            if room == 0 {
                return Err(TransportError::BufferOverflow {
                    limit: self.max_buffer_size,
                });
            }

            // never read past the cap, however much the buffer has grown
            self.buffer.reserve(room.min(READ_CHUNK));
            let n = self
                .stream
                .get_mut()
                .take(room as u64)
                .read_buf(&mut self.buffer)
                .await?;
            if n == 0 {
                return Err(TransportError::Closed);
            }
        }
    }

    /// Send a command and read its reply
    pub async fn request(&mut self, command: &Command) -> Result<RespValue, TransportError> {
        self.send(command).await?;
        self.read_reply().await
    }

    /// Bytes received but not belonging to any consumed reply. A connection
    /// with pending input is out of step with its requests.
    pub fn has_pending_input(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub(crate) fn attach_permit(&mut self, permit: OwnedSemaphorePermit) {
        self.permit = Some(permit);
    }

    pub(crate) fn take_permit(&mut self) -> Option<OwnedSemaphorePermit> {
        self.permit.take()
    }

    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_request_roundtrip() {
        let (client, mut server) = duplex(1024);
        let mut conn = Connection::new(client, 1);

        let server_task = tokio::spawn(async move {
            let mut buf = vec![0u8; 64];
            let n = server.read(&mut buf).await.unwrap();
            server.write_all(b":1\r\n").await.unwrap();
            buf.truncate(n);
            buf
        });

        let reply = conn.request(&Command::raw(["PING"])).await.unwrap();
        assert_eq!(reply, RespValue::Integer(1));
        assert_eq!(server_task.await.unwrap(), b"*1\r\n$4\r\nPING\r\n");
        assert!(!conn.has_pending_input());
    }

    #[tokio::test]
    async fn test_reply_split_across_reads() {
        let (client, mut server) = duplex(1024);
        let mut conn = Connection::new(client, 1);

        tokio::spawn(async move {
            server.write_all(b"$8\r\n166.").await.unwrap();
            server.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            server.write_all(b"2742\r\n").await.unwrap();
            // keep the pipe open until the client is done
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        });

        let reply = conn.read_reply().await.unwrap();
        assert_eq!(reply, RespValue::bulk("166.2742"));
    }

    #[tokio::test]
    async fn test_extra_bytes_are_pending_input() {
        let (client, mut server) = duplex(1024);
        let mut conn = Connection::new(client, 1);

        server.write_all(b":1\r\n:2\r\n").await.unwrap();
        assert_eq!(conn.read_reply().await.unwrap(), RespValue::Integer(1));
        assert!(conn.has_pending_input());
    }

    #[tokio::test]
    async fn test_closed_stream() {
        let (client, server) = duplex(1024);
        let mut conn = Connection::new(client, 1);
        drop(server);

        let err = conn.read_reply().await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[tokio::test]
    async fn test_buffer_limit() {
        let (client, mut server) = duplex(1024);
        let mut conn = Connection::new(client, 1).with_max_buffer_size(8);

        server.write_all(b"$100\r\n0123456789").await.unwrap();
        let err = conn.read_reply().await.unwrap_err();
        assert!(matches!(err, TransportError::BufferOverflow { limit: 8 }));
    }

    #[tokio::test]
    async fn test_single_read_stays_under_limit() {
        let (client, mut server) = duplex(64 * 1024);
        let mut conn = Connection::new(client, 1).with_max_buffer_size(10_000);
        conn.buffer.reserve(64 * 1024);

        let mut reply = b"$40000\r\n".to_vec();
        reply.extend(std::iter::repeat(b'x').take(20_000));
        server.write_all(&reply).await.unwrap();

        let err = conn.read_reply().await.unwrap_err();
        assert!(matches!(err, TransportError::BufferOverflow { limit: 10_000 }));
        assert_eq!(conn.buffer.len(), 10_000);
    }

    #[tokio::test]
    async fn test_protocol_error() {
        let (client, mut server) = duplex(1024);
        let mut conn = Connection::new(client, 1);

        server.write_all(b"!garbage\r\n").await.unwrap();
        let err = conn.read_reply().await.unwrap_err();
        assert!(matches!(err, TransportError::Protocol(_)));
    }
}
