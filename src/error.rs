// Error types
//
// Every call ends in exactly one of: a decoded value, a build error, a
// transport error, a server error reply, a decode mismatch, or cancellation.

use crate::protocol::RespError;
use crate::reply::ResultShape;
use std::fmt;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Arguments rejected before any I/O
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    /// Connection failure, broken framing or I/O fault
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server executed the command and answered with an error reply
    #[error("server error: {0}")]
    Server(String),

    /// The reply did not have the declared shape
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The caller gave up, explicitly or through the call timeout
    #[error("call cancelled: {0}")]
    Cancelled(CancelReason),
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Cancelled(CancelReason::Timeout))
    }

    pub fn is_server(&self) -> bool {
        matches!(self, Error::Server(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode(_))
    }

    /// Server message, verbatim, when this is a server error reply
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Error::Server(msg) => Some(msg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The cancellation token fired
    Requested,
    /// The per-call timeout elapsed
    Timeout,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Requested => f.write_str("cancellation requested"),
            CancelReason::Timeout => f.write_str("timed out"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("invalid argument `{param}`: {reason}")]
    InvalidArgument { param: &'static str, reason: String },

    #[error("`{first}` cannot be combined with `{second}`")]
    Conflict {
        first: &'static str,
        second: &'static str,
    },
}

impl BuildError {
    pub(crate) fn invalid(param: &'static str, reason: impl Into<String>) -> Self {
        BuildError::InvalidArgument {
            param,
            reason: reason.into(),
        }
    }

    /// Name of the offending parameter
    pub fn param(&self) -> &'static str {
        match self {
            BuildError::InvalidArgument { param, .. } => *param,
            BuildError::Conflict { first, .. } => *first,
        }
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] RespError),

    #[error("connection closed by server")]
    Closed,

    #[error("connect to {addr} timed out")]
    ConnectTimeout { addr: String },

    #[error("reply exceeds read buffer limit of {limit} bytes")]
    BufferOverflow { limit: usize },

    #[error("connection handshake failed: {0}")]
    Handshake(String),

    #[error("connection pool is closed")]
    PoolClosed,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("expected {expected}, got {found}")]
pub struct DecodeError {
    pub expected: ResultShape,
    pub found: String,
}

impl DecodeError {
    pub(crate) fn new(expected: ResultShape, found: impl Into<String>) -> Self {
        Self {
            expected,
            found: found.into(),
        }
    }
}
