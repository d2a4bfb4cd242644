// Typed GEO command client over RESP
//
// Builders render commands, decoders declare reply shapes, and one
// dispatcher moves both over pooled connections in async or blocking style.

pub mod cancel;
pub mod client;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod reply;
pub mod types;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use client::{BlockingClient, Client, Dispatcher, Request};
pub use command::geo::{
    GeoAddCondition, GeoAddOptions, GeoOrigin, GeoPoint, GeoShape, GeoStore, SearchOptions,
};
pub use command::{Command, ToArg};
pub use config::ClientConfig;
pub use connection::{Connection, ConnectionPool, TcpPool};
pub use error::{BuildError, CancelReason, DecodeError, Error, Result, TransportError};
pub use protocol::{RespParser, RespSerializer, RespValue};
pub use reply::{Decode, FromBulk, GeoRecord, ResultShape};
pub use types::{Coordinate, Distance, GeoCount, GeoFlags, GeoOrder, GeoUnit};
