// Reply module - decoding raw replies into declared result shapes
//
// The caller declares the shape it expects; replies are not self-describing
// enough to tell e.g. a list of members from a list of enriched records.

use crate::error::DecodeError;
use crate::protocol::RespValue;
use crate::types::GeoFlags;
use bytes::Bytes;
use std::fmt;
use std::marker::PhantomData;

pub mod geo;

pub use geo::{CoordinateReply, GeoRecord, GeoRecordReply};

/// Tag describing how a reply must be decoded
#[derive(Debug, Clone, PartialEq)]
pub enum ResultShape {
    Integer,
    Double,
    BulkString,
    Coordinate,
    GeoRecord(GeoFlags),
    Array(Box<ResultShape>),
    /// Null maps to an absent value; anything else must match the inner shape
    Optional(Box<ResultShape>),
    /// Any reply, passed through untouched
    Raw,
}

impl fmt::Display for ResultShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultShape::Integer => f.write_str("integer"),
            ResultShape::Double => f.write_str("double"),
            ResultShape::BulkString => f.write_str("bulk string"),
            ResultShape::Coordinate => f.write_str("coordinate"),
            ResultShape::GeoRecord(flags) => write!(f, "geo record {:?}", flags),
            ResultShape::Array(inner) => write!(f, "array of {}", inner),
            ResultShape::Optional(inner) => write!(f, "optional {}", inner),
            ResultShape::Raw => f.write_str("any reply"),
        }
    }
}

/// A decoder for one declared result shape.
///
/// Decoders are pure and synchronous; the blocking and async call paths share
/// them.
pub trait Decode {
    type Output;

    fn shape(&self) -> ResultShape;

    fn decode(&self, reply: RespValue) -> Result<Self::Output, DecodeError>;

    fn mismatch(&self, reply: &RespValue) -> DecodeError {
        DecodeError::new(self.shape(), reply.kind())
    }
}

/// Member and string payload types a bulk reply can be read into
pub trait FromBulk: Sized {
    fn from_bulk(data: Vec<u8>) -> Option<Self>;
}

impl FromBulk for String {
    fn from_bulk(data: Vec<u8>) -> Option<Self> {
        String::from_utf8(data).ok()
    }
}

impl FromBulk for Vec<u8> {
    fn from_bulk(data: Vec<u8>) -> Option<Self> {
        Some(data)
    }
}

impl FromBulk for Bytes {
    fn from_bulk(data: Vec<u8>) -> Option<Self> {
        Some(Bytes::from(data))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerReply;

impl Decode for IntegerReply {
    type Output = i64;

    fn shape(&self) -> ResultShape {
        ResultShape::Integer
    }

    fn decode(&self, reply: RespValue) -> Result<i64, DecodeError> {
        match reply {
            RespValue::Integer(i) => Ok(i),
            other => Err(self.mismatch(&other)),
        }
    }
}

/// A numeric bulk string, or a RESP3 double
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleReply;

impl Decode for DoubleReply {
    type Output = f64;

    fn shape(&self) -> ResultShape {
        ResultShape::Double
    }

    fn decode(&self, reply: RespValue) -> Result<f64, DecodeError> {
        match reply {
            RespValue::Double(d) => Ok(d),
            RespValue::BulkString(Some(data)) => std::str::from_utf8(&data)
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| {
                    DecodeError::new(
                        self.shape(),
                        format!("non-numeric bulk string {:?}", String::from_utf8_lossy(&data)),
                    )
                }),
            other => Err(self.mismatch(&other)),
        }
    }
}

/// A bulk string read into `T`
#[derive(Debug, Clone, Copy)]
pub struct BulkReply<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BulkReply<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for BulkReply<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FromBulk> Decode for BulkReply<T> {
    type Output = T;

    fn shape(&self) -> ResultShape {
        ResultShape::BulkString
    }

    fn decode(&self, reply: RespValue) -> Result<T, DecodeError> {
        let data = match reply {
            RespValue::BulkString(Some(data)) => data,
            RespValue::SimpleString(s) => s.into_bytes(),
            other => return Err(self.mismatch(&other)),
        };
        T::from_bulk(data).ok_or_else(|| DecodeError::new(self.shape(), "bulk string that is not valid UTF-8"))
    }
}

/// Every element decoded with the inner decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayOf<D>(pub D);

impl<D: Decode> Decode for ArrayOf<D> {
    type Output = Vec<D::Output>;

    fn shape(&self) -> ResultShape {
        ResultShape::Array(Box::new(self.0.shape()))
    }

    fn decode(&self, reply: RespValue) -> Result<Self::Output, DecodeError> {
        match reply {
            RespValue::Array(Some(items)) => items.into_iter().map(|item| self.0.decode(item)).collect(),
            other => Err(self.mismatch(&other)),
        }
    }
}

/// Null (of any encoding) becomes `None`, distinct from an empty array or
/// an empty string, which decode through the inner decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Optional<D>(pub D);

impl<D: Decode> Decode for Optional<D> {
    type Output = Option<D::Output>;

    fn shape(&self) -> ResultShape {
        ResultShape::Optional(Box::new(self.0.shape()))
    }

    fn decode(&self, reply: RespValue) -> Result<Self::Output, DecodeError> {
        if reply.is_null() {
            return Ok(None);
        }
        self.0.decode(reply).map(Some)
    }
}

/// The reply untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct RawReply;

impl Decode for RawReply {
    type Output = RespValue;

    fn shape(&self) -> ResultShape {
        ResultShape::Raw
    }

    fn decode(&self, reply: RespValue) -> Result<RespValue, DecodeError> {
        Ok(reply)
    }
}

pub type NullableDouble = Optional<DoubleReply>;
pub type OptionalString<T = String> = Optional<BulkReply<T>>;
