// Protocol module - RESP reply parser and request serializer

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::io::Cursor;
use thiserror::Error;

pub mod parser;
pub mod serializer;

pub use parser::RespParser;
pub use serializer::RespSerializer;

/// A reply as it arrives on the wire, before any semantic typing.
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// Simple string: +OK\r\n
    SimpleString(String),
    /// Error: -ERR unknown command\r\n
    Error(String),
    /// Integer: :1000\r\n
    Integer(i64),
    /// Bulk string: $6\r\nfoobar\r\n (None for null bulk string)
    BulkString(Option<Vec<u8>>),
    /// Array: *2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n (None for null array)
    Array(Option<Vec<RespValue>>),
    /// Null (RESP3)
    Null,
    /// Boolean (RESP3)
    Boolean(bool),
    /// Double (RESP3)
    Double(f64),
}

impl RespValue {
    /// Build a bulk string reply from anything byte-like
    pub fn bulk(data: impl AsRef<[u8]>) -> Self {
        RespValue::BulkString(Some(data.as_ref().to_vec()))
    }

    /// Build a non-null array reply
    pub fn array(items: Vec<RespValue>) -> Self {
        RespValue::Array(Some(items))
    }

    pub fn as_simple_string(&self) -> Option<&str> {
        match self {
            RespValue::SimpleString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bulk_string(&self) -> Option<&[u8]> {
        match self {
            RespValue::BulkString(Some(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RespValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(Some(arr)) => Some(arr),
            _ => None,
        }
    }

    /// True for every null encoding: RESP3 null, null bulk string and null array
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            RespValue::Null | RespValue::BulkString(None) | RespValue::Array(None)
        )
    }

    /// Short name of the wire type, used in decode error messages
    pub fn kind(&self) -> &'static str {
        match self {
            RespValue::SimpleString(_) => "simple string",
            RespValue::Error(_) => "error",
            RespValue::Integer(_) => "integer",
            RespValue::BulkString(Some(_)) => "bulk string",
            RespValue::BulkString(None) => "null bulk string",
            RespValue::Array(Some(_)) => "array",
            RespValue::Array(None) => "null array",
            RespValue::Null => "null",
            RespValue::Boolean(_) => "boolean",
            RespValue::Double(_) => "double",
        }
    }
}

/// JSON-friendly view of a reply: nulls become `null`, bulk strings become
/// text when they are UTF-8 and byte arrays otherwise, errors become
/// `{"error": message}`.
impl Serialize for RespValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            RespValue::SimpleString(s) => serializer.serialize_str(s),
            RespValue::Error(message) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", message)?;
                map.end()
            }
            RespValue::Integer(i) => serializer.serialize_i64(*i),
            RespValue::BulkString(Some(data)) => match std::str::from_utf8(data) {
                Ok(text) => serializer.serialize_str(text),
                Err(_) => data.serialize(serializer),
            },
            RespValue::Array(Some(items)) => items.serialize(serializer),
            RespValue::BulkString(None) | RespValue::Array(None) | RespValue::Null => serializer.serialize_unit(),
            RespValue::Boolean(b) => serializer.serialize_bool(*b),
            RespValue::Double(d) => serializer.serialize_f64(*d),
        }
    }
}

#[derive(Error, Debug)]
pub enum RespError {
    #[error("Incomplete data")]
    Incomplete,

    #[error("Invalid protocol: {0}")]
    InvalidProtocol(String),

    #[error("Invalid integer: {0}")]
    InvalidInteger(String),

    #[error("Invalid bulk string length")]
    InvalidBulkStringLength,

    #[error("Invalid array length")]
    InvalidArrayLength,

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("UTF-8 str error: {0}")]
    Utf8Str(#[from] std::str::Utf8Error),
}

pub type Result<T> = std::result::Result<T, RespError>;

/// Find CRLF in buffer
pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Read a CRLF-terminated line from cursor
pub(crate) fn read_line<'a>(cursor: &mut Cursor<&'a [u8]>) -> Result<&'a [u8]> {
    let start = cursor.position() as usize;
    let slice = &cursor.get_ref()[start..];

    let end = find_crlf(slice).ok_or(RespError::Incomplete)?;

    cursor.set_position((start + end + 2) as u64);
    Ok(&slice[..end])
}

pub(crate) fn parse_integer(buf: &[u8]) -> Result<i64> {
    let s = std::str::from_utf8(buf)
        .map_err(|_| RespError::InvalidInteger("Invalid UTF-8".to_string()))?;
    s.parse::<i64>()
        .map_err(|_| RespError::InvalidInteger(s.to_string()))
}
