// RESP reply parser

use super::{parse_integer, read_line, RespError, RespValue, Result};
use bytes::{Buf, BytesMut};
use std::io::Cursor;

/// Deepest array nesting accepted in one reply. GEO replies nest three deep.
pub const MAX_NESTING_DEPTH: usize = 128;

pub struct RespParser;

impl RespParser {
    /// Parse one complete RESP value from the start of `buf`
    pub fn parse(buf: &[u8]) -> Result<RespValue> {
        let mut cursor = Cursor::new(buf);
        Self::parse_value(&mut cursor, 0)
    }

    /// Take one complete reply off the front of a read buffer.
    ///
    /// Returns `Ok(None)` and leaves the buffer untouched when more bytes are
    /// needed; on success the consumed bytes are removed from `buf`.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<RespValue>> {
        let Some(len) = Self::check_complete(buf)? else {
            return Ok(None);
        };

        let value = Self::parse(&buf[..len])?;
        buf.advance(len);
        Ok(Some(value))
    }

    /// Length of the first complete value in `buf`, found without building it
    pub fn check_complete(buf: &[u8]) -> Result<Option<usize>> {
        let mut cursor = Cursor::new(buf);
        match Self::skip_value(&mut cursor, 0) {
            Ok(()) => Ok(Some(cursor.position() as usize)),
            Err(RespError::Incomplete) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn type_byte(cursor: &mut Cursor<&[u8]>) -> Result<u8> {
        let pos = cursor.position() as usize;
        let byte = *cursor.get_ref().get(pos).ok_or(RespError::Incomplete)?;
        cursor.set_position(pos as u64 + 1);
        Ok(byte)
    }

    fn enter(depth: usize) -> Result<usize> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(RespError::InvalidProtocol(format!(
                "Arrays nested deeper than {}",
                MAX_NESTING_DEPTH
            )));
        }
        Ok(depth + 1)
    }

    fn skip_value(cursor: &mut Cursor<&[u8]>, depth: usize) -> Result<()> {
        match Self::type_byte(cursor)? {
            b'+' | b'-' | b':' | b'_' | b'#' | b',' => {
                read_line(cursor)?;
            }
            b'$' => {
                if let Some(end) = Self::bulk_end(cursor)? {
                    cursor.set_position((end + 2) as u64);
                }
            }
            b'*' => {
                let depth = Self::enter(depth)?;
                if let Some(len) = Self::array_len(cursor)? {
                    for _ in 0..len {
                        Self::skip_value(cursor, depth)?;
                    }
                }
            }
            other => {
                return Err(RespError::InvalidProtocol(format!(
                    "Unknown type byte: {}",
                    other as char
                )))
            }
        }
        Ok(())
    }

    fn parse_value(cursor: &mut Cursor<&[u8]>, depth: usize) -> Result<RespValue> {
        let type_byte = Self::type_byte(cursor)?;

        match type_byte {
            b'+' => Self::parse_simple_string(cursor),
            b'-' => Self::parse_error(cursor),
            b':' => Self::parse_integer(cursor),
            b'$' => Self::parse_bulk_string(cursor),
            b'*' => Self::parse_array(cursor, depth),
            b'_' => {
                let _ = read_line(cursor)?;
                Ok(RespValue::Null)
            }
            b'#' => {
                let line = read_line(cursor)?;
                match line {
                    b"t" => Ok(RespValue::Boolean(true)),
                    b"f" => Ok(RespValue::Boolean(false)),
                    _ => Err(RespError::InvalidProtocol(
                        "Invalid boolean value".to_string(),
                    )),
                }
            }
            b',' => {
                let line = read_line(cursor)?;
                let s = std::str::from_utf8(line)?;
                let val = parse_resp3_double(s)
                    .ok_or_else(|| RespError::InvalidProtocol(format!("Invalid double: {}", s)))?;
                Ok(RespValue::Double(val))
            }
            _ => Err(RespError::InvalidProtocol(format!(
                "Unknown type byte: {}",
                type_byte as char
            ))),
        }
    }

    fn parse_simple_string(cursor: &mut Cursor<&[u8]>) -> Result<RespValue> {
        let line = read_line(cursor)?;
        let s = String::from_utf8(line.to_vec())?;
        Ok(RespValue::SimpleString(s))
    }

    fn parse_error(cursor: &mut Cursor<&[u8]>) -> Result<RespValue> {
        let line = read_line(cursor)?;
        Ok(RespValue::Error(String::from_utf8_lossy(line).into_owned()))
    }

    fn parse_integer(cursor: &mut Cursor<&[u8]>) -> Result<RespValue> {
        let line = read_line(cursor)?;
        let i = parse_integer(line)?;
        Ok(RespValue::Integer(i))
    }

    /// End offset of a bulk payload, `None` for the null bulk string.
    /// The trailing CRLF is checked but not consumed.
    fn bulk_end(cursor: &mut Cursor<&[u8]>) -> Result<Option<usize>> {
        let line = read_line(cursor)?;
        let len = parse_integer(line)?;

        if len == -1 {
            return Ok(None);
        }

        if len < -1 {
            return Err(RespError::InvalidBulkStringLength);
        }

        let start = cursor.position() as usize;
        let end = start
            .checked_add(len as usize)
            .filter(|end| *end <= usize::MAX - 2)
            .ok_or(RespError::InvalidBulkStringLength)?;

        if end + 2 > cursor.get_ref().len() {
            return Err(RespError::Incomplete);
        }

        if cursor.get_ref()[end..end + 2] != *b"\r\n" {
            return Err(RespError::InvalidProtocol(
                "Missing CRLF after bulk string".to_string(),
            ));
        }

        Ok(Some(end))
    }

    /// $6\r\nfoobar\r\n or $-1\r\n (null)
    fn parse_bulk_string(cursor: &mut Cursor<&[u8]>) -> Result<RespValue> {
        let Some(end) = Self::bulk_end(cursor)? else {
            return Ok(RespValue::BulkString(None));
        };

        let start = cursor.position() as usize;
        let data = cursor.get_ref()[start..end].to_vec();
        cursor.set_position((end + 2) as u64);

        Ok(RespValue::BulkString(Some(data)))
    }

    /// Element count, `None` for the null array
    fn array_len(cursor: &mut Cursor<&[u8]>) -> Result<Option<usize>> {
        let line = read_line(cursor)?;
        let len = parse_integer(line)?;

        match len {
            -1 => Ok(None),
            len if len < -1 => Err(RespError::InvalidArrayLength),
            len => Ok(Some(len as usize)),
        }
    }

    /// *2\r\n...\r\n or *-1\r\n (null)
    fn parse_array(cursor: &mut Cursor<&[u8]>, depth: usize) -> Result<RespValue> {
        let depth = Self::enter(depth)?;
        let Some(len) = Self::array_len(cursor)? else {
            return Ok(RespValue::Array(None));
        };

        // A hostile length must not drive the allocation; every element takes
        // at least three bytes on the wire.
        let remaining = cursor.get_ref().len() - cursor.position() as usize;
        let mut arr = Vec::with_capacity(len.min(remaining / 3 + 1));

        for _ in 0..len {
            let value = Self::parse_value(cursor, depth)?;
            arr.push(value);
        }

        Ok(RespValue::Array(Some(arr)))
    }
}

/// RESP3 doubles spell infinities as `inf`/`-inf`
fn parse_resp3_double(s: &str) -> Option<f64> {
    match s {
        "inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        _ => s.parse::<f64>().ok(),
    }
}
