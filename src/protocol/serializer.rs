// RESP serializer
//
// Requests go out as arrays of bulk strings. Full value serialization is kept
// for tooling and for the in-memory servers used by the tests.

use super::RespValue;
use crate::command::Command;
use bytes::{BufMut, BytesMut};

pub struct RespSerializer;

impl RespSerializer {
    /// Append a command to `buf` as `*N\r\n$len\r\ntoken\r\n...`
    pub fn encode_command(command: &Command, buf: &mut BytesMut) {
        let tokens = command.tokens();
        buf.reserve(command.encoded_len());
        Self::write_header(buf, b'*', tokens.len());
        for token in tokens {
            Self::write_header(buf, b'$', token.len());
            buf.put_slice(token);
            buf.put_slice(b"\r\n");
        }
    }

    /// Serialize a command into a fresh buffer
    pub fn command(command: &Command) -> BytesMut {
        let mut buf = BytesMut::with_capacity(command.encoded_len());
        Self::encode_command(command, &mut buf);
        buf
    }

    /// Serialize any RESP value to bytes
    pub fn serialize(value: &RespValue) -> Vec<u8> {
        let mut buf = BytesMut::new();
        Self::write_value(&mut buf, value);
        buf.to_vec()
    }

    fn write_header(buf: &mut BytesMut, prefix: u8, len: usize) {
        buf.put_u8(prefix);
        buf.put_slice(len.to_string().as_bytes());
        buf.put_slice(b"\r\n");
    }

    fn write_value(buf: &mut BytesMut, value: &RespValue) {
        match value {
            RespValue::SimpleString(s) => {
                buf.put_u8(b'+');
                buf.put_slice(s.as_bytes());
                buf.put_slice(b"\r\n");
            }
            RespValue::Error(e) => {
                buf.put_u8(b'-');
                buf.put_slice(e.as_bytes());
                buf.put_slice(b"\r\n");
            }
            RespValue::Integer(i) => {
                buf.put_u8(b':');
                buf.put_slice(i.to_string().as_bytes());
                buf.put_slice(b"\r\n");
            }
            RespValue::BulkString(None) => buf.put_slice(b"$-1\r\n"),
            RespValue::BulkString(Some(data)) => {
                Self::write_header(buf, b'$', data.len());
                buf.put_slice(data);
                buf.put_slice(b"\r\n");
            }
            RespValue::Array(None) => buf.put_slice(b"*-1\r\n"),
            RespValue::Array(Some(arr)) => {
                Self::write_header(buf, b'*', arr.len());
                for item in arr {
                    Self::write_value(buf, item);
                }
            }
            RespValue::Null => buf.put_slice(b"_\r\n"),
            RespValue::Boolean(b) => {
                buf.put_u8(b'#');
                buf.put_u8(if *b { b't' } else { b'f' });
                buf.put_slice(b"\r\n");
            }
            RespValue::Double(d) => {
                buf.put_u8(b',');
                if d.is_infinite() {
                    buf.put_slice(if *d > 0.0 { &b"inf"[..] } else { &b"-inf"[..] });
                } else {
                    buf.put_slice(d.to_string().as_bytes());
                }
                buf.put_slice(b"\r\n");
            }
        }
    }
}
