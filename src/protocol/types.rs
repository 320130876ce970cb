//! RESP Values
//!
//! The backend speaks RESP2. Requests are always arrays of bulk strings;
//! replies can be any of the types below.
//!
//! ## Wire Format
//!
//! - `+` Simple String: `+OK\r\n`
//! - `-` Error: `-ERR syntax error\r\n`
//! - `:` Integer: `:1\r\n`
//! - `$` Bulk String: `$5\r\nParis\r\n`, null as `$-1\r\n`
//! - `*` Array: `*2\r\n$3\r\nGET\r\n$11\r\n88005553535\r\n`, null as `*-1\r\n`

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A single RESP frame, either a command we send or a reply we receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// `+<string>\r\n`
    SimpleString(String),

    /// `-<message>\r\n`, a command-level failure reported by the backend
    Error(String),

    /// `:<integer>\r\n`
    Integer(i64),

    /// `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// Null bulk string or null array. `GET` on a missing key and a
    /// conditional `SET` that did not write both reply with this.
    Null,

    /// `*<count>\r\n<element>...`
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Builds a command frame: an array of bulk strings.
    ///
    /// # Example
    /// ```
    /// use phonebook::protocol::RespValue;
    ///
    /// let cmd = RespValue::command(["SET", "88005553535", "Paris, France", "XX"]);
    /// assert!(cmd.serialize().starts_with(b"*4\r\n$3\r\nSET\r\n"));
    /// ```
    pub fn command<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        RespValue::Array(
            parts
                .into_iter()
                .map(|p| RespValue::BulkString(Bytes::copy_from_slice(p.as_ref())))
                .collect(),
        )
    }

    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    /// `+OK`
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    /// Serializes the frame to its wire representation.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes into an existing buffer, so a connection can reuse one
    /// allocation across commands.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::BulkString(data) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Null => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            RespValue::Array(values) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(values.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null)
    }

    /// True for `+OK`.
    pub fn is_ok(&self) -> bool {
        matches!(self, RespValue::SimpleString(s) if s == "OK")
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RespValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Short name of the frame type, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RespValue::SimpleString(_) => "simple string",
            RespValue::Error(_) => "error",
            RespValue::Integer(_) => "integer",
            RespValue::BulkString(_) => "bulk string",
            RespValue::Null => "null",
            RespValue::Array(_) => "array",
        }
    }
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "\"{}\"", s),
            RespValue::Error(s) => write!(f, "(error) {}", s),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::BulkString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            RespValue::Null => write!(f, "(nil)"),
            RespValue::Array(values) => write!(f, "(array of {})", values.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serialize() {
        let cmd = RespValue::command(["GET", "88005553535"]);
        assert_eq!(cmd.serialize(), b"*2\r\n$3\r\nGET\r\n$11\r\n88005553535\r\n");
    }

    #[test]
    fn test_conditional_set_serialize() {
        let cmd = RespValue::command(["SET", "+15550001", "Paris, France", "NX"]);
        assert_eq!(
            cmd.serialize(),
            b"*4\r\n$3\r\nSET\r\n$9\r\n+15550001\r\n$13\r\nParis, France\r\n$2\r\nNX\r\n"
        );
    }

    #[test]
    fn test_command_is_binary_safe() {
        // Addresses may contain CRLF; bulk strings carry them verbatim.
        let cmd = RespValue::command(["SET", "k", "a\r\nb"]);
        assert_eq!(cmd.serialize(), b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$4\r\na\r\nb\r\n");
    }

    #[test]
    fn test_null_serialize() {
        assert_eq!(RespValue::Null.serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_reply_helpers() {
        assert!(RespValue::ok().is_ok());
        assert!(!RespValue::simple_string("PONG").is_ok());
        assert!(RespValue::Null.is_null());
        assert_eq!(RespValue::Integer(1).as_integer(), Some(1));
        assert_eq!(RespValue::error("ERR").kind(), "error");
    }
}
