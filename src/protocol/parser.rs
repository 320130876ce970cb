//! Incremental RESP Reply Parser
//!
//! TCP is a byte stream, so a reply may arrive split across several reads or
//! share a read with the next reply. The parser therefore works on whatever
//! is buffered and reports one of:
//!
//! - `Ok(Some((value, consumed)))` - a full frame; drop `consumed` bytes
//! - `Ok(None)` - the frame is incomplete, read more and retry
//! - `Err(ParseError)` - the stream is corrupt and the connection unusable

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use std::num::ParseIntError;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("unknown type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Negative length other than the -1 null marker
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

/// A stateless RESP parser.
///
/// # Example
///
/// ```
/// use phonebook::protocol::{RespParser, RespValue};
///
/// let parser = RespParser::new();
/// let (value, consumed) = parser.parse(b"$5\r\nParis\r\n").unwrap().unwrap();
/// assert_eq!(value, RespValue::bulk_string("Paris"));
/// assert_eq!(consumed, 11);
///
/// assert!(parser.parse(b"$5\r\nPar").unwrap().is_none());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct RespParser;

type Parsed = Option<(RespValue, usize)>;

impl RespParser {
    pub fn new() -> Self {
        Self
    }

    /// Attempts to parse one frame from the front of `buf`.
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Parsed> {
        self.parse_value(buf, 0)
    }

    fn parse_value(&self, buf: &[u8], depth: usize) -> ParseResult<Parsed> {
        if buf.is_empty() {
            return Ok(None);
        }

        if depth > MAX_NESTING_DEPTH {
            return Err(ParseError::ProtocolError(format!(
                "maximum nesting depth exceeded: {}",
                MAX_NESTING_DEPTH
            )));
        }

        match buf[0] {
            prefix::SIMPLE_STRING => Ok(read_line(buf)?
                .map(|(line, consumed)| (RespValue::SimpleString(line.to_string()), consumed))),
            prefix::ERROR => Ok(read_line(buf)?
                .map(|(line, consumed)| (RespValue::Error(line.to_string()), consumed))),
            prefix::INTEGER => match read_line(buf)? {
                Some((line, consumed)) => Ok(Some((RespValue::Integer(parse_int(line)?), consumed))),
                None => Ok(None),
            },
            prefix::BULK_STRING => self.parse_bulk_string(buf),
            prefix::ARRAY => self.parse_array(buf, depth),
            other => Err(ParseError::UnknownPrefix(other)),
        }
    }

    /// `$<length>\r\n<data>\r\n`
    fn parse_bulk_string(&self, buf: &[u8]) -> ParseResult<Parsed> {
        let (length, header) = match read_line(buf)? {
            Some((line, consumed)) => (parse_int(line)?, consumed),
            None => return Ok(None),
        };

        if length == -1 {
            return Ok(Some((RespValue::Null, header)));
        }
        if length < 0 {
            return Err(ParseError::InvalidBulkLength(length));
        }

        let length = length as usize;
        if length > MAX_BULK_SIZE {
            return Err(ParseError::MessageTooLarge {
                size: length,
                max: MAX_BULK_SIZE,
            });
        }

        let total = header + length + CRLF.len();
        if buf.len() < total {
            return Ok(None);
        }

        if &buf[header + length..total] != CRLF {
            return Err(ParseError::ProtocolError(
                "bulk string missing trailing CRLF".to_string(),
            ));
        }

        let data = Bytes::copy_from_slice(&buf[header..header + length]);
        Ok(Some((RespValue::BulkString(data), total)))
    }

    /// `*<count>\r\n<elements...>`
    fn parse_array(&self, buf: &[u8], depth: usize) -> ParseResult<Parsed> {
        let (count, mut consumed) = match read_line(buf)? {
            Some((line, consumed)) => (parse_int(line)?, consumed),
            None => return Ok(None),
        };

        if count == -1 {
            return Ok(Some((RespValue::Null, consumed)));
        }
        if count < 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }

        let mut elements = Vec::with_capacity((count as usize).min(64));
        for _ in 0..count {
            match self.parse_value(&buf[consumed..], depth + 1)? {
                Some((value, used)) => {
                    elements.push(value);
                    consumed += used;
                }
                None => return Ok(None),
            }
        }

        Ok(Some((RespValue::Array(elements), consumed)))
    }
}

/// Reads the line after the type prefix. Returns the line (without prefix or
/// CRLF) and the number of bytes it occupies including both.
fn read_line(buf: &[u8]) -> ParseResult<Option<(&str, usize)>> {
    match find_crlf(&buf[1..]) {
        Some(pos) => {
            let line = std::str::from_utf8(&buf[1..1 + pos])
                .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
            Ok(Some((line, 1 + pos + CRLF.len())))
        }
        None => Ok(None),
    }
}

fn parse_int(line: &str) -> ParseResult<i64> {
    line.parse()
        .map_err(|e: ParseIntError| ParseError::InvalidInteger(e.to_string()))
}

/// Position of the first `\r\n`, pointing at the `\r`.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Parses a single frame with a fresh parser.
pub fn parse_message(buf: &[u8]) -> ParseResult<Parsed> {
    RespParser::new().parse(buf)
}
