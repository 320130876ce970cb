//! RESP Protocol Implementation
//!
//! The client side of the Redis Serialization Protocol: enough to send
//! commands to a Redis-compatible backend and read its replies.
//!
//! ## Modules
//!
//! - `types`: the `RespValue` frame and its serialization
//! - `parser`: incremental parser for replies arriving on a socket
//!
//! ## Example
//!
//! ```
//! use phonebook::protocol::{parse_message, RespValue};
//!
//! let request = RespValue::command(["GET", "88005553535"]).serialize();
//! assert_eq!(&request[..4], b"*2\r\n");
//!
//! let (reply, _) = parse_message(b"$-1\r\n").unwrap().unwrap();
//! assert!(reply.is_null());
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_message, ParseError, ParseResult, RespParser};
pub use types::RespValue;
