//! Backend Connection
//!
//! One TCP connection to the key-value backend. A connection runs strictly
//! one command at a time: write the request, then read exactly one reply.
//!
//! ## Reply Buffering
//!
//! Replies are accumulated in a `BytesMut` and handed to the parser until a
//! complete frame is available, because a reply may arrive over several
//! reads.

use crate::protocol::{RespParser, RespValue};
use crate::store::{StoreError, StoreResult};
use bytes::{Buf, BytesMut};
use std::fmt;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Initial capacity of the reply buffer
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Where the backend lives and how to log in.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Logical database index, selected right after connecting when non-zero
    pub db: u32,
    pub password: Option<String>,
    pub connect_timeout: Duration,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            db: 0,
            password: None,
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_db(mut self, db: u32) -> Self {
        self.db = db;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// `host:port`, as passed to `TcpStream::connect`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// The password never reaches logs.
impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db", &self.db)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// A single authenticated connection to the backend.
pub struct Connection {
    stream: BufWriter<TcpStream>,
    buffer: BytesMut,
    parser: RespParser,
    /// Reused serialization buffer for outgoing commands
    out: Vec<u8>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.stream.get_ref().peer_addr().ok())
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

impl Connection {
    /// Dials the endpoint, then runs `AUTH` and `SELECT` as configured.
    pub async fn open(endpoint: &Endpoint) -> StoreResult<Self> {
        let stream = tokio::time::timeout(
            endpoint.connect_timeout,
            TcpStream::connect(endpoint.address()),
        )
        .await
        .map_err(|_| StoreError::ConnectTimeout(endpoint.to_string()))??;
        stream.set_nodelay(true)?;

        let mut conn = Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            parser: RespParser::new(),
            out: Vec::with_capacity(256),
        };

        if let Some(password) = &endpoint.password {
            conn.expect_ok("AUTH", &RespValue::command(["AUTH", password.as_str()]))
                .await?;
        }

        if endpoint.db != 0 {
            let db = endpoint.db.to_string();
            conn.expect_ok("SELECT", &RespValue::command(["SELECT", db.as_str()]))
                .await?;
        }

        debug!(endpoint = %endpoint, "Opened backend connection");
        Ok(conn)
    }

    /// Sends one command and waits for its reply.
    ///
    /// An error reply from the backend becomes [`StoreError::Backend`]; the
    /// connection stays usable in that case.
    pub async fn execute(&mut self, command: &RespValue) -> StoreResult<RespValue> {
        self.send(command).await?;
        match self.read_reply().await? {
            RespValue::Error(message) => Err(StoreError::Backend(message)),
            reply => Ok(reply),
        }
    }

    /// Whether an idle connection can no longer be used: the backend hung
    /// up, the socket failed, or bytes arrived that no command asked for.
    ///
    /// Never blocks. Relies on the runtime having seen the socket's latest
    /// readiness.
    pub fn is_stale(&self) -> bool {
        if !self.buffer.is_empty() {
            return true;
        }

        let mut probe = [0u8; 1];
        match self.stream.get_ref().try_read(&mut probe) {
            Ok(_) => true,
            Err(e) => e.kind() != io::ErrorKind::WouldBlock,
        }
    }

    async fn expect_ok(&mut self, name: &'static str, command: &RespValue) -> StoreResult<()> {
        let reply = self.execute(command).await?;
        if reply.is_ok() {
            Ok(())
        } else {
            Err(StoreError::UnexpectedReply {
                command: name,
                reply: reply.kind(),
            })
        }
    }

    async fn send(&mut self, command: &RespValue) -> StoreResult<()> {
        self.out.clear();
        command.serialize_into(&mut self.out);
        self.stream.write_all(&self.out).await?;
        self.stream.flush().await?;
        trace!(bytes = self.out.len(), "Sent command");
        Ok(())
    }

    async fn read_reply(&mut self) -> StoreResult<RespValue> {
        loop {
            if let Some((value, consumed)) = self.parser.parse(&self.buffer)? {
                self.buffer.advance(consumed);
                return Ok(value);
            }

            if self.buffer.capacity() - self.buffer.len() < 1024 {
                self.buffer.reserve(INITIAL_BUFFER_SIZE);
            }

            let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(StoreError::ConnectionClosed);
            }
            trace!(bytes = n, buffered = self.buffer.len(), "Read reply data");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::TestBackend;

    #[test]
    fn test_endpoint_display_hides_password() {
        let endpoint = Endpoint::new("cache.internal", 6380)
            .with_db(2)
            .with_password("hunter2");

        assert_eq!(endpoint.to_string(), "redis://cache.internal:6380/2");
        assert_eq!(endpoint.address(), "cache.internal:6380");
        assert!(!format!("{:?}", endpoint).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_execute_round_trip() {
        let backend = TestBackend::spawn().await;
        let mut conn = Connection::open(&backend.endpoint()).await.unwrap();

        let reply = conn
            .execute(&RespValue::command(["SET", "k", "v", "NX"]))
            .await
            .unwrap();
        assert!(reply.is_ok());

        let reply = conn.execute(&RespValue::command(["GET", "k"])).await.unwrap();
        assert_eq!(reply, RespValue::bulk_string("v"));
    }

    #[tokio::test]
    async fn test_error_reply_keeps_connection_usable() {
        let backend = TestBackend::spawn().await;
        let mut conn = Connection::open(&backend.endpoint()).await.unwrap();

        let err = conn
            .execute(&RespValue::command(["FROB", "k"]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(ref m) if m.starts_with("ERR unknown command")));
        assert!(!err.is_connection_fatal());

        let reply = conn.execute(&RespValue::command(["PING"])).await.unwrap();
        assert_eq!(reply, RespValue::simple_string("PONG"));
    }

    #[tokio::test]
    async fn test_auth_and_select() {
        let backend = TestBackend::spawn_with_password("s3cret").await;

        let endpoint = backend.endpoint().with_password("s3cret").with_db(3);
        let mut conn = Connection::open(&endpoint).await.unwrap();
        conn.execute(&RespValue::command(["PING"])).await.unwrap();
        assert_eq!(backend.selected_db(), 3);

        let wrong = backend.endpoint().with_password("nope");
        let err = Connection::open(&wrong).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(ref m) if m.starts_with("WRONGPASS")));
    }

    #[tokio::test]
    async fn test_missing_auth_is_rejected() {
        let backend = TestBackend::spawn_with_password("s3cret").await;
        let mut conn = Connection::open(&backend.endpoint()).await.unwrap();

        let err = conn
            .execute(&RespValue::command(["GET", "k"]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(ref m) if m.starts_with("NOAUTH")));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = Connection::open(&Endpoint::new("127.0.0.1", port))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(err.is_connection_fatal());
    }
}
