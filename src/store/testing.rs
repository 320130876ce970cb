//! A tiny RESP server for exercising the Redis client in tests.
//!
//! Understands `PING`, `AUTH`, `SELECT`, `GET`, `SET key value [NX|XX]` and
//! `DEL`, which is everything the service sends.

use crate::protocol::{RespParser, RespValue};
use crate::store::Endpoint;
use bytes::{Buf, BytesMut};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
struct Shared {
    data: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
    password: Option<String>,
    accepted: AtomicU64,
    selected_db: AtomicU32,
}

pub(crate) struct TestBackend {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl TestBackend {
    pub(crate) async fn spawn() -> Self {
        Self::start(None).await
    }

    pub(crate) async fn spawn_with_password(password: &str) -> Self {
        Self::start(Some(password.to_string())).await
    }

    async fn start(password: Option<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Arc::new(Shared {
            password,
            ..Default::default()
        });

        let server = Arc::clone(&shared);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                server.accepted.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(stream, Arc::clone(&server)));
            }
        });

        Self { addr, shared }
    }

    pub(crate) fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.addr.ip().to_string(), self.addr.port())
    }

    /// Connections accepted so far.
    pub(crate) fn accepted(&self) -> u64 {
        self.shared.accepted.load(Ordering::SeqCst)
    }

    pub(crate) fn selected_db(&self) -> u32 {
        self.shared.selected_db.load(Ordering::SeqCst)
    }

    pub(crate) fn value(&self, key: &str) -> Option<String> {
        self.shared
            .data
            .lock()
            .unwrap()
            .get(key.as_bytes())
            .map(|v| String::from_utf8(v.clone()).unwrap())
    }
}

async fn serve(mut stream: TcpStream, shared: Arc<Shared>) {
    let parser = RespParser::new();
    let mut buffer = BytesMut::with_capacity(1024);
    let mut authed = shared.password.is_none();

    loop {
        while let Ok(Some((frame, consumed))) = parser.parse(&buffer) {
            buffer.advance(consumed);
            let reply = dispatch(frame, &shared, &mut authed);
            if stream.write_all(&reply.serialize()).await.is_err() {
                return;
            }
        }

        match stream.read_buf(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

fn dispatch(frame: RespValue, shared: &Shared, authed: &mut bool) -> RespValue {
    let args: Vec<Vec<u8>> = match frame {
        RespValue::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                RespValue::BulkString(b) => Some(b.to_vec()),
                _ => None,
            })
            .collect(),
        _ => return RespValue::error("ERR expected array"),
    };
    let name = String::from_utf8_lossy(&args[0]).to_uppercase();

    if name == "AUTH" {
        return match &shared.password {
            Some(p) if p.as_bytes() == args[1].as_slice() => {
                *authed = true;
                RespValue::ok()
            }
            _ => RespValue::error("WRONGPASS invalid username-password pair"),
        };
    }
    if !*authed {
        return RespValue::error("NOAUTH Authentication required.");
    }

    let mut data = shared.data.lock().unwrap();
    match name.as_str() {
        "PING" => RespValue::simple_string("PONG"),
        "SELECT" => {
            let db = String::from_utf8_lossy(&args[1]).parse().unwrap();
            shared.selected_db.store(db, Ordering::SeqCst);
            RespValue::ok()
        }
        "GET" => match data.get(&args[1]) {
            Some(v) => RespValue::bulk_string(v.clone()),
            None => RespValue::Null,
        },
        "SET" => {
            let exists = data.contains_key(&args[1]);
            let mode = args.get(3).map(|m| String::from_utf8_lossy(m).to_uppercase());
            match mode.as_deref() {
                Some("NX") if exists => return RespValue::Null,
                Some("XX") if !exists => return RespValue::Null,
                _ => {}
            }
            data.insert(args[1].clone(), args[2].clone());
            RespValue::ok()
        }
        "DEL" => RespValue::Integer(data.remove(&args[1]).map_or(0, |_| 1)),
        _ => RespValue::error(format!("ERR unknown command '{}'", name.to_lowercase())),
    }
}
