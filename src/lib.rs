//! # Phonebook - A Phone-to-Address Record Service
//!
//! A small HTTP service that stores one postal address per phone number in a
//! Redis-compatible key-value backend.
//!
//! ## Features
//!
//! - **Race-Free Writes**: create and update are single conditional `SET`s
//!   (`NX` / `XX`), so concurrent requests never need a lock
//! - **Pooled Backend Connections**: a bounded pool with RAII checkouts
//! - **Built-In RESP Client**: no external Redis driver
//! - **Swappable Storage**: an in-process backend for development and tests
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                            Phonebook                              │
//! │                                                                   │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────────┐   │
//! │  │ HTTP Server │───>│  Handlers   │───>│  RecordStore trait   │   │
//! │  │   (axum)    │    │ + validation│    └──────────┬───────────┘   │
//! │  └─────────────┘    └─────────────┘               │               │
//! │                                        ┌──────────┴──────────┐    │
//! │                                        ▼                     ▼    │
//! │                              ┌──────────────────┐  ┌────────────┐ │
//! │                              │    RedisStore    │  │MemoryStore │ │
//! │                              │ Pool ─> RESP I/O │  │  (shards)  │ │
//! │                              └────────┬─────────┘  └────────────┘ │
//! └───────────────────────────────────────┼───────────────────────────┘
//!                                         ▼
//!                                 Redis-compatible backend
//! ```
//!
//! ## HTTP Interface
//!
//! - `GET /phones/{phone}` returns `{phone, address}` or 404
//! - `POST /phones` creates a record: 201, or 409 if the phone exists
//! - `PUT /phones/{phone}` replaces the address: 200, or 404
//! - `DELETE /phones/{phone}` removes the record: 204, or 404
//! - `GET /health` pings the backend: 200, or 503
//!
//! Invalid input answers 422 before the backend is touched; backend failures
//! answer 503.
//!
//! ## Quick Start
//!
//! ```ignore
//! use phonebook::store::{Endpoint, RedisStore};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(RedisStore::connect(Endpoint::new("localhost", 6379), 16).await?);
//!     let listener = TcpListener::bind("0.0.0.0:8000").await?;
//!     phonebook::server::serve(listener, Arc::clone(&store), phonebook::server::shutdown_signal()).await?;
//!     store.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`api`]: routes, handlers, request validation and error rendering
//! - [`store`]: the `RecordStore` seam, the Redis client and its pool
//! - [`protocol`]: RESP frames and parser
//! - [`config`]: command-line / environment settings
//! - [`server`]: serving and graceful shutdown

pub mod api;
pub mod config;
pub mod protocol;
pub mod server;
pub mod store;

pub use api::{router, ApiError, PhoneRecord};
pub use config::{BackendKind, Settings};
pub use protocol::{ParseError, RespParser, RespValue};
pub use store::{Endpoint, MemoryStore, Pool, RecordStore, RedisStore, StoreError};

/// The default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Version of Phonebook
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
