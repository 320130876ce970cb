//! Redis-Backed Record Store
//!
//! Maps each [`RecordStore`] primitive onto exactly one backend command:
//!
//! | Primitive        | Command               | Reply                    |
//! |------------------|-----------------------|--------------------------|
//! | `get`            | `GET key`             | bulk string / null       |
//! | `set_if_absent`  | `SET key value NX`    | `+OK` / null             |
//! | `set_if_present` | `SET key value XX`    | `+OK` / null             |
//! | `delete`         | `DEL key`             | integer                  |
//! | `ping`           | `PING`                | `+PONG`                  |
//!
//! `NX` and `XX` make the existence check part of the write on the backend,
//! so there is no window between checking and setting.

use crate::protocol::RespValue;
use crate::store::{Endpoint, Pool, RecordStore, StoreError, StoreResult};
use tracing::{debug, info};

/// [`RecordStore`] over a pooled Redis connection.
#[derive(Debug, Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Builds the pool and checks the backend answers, so a bad endpoint or
    /// password fails at startup instead of on the first request.
    pub async fn connect(endpoint: Endpoint, pool_size: usize) -> StoreResult<Self> {
        let store = Self::new(Pool::new(endpoint, pool_size));
        store.ping().await?;
        info!(endpoint = %store.pool.endpoint(), pool_size, "Connected to backend");
        Ok(store)
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Closes the underlying pool.
    pub fn close(&self) {
        self.pool.close();
    }

    async fn run(&self, command: RespValue) -> StoreResult<RespValue> {
        let mut conn = self.pool.get().await?;
        conn.execute(&command).await
    }

    async fn conditional_set(
        &self,
        key: &str,
        value: &str,
        condition: &'static str,
    ) -> StoreResult<bool> {
        let reply = self
            .run(RespValue::command(["SET", key, value, condition]))
            .await?;
        if reply.is_null() {
            Ok(false)
        } else if reply.is_ok() {
            Ok(true)
        } else {
            Err(unexpected("SET", &reply))
        }
    }
}

fn unexpected(command: &'static str, reply: &RespValue) -> StoreError {
    StoreError::UnexpectedReply {
        command,
        reply: reply.kind(),
    }
}

impl RecordStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self.run(RespValue::command(["GET", key])).await? {
            RespValue::Null => Ok(None),
            RespValue::BulkString(data) => String::from_utf8(data.to_vec())
                .map(Some)
                .map_err(|_| StoreError::Backend("GET returned a non UTF-8 value".to_string())),
            other => Err(unexpected("GET", &other)),
        }
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> StoreResult<bool> {
        let created = self.conditional_set(key, value, "NX").await?;
        debug!(key, created, "SET NX");
        Ok(created)
    }

    async fn set_if_present(&self, key: &str, value: &str) -> StoreResult<bool> {
        let updated = self.conditional_set(key, value, "XX").await?;
        debug!(key, updated, "SET XX");
        Ok(updated)
    }

    async fn delete(&self, key: &str) -> StoreResult<u64> {
        let reply = self.run(RespValue::command(["DEL", key])).await?;
        match reply.as_integer() {
            Some(removed) if removed >= 0 => Ok(removed as u64),
            _ => Err(unexpected("DEL", &reply)),
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        match self.run(RespValue::command(["PING"])).await? {
            RespValue::SimpleString(s) if s == "PONG" => Ok(()),
            other => Err(unexpected("PING", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::TestBackend;

    async fn store_for(backend: &TestBackend) -> RedisStore {
        RedisStore::connect(backend.endpoint(), 4).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_read_update_delete() {
        let backend = TestBackend::spawn().await;
        let store = store_for(&backend).await;

        assert!(store
            .set_if_absent("88005553535", "Ulaanbaatar, Mongolia")
            .await
            .unwrap());
        assert_eq!(
            store.get("88005553535").await.unwrap().as_deref(),
            Some("Ulaanbaatar, Mongolia")
        );

        assert!(store
            .set_if_present("88005553535", "Paris, France")
            .await
            .unwrap());
        assert_eq!(backend.value("88005553535").as_deref(), Some("Paris, France"));

        assert_eq!(store.delete("88005553535").await.unwrap(), 1);
        assert_eq!(store.get("88005553535").await.unwrap(), None);
        assert_eq!(store.delete("88005553535").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_nx_does_not_overwrite() {
        let backend = TestBackend::spawn().await;
        let store = store_for(&backend).await;

        assert!(store.set_if_absent("+15550001", "first address").await.unwrap());
        assert!(!store.set_if_absent("+15550001", "second address").await.unwrap());
        assert_eq!(backend.value("+15550001").as_deref(), Some("first address"));
    }

    #[tokio::test]
    async fn test_xx_does_not_create() {
        let backend = TestBackend::spawn().await;
        let store = store_for(&backend).await;

        assert!(!store.set_if_present("999111", "Valid Address String").await.unwrap());
        assert_eq!(backend.value("999111"), None);
    }

    #[tokio::test]
    async fn test_requests_share_one_connection() {
        let backend = TestBackend::spawn().await;
        let store = store_for(&backend).await;

        for i in 0..10 {
            let key = format!("7900000{:04}", i);
            store.set_if_absent(&key, "Some street 1").await.unwrap();
            store.get(&key).await.unwrap();
        }

        assert_eq!(backend.accepted(), 1);
        assert_eq!(store.pool().stats().opened, 1);
    }

    #[tokio::test]
    async fn test_connect_fails_on_bad_password() {
        let backend = TestBackend::spawn_with_password("s3cret").await;
        let endpoint = backend.endpoint().with_password("wrong");

        let err = RedisStore::connect(endpoint, 2).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let store = RedisStore::new(Pool::new(Endpoint::new("127.0.0.1", port), 2));
        assert!(matches!(store.get("88005553535").await, Err(StoreError::Io(_))));
        assert!(matches!(
            store.set_if_absent("88005553535", "Paris, France").await,
            Err(StoreError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_store_is_an_error() {
        let backend = TestBackend::spawn().await;
        let store = store_for(&backend).await;

        store.close();
        assert!(matches!(store.delete("k").await, Err(StoreError::PoolClosed)));
    }
}
