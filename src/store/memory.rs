//! In-Process Record Store
//!
//! A sharded map with the same conditional-write contract as the Redis
//! backend. Used with `--backend memory` and throughout the handler tests.
//!
//! Keys are spread over [`NUM_SHARDS`] independent `RwLock`s so concurrent
//! requests for different phones rarely contend. A conditional set takes the
//! shard's write lock once and does its existence check under it.

use crate::store::{RecordStore, StoreResult};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Number of shards.
const NUM_SHARDS: usize = 16;

#[derive(Debug, Default)]
struct Shard {
    data: RwLock<HashMap<String, String>>,
}

impl Shard {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Thread-safe in-memory implementation of [`RecordStore`].
///
/// # Example
///
/// ```
/// use phonebook::store::{MemoryStore, RecordStore};
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// assert!(store.set_if_absent("88005553535", "Ulaanbaatar, Mongolia").await.unwrap());
/// assert!(!store.set_if_absent("88005553535", "Paris, France").await.unwrap());
/// assert_eq!(
///     store.get("88005553535").await.unwrap().as_deref(),
///     Some("Ulaanbaatar, Mongolia")
/// );
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    shards: Vec<Shard>,
    key_count: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            shards: (0..NUM_SHARDS).map(|_| Shard::default()).collect(),
            key_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard(&self, key: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % NUM_SHARDS]
    }

    /// Number of records currently stored.
    pub fn len(&self) -> u64 {
        self.key_count.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.shard(key).read().get(key).cloned()
    }

    fn insert_if_absent(&self, key: &str, value: &str) -> bool {
        let mut data = self.shard(key).write();
        match data.entry(key.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value.to_string());
                self.key_count.fetch_add(1, Ordering::Relaxed);
                true
            }
        }
    }

    fn replace_if_present(&self, key: &str, value: &str) -> bool {
        let mut data = self.shard(key).write();
        match data.get_mut(key) {
            Some(slot) => {
                *slot = value.to_string();
                true
            }
            None => false,
        }
    }

    fn remove(&self, key: &str) -> u64 {
        if self.shard(key).write().remove(key).is_some() {
            self.key_count.fetch_sub(1, Ordering::Relaxed);
            1
        } else {
            0
        }
    }
}

impl RecordStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.lookup(key))
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> StoreResult<bool> {
        Ok(self.insert_if_absent(key, value))
    }

    async fn set_if_present(&self, key: &str, value: &str) -> StoreResult<bool> {
        Ok(self.replace_if_present(key, value))
    }

    async fn delete(&self, key: &str) -> StoreResult<u64> {
        Ok(self.remove(key))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
