//! Key-value persistence capability for Deckrelay rooms.
//!
//! The room treats durable storage as an injected capability: something
//! that can `get` and `put` one string value per key. The room uses a
//! single key (its own id) holding the serialized last-known state.
//!
//! [`MemoryStore`] is the in-process implementation: enough for a
//! single-node deployment and for tests. A database- or disk-backed
//! store only needs to implement [`StateStore`].

mod error;

pub use error::StoreError;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

/// A per-room key-value persistence capability.
pub trait StateStore: Send + Sync + 'static {
    /// Reads the value stored under `key`, if any.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// An in-memory [`StateStore`].
///
/// Cheap to clone: clones share the same map, so tests can hand one
/// clone to the room and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
