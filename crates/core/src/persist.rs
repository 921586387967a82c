//! Persistent key-value bridge used to survive restarts.
//!
//! The session container stores each piece of state under its own key as a
//! JSON document. Backends only need to move opaque strings; encoding and
//! corruption recovery live in [`crate::session`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Keys of the persisted entries.
pub mod keys {
    /// Selected delivery location, `{id,name,area}`.
    pub const SELECTED_LOCATION: &str = "ayts-selected-location";

    /// Selected category name, a JSON string.
    pub const SELECTED_CATEGORY: &str = "ayts-selected-category";

    /// Cart lines, a JSON array.
    pub const CART_ITEMS: &str = "ayts-cart-items";

    /// Bearer token for the marketplace backend.
    pub const AUTH_TOKEN: &str = "auth_token";
}

/// Errors raised by a persistence backend.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The backend could not be reached or rejected the operation.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// An in-process backend lock was poisoned.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// A write the container wants performed after a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOp {
    /// Store `value` (a JSON document) under `key`.
    Put(&'static str, String),
    /// Delete the entry for `key`.
    Delete(&'static str),
}

impl PersistOp {
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Put(key, _) | Self::Delete(key) => key,
        }
    }
}

/// Storage for named string entries.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`) and cheap to clone
/// - `remove` of a missing key is not an error
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    /// Read the entry for `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, PersistError>> + Send;

    /// Create or replace the entry for `key`.
    fn set(&self, key: &str, value: String)
    -> impl Future<Output = Result<(), PersistError>> + Send;

    /// Delete the entry for `key`.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), PersistError>> + Send;

    /// Execute a write plan in order, stopping at the first failure.
    fn apply(&self, ops: Vec<PersistOp>) -> impl Future<Output = Result<(), PersistError>> + Send {
        async move {
            for op in ops {
                match op {
                    PersistOp::Put(key, value) => self.set(key, value).await?,
                    PersistOp::Delete(key) => self.remove(key).await?,
                }
            }
            Ok(())
        }
    }
}

/// In-process store backed by a shared map.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Synchronous read, for inspection.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        let entries = self.entries.lock().map_err(|_| PersistError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), PersistError> {
        let mut entries = self.entries.lock().map_err(|_| PersistError::Poisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistError> {
        let mut entries = self.entries.lock().map_err(|_| PersistError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.ok().flatten(), None);

        store.set("k", "v".to_string()).await.ok();
        assert_eq!(store.get("k").await.ok().flatten().as_deref(), Some("v"));

        store.remove("k").await.ok();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("k", "v".to_string()).await.ok();
        assert_eq!(other.peek("k").as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_apply_runs_plan_in_order() {
        let store = MemoryStore::new();
        store
            .apply(vec![
                PersistOp::Put(keys::CART_ITEMS, "[]".to_string()),
                PersistOp::Put(keys::SELECTED_CATEGORY, "\"Grocery\"".to_string()),
                PersistOp::Delete(keys::CART_ITEMS),
            ])
            .await
            .ok();

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.peek(keys::SELECTED_CATEGORY).as_deref(),
            Some("\"Grocery\"")
        );
    }

    #[test]
    fn test_op_key() {
        assert_eq!(PersistOp::Delete(keys::CART_ITEMS).key(), keys::CART_ITEMS);
    }
}
