//! Key-value storage scoped to one visitor.
//!
//! [`StateBackend`] is chosen once at start-up; [`VisitorStore`] narrows it to
//! a single visitor and implements [`KeyValueStore`] for the session container.

use sqlx::PgPool;
use uuid::Uuid;

use ayts_core::{KeyValueStore, MemoryStore, PersistError};

use crate::db::{RepositoryError, VisitorStateRepository};

/// Where visitor entries are stored.
#[derive(Debug, Clone)]
pub enum StateBackend {
    /// `storefront.visitor_state`
    Postgres(PgPool),
    /// Process memory; lost on restart. Used by tests and local runs.
    Memory(MemoryStore),
}

impl StateBackend {
    /// In-memory backend with an empty map.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// Narrow the backend to one visitor's entries.
    #[must_use]
    pub fn for_visitor(&self, visitor: Uuid) -> VisitorStore {
        VisitorStore {
            backend: self.clone(),
            visitor,
        }
    }

    /// Whether the backend can currently serve requests.
    pub async fn is_ready(&self) -> bool {
        match self {
            Self::Postgres(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.is_ok(),
            Self::Memory(_) => true,
        }
    }
}

/// One visitor's view of the backend.
#[derive(Debug, Clone)]
pub struct VisitorStore {
    backend: StateBackend,
    visitor: Uuid,
}

impl VisitorStore {
    #[must_use]
    pub const fn visitor(&self) -> Uuid {
        self.visitor
    }

    fn memory_key(&self, key: &str) -> String {
        format!("{}:{key}", self.visitor)
    }
}

impl From<RepositoryError> for PersistError {
    fn from(err: RepositoryError) -> Self {
        Self::Backend(err.to_string())
    }
}

impl KeyValueStore for VisitorStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        match &self.backend {
            StateBackend::Postgres(pool) => Ok(VisitorStateRepository::new(pool)
                .get(self.visitor, key)
                .await?),
            StateBackend::Memory(store) => store.get(&self.memory_key(key)).await,
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), PersistError> {
        match &self.backend {
            StateBackend::Postgres(pool) => Ok(VisitorStateRepository::new(pool)
                .put(self.visitor, key, &value)
                .await?),
            StateBackend::Memory(store) => store.set(&self.memory_key(key), value).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<(), PersistError> {
        match &self.backend {
            StateBackend::Postgres(pool) => Ok(VisitorStateRepository::new(pool)
                .delete(self.visitor, key)
                .await?),
            StateBackend::Memory(store) => store.remove(&self.memory_key(key)).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use ayts_core::persist::keys;

    use super::*;

    #[tokio::test]
    async fn test_visitors_do_not_share_entries() {
        let backend = StateBackend::memory();
        let alice = backend.for_visitor(Uuid::new_v4());
        let bob = backend.for_visitor(Uuid::new_v4());

        alice
            .set(keys::SELECTED_CATEGORY, "\"Grocery\"".to_string())
            .await
            .ok();

        assert_eq!(
            alice.get(keys::SELECTED_CATEGORY).await.ok().flatten().as_deref(),
            Some("\"Grocery\"")
        );
        assert_eq!(bob.get(keys::SELECTED_CATEGORY).await.ok().flatten(), None);

        alice.remove(keys::SELECTED_CATEGORY).await.ok();
        let StateBackend::Memory(store) = &backend else {
            unreachable!()
        };
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_backend_is_ready() {
        assert!(StateBackend::memory().is_ready().await);
    }
}
