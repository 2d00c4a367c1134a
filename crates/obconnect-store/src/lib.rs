//! obconnect Store - Persistence collaborator
//!
//! The connector core treats persistence as a simple keyed store with
//! per-entity atomic save and no further transaction semantics. Production
//! deployments provide their own backend; [`MemoryStore`] backs tests and
//! demos.

use async_trait::async_trait;
use dashmap::DashMap;

use obconnect_types::ConnectorResult;

/// Keyed store for one entity type
#[async_trait]
pub trait EntityStore<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    /// Load an entity by key
    async fn load(&self, key: &str) -> ConnectorResult<Option<T>>;

    /// Save an entity under a key, replacing any previous value atomically
    async fn save(&self, key: &str, entity: T) -> ConnectorResult<()>;

    /// Delete an entity. Returns whether a record existed.
    async fn delete(&self, key: &str) -> ConnectorResult<bool>;
}

/// In-memory entity store
#[derive(Default)]
pub struct MemoryStore<T> {
    entries: DashMap<String, T>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of stored entities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys of all stored entities
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[async_trait]
impl<T> EntityStore<T> for MemoryStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn load(&self, key: &str) -> ConnectorResult<Option<T>> {
        Ok(self.entries.get(key).map(|entry| entry.clone()))
    }

    async fn save(&self, key: &str, entity: T) -> ConnectorResult<()> {
        self.entries.insert(key.to_string(), entity);
        Ok(())
    }

    async fn delete(&self, key: &str) -> ConnectorResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }
}
