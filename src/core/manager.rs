//! Persistence gateway traits consumed by the controller
//!
//! These are the seams between the controller and whatever actually stores the
//! entities. The crate ships an in-memory implementation in
//! [`storage`](crate::storage); a database-backed gateway implements the same
//! traits.

use crate::core::entity::{Entity, EntityId};
use crate::core::error::StorageError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Unit-of-work style persistence gateway for entities of type `T`
///
/// Writes are staged with `persist`/`remove` and only become durable on
/// `flush`. Reads see committed state.
#[async_trait]
pub trait EntityManager<T: Entity>: Send + Sync {
    /// Find an entity by identity
    async fn find(&self, id: EntityId) -> Result<Option<T>, StorageError>;

    /// Repository for collection-level reads
    fn repository(&self) -> Arc<dyn Repository<T>>;

    /// Stage an insert or update. Assigns an identity when the entity has none.
    async fn persist(&self, entity: &mut T) -> Result<(), StorageError>;

    /// Stage a removal
    async fn remove(&self, entity: &T) -> Result<(), StorageError>;

    /// Apply every staged change
    async fn flush(&self) -> Result<(), StorageError>;

    /// Second-level cache handle, `None` when no cache is configured
    fn cache(&self) -> Option<Arc<dyn Cache>>;
}

/// Opens the gateway for one request
///
/// Each session owns its own unit of work over shared committed state, so
/// changes staged by one request are never flushed by another.
pub trait SessionFactory<T: Entity>: Send + Sync {
    fn open_session(&self) -> Arc<dyn EntityManager<T>>;
}

/// Session factory handing out the same manager to every request
///
/// For gateways whose unit of work is already scoped by the caller.
pub struct SharedSession<T: Entity> {
    manager: Arc<dyn EntityManager<T>>,
}

impl<T: Entity> SharedSession<T> {
    pub fn new(manager: Arc<dyn EntityManager<T>>) -> Self {
        Self { manager }
    }
}

impl<T: Entity> SessionFactory<T> for SharedSession<T> {
    fn open_session(&self) -> Arc<dyn EntityManager<T>> {
        Arc::clone(&self.manager)
    }
}

/// Collection-level reads for entities of type `T`
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// All entities, in the order the backend returns them
    async fn find_all(&self) -> Result<Vec<T>, StorageError>;

    /// Entities whose `field` equals `value`
    async fn find_by(&self, field: &str, value: &Value) -> Result<Vec<T>, StorageError>;

    /// Number of entities
    async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.find_all().await?.len())
    }
}

/// Second-level cache handle
///
/// Every eviction covers the whole gateway, not a single entity type. Each call
/// is idempotent and safe when nothing is cached.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Drop every cached entity, all types
    async fn evict_entity_regions(&self) -> Result<(), StorageError>;

    /// Drop every cached collection/list result
    async fn evict_collection_regions(&self) -> Result<(), StorageError>;

    /// Drop every cached query result
    async fn evict_query_regions(&self) -> Result<(), StorageError>;
}
