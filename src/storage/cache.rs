//! In-memory second-level cache with entity, collection and query regions

use crate::core::entity::{EntityClass, EntityId};
use crate::core::error::StorageError;
use crate::core::manager::Cache;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Regions {
    entities: HashMap<(&'static str, EntityId), Value>,
    collections: HashMap<&'static str, Vec<Value>>,
    queries: HashMap<String, Vec<Value>>,
    entity_evictions: usize,
    collection_evictions: usize,
    query_evictions: usize,
}

/// Entry counts and eviction counters, per region kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entities: usize,
    pub collections: usize,
    pub queries: usize,
    pub entity_evictions: usize,
    pub collection_evictions: usize,
    pub query_evictions: usize,
}

/// Thread-safe region cache shared by every entity type of a gateway
///
/// Values are stored as JSON so one cache can hold any entity type.
#[derive(Clone, Default)]
pub struct InMemoryRegionCache {
    regions: Arc<RwLock<Regions>>,
}

impl InMemoryRegionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_entity(&self, class: EntityClass, id: EntityId) -> Result<Option<Value>, StorageError> {
        let regions = self.read()?;
        Ok(regions.entities.get(&(class.plural, id)).cloned())
    }

    pub fn put_entity(&self, class: EntityClass, id: EntityId, value: Value) -> Result<(), StorageError> {
        self.write()?.entities.insert((class.plural, id), value);
        Ok(())
    }

    pub fn get_collection(&self, class: EntityClass) -> Result<Option<Vec<Value>>, StorageError> {
        Ok(self.read()?.collections.get(class.plural).cloned())
    }

    pub fn put_collection(&self, class: EntityClass, rows: Vec<Value>) -> Result<(), StorageError> {
        self.write()?.collections.insert(class.plural, rows);
        Ok(())
    }

    pub fn get_query(&self, key: &str) -> Result<Option<Vec<Value>>, StorageError> {
        Ok(self.read()?.queries.get(key).cloned())
    }

    pub fn put_query(&self, key: impl Into<String>, rows: Vec<Value>) -> Result<(), StorageError> {
        self.write()?.queries.insert(key.into(), rows);
        Ok(())
    }

    /// Current region sizes and how many evictions of each kind ran
    pub fn stats(&self) -> Result<CacheStats, StorageError> {
        let regions = self.read()?;
        Ok(CacheStats {
            entities: regions.entities.len(),
            collections: regions.collections.len(),
            queries: regions.queries.len(),
            entity_evictions: regions.entity_evictions,
            collection_evictions: regions.collection_evictions,
            query_evictions: regions.query_evictions,
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Regions>, StorageError> {
        self.regions
            .read()
            .map_err(|e| StorageError::lock("cache region", e))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Regions>, StorageError> {
        self.regions
            .write()
            .map_err(|e| StorageError::lock("cache region", e))
    }
}

#[async_trait]
impl Cache for InMemoryRegionCache {
    async fn evict_entity_regions(&self) -> Result<(), StorageError> {
        let mut regions = self.write()?;
        regions.entities.clear();
        regions.entity_evictions += 1;
        Ok(())
    }

    async fn evict_collection_regions(&self) -> Result<(), StorageError> {
        let mut regions = self.write()?;
        regions.collections.clear();
        regions.collection_evictions += 1;
        Ok(())
    }

    async fn evict_query_regions(&self) -> Result<(), StorageError> {
        let mut regions = self.write()?;
        regions.queries.clear();
        regions.query_evictions += 1;
        Ok(())
    }
}
