//! In-memory persistence gateway for testing and development

use crate::config::CacheConfig;
use crate::core::entity::{Entity, EntityClass, EntityId};
use crate::core::error::StorageError;
use crate::core::manager::{Cache, EntityManager, Repository, SessionFactory};
use crate::storage::cache::InMemoryRegionCache;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

const BACKEND: &str = "in-memory";

struct Table {
    rows: BTreeMap<EntityId, Value>,
    next_id: EntityId,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

#[derive(Debug, Clone)]
enum PendingChange {
    Upsert {
        class: EntityClass,
        id: EntityId,
        row: Value,
    },
    Remove {
        class: EntityClass,
        id: EntityId,
    },
}

impl PendingChange {
    fn targets(&self, class: EntityClass, id: EntityId) -> bool {
        match self {
            PendingChange::Upsert { class: c, id: i, .. } | PendingChange::Remove { class: c, id: i } => {
                *c == class && *i == id
            }
        }
    }
}

/// Identity following `id` in the sequence of `class`
fn next_after(class: EntityClass, id: EntityId) -> Result<EntityId, StorageError> {
    id.checked_add(1).ok_or_else(|| StorageError::Backend {
        backend: BACKEND.to_string(),
        message: format!("identity sequence of {} exhausted at {}", class.plural, id),
    })
}

/// In-memory store serving every entity type
///
/// Rows are kept as JSON per entity class, in identity order. Reads see
/// committed rows, through the region cache when one is configured. Writes
/// go through an [`InMemorySession`] opened with [`begin`](Self::begin),
/// which owns its unit of work. Clones share tables and cache.
#[derive(Clone, Default)]
pub struct InMemoryEntityManager {
    tables: Arc<RwLock<HashMap<&'static str, Table>>>,
    cache: Option<InMemoryRegionCache>,
}

impl InMemoryEntityManager {
    /// Create a store without second-level cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store backed by the given region cache
    pub fn with_cache(cache: InMemoryRegionCache) -> Self {
        Self {
            cache: Some(cache),
            ..Self::default()
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        if config.enabled {
            Self::with_cache(InMemoryRegionCache::new())
        } else {
            Self::new()
        }
    }

    /// Open a session with an empty unit of work
    pub fn begin(&self) -> InMemorySession {
        InMemorySession {
            store: self.clone(),
            unit_of_work: Mutex::new(Vec::new()),
        }
    }

    /// The concrete region cache, for inspection
    pub fn region_cache(&self) -> Option<&InMemoryRegionCache> {
        self.cache.as_ref()
    }

    /// Persist and commit an entity immediately, bypassing any unit of work
    ///
    /// Meant for fixtures; nothing is evicted from the cache.
    pub fn seed<T: Entity>(&self, mut entity: T) -> Result<T, StorageError> {
        let class = EntityClass::of::<T>();
        let id = self.identity_for(class, &mut entity)?;
        let row = encode(class, &entity)?;
        self.apply(vec![PendingChange::Upsert { class, id, row }])?;
        Ok(entity)
    }

    fn identity_for<T: Entity>(&self, class: EntityClass, entity: &mut T) -> Result<EntityId, StorageError> {
        if let Some(id) = entity.id() {
            return Ok(id);
        }
        let mut tables = self
            .tables
            .write()
            .map_err(|e| StorageError::lock("table", e))?;
        let table = tables.entry(class.plural).or_default();
        let id = table.next_id;
        table.next_id = next_after(class, id)?;
        entity.assign_id(id);
        Ok(id)
    }

    /// Commit a batch of changes; nothing is written if any identity is out of range
    fn apply(&self, changes: Vec<PendingChange>) -> Result<(), StorageError> {
        let mut upserts = Vec::with_capacity(changes.len());
        for change in &changes {
            if let PendingChange::Upsert { class, id, .. } = change {
                upserts.push(next_after(*class, *id)?);
            }
        }

        let mut tables = self
            .tables
            .write()
            .map_err(|e| StorageError::lock("table", e))?;
        let mut following = upserts.into_iter();
        for change in changes {
            match change {
                PendingChange::Upsert { class, id, row } => {
                    let table = tables.entry(class.plural).or_default();
                    if let Some(next) = following.next() {
                        table.next_id = table.next_id.max(next);
                    }
                    table.rows.insert(id, row);
                }
                PendingChange::Remove { class, id } => {
                    if let Some(table) = tables.get_mut(class.plural) {
                        table.rows.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }

    fn committed_row(&self, class: EntityClass, id: EntityId) -> Result<Option<Value>, StorageError> {
        let tables = self
            .tables
            .read()
            .map_err(|e| StorageError::lock("table", e))?;
        Ok(tables
            .get(class.plural)
            .and_then(|table| table.rows.get(&id).cloned()))
    }

    fn committed_rows(&self, class: EntityClass) -> Result<Vec<Value>, StorageError> {
        let tables = self
            .tables
            .read()
            .map_err(|e| StorageError::lock("table", e))?;
        Ok(tables
            .get(class.plural)
            .map(|table| table.rows.values().cloned().collect())
            .unwrap_or_default())
    }
}

impl<T: Entity> SessionFactory<T> for InMemoryEntityManager {
    fn open_session(&self) -> Arc<dyn EntityManager<T>> {
        Arc::new(self.begin())
    }
}

fn encode<T: Entity>(class: EntityClass, entity: &T) -> Result<Value, StorageError> {
    serde_json::to_value(entity).map_err(|e| StorageError::Serialization {
        entity_type: class.singular.to_string(),
        message: e.to_string(),
    })
}

fn decode<T: Entity>(class: EntityClass, row: Value) -> Result<T, StorageError> {
    serde_json::from_value(row).map_err(|e| StorageError::Serialization {
        entity_type: class.singular.to_string(),
        message: e.to_string(),
    })
}

/// One request's view of an [`InMemoryEntityManager`]
///
/// `persist` and `remove` stage changes in this session only; `flush`
/// commits them to the shared tables. Dropping the session discards
/// whatever was never flushed.
pub struct InMemorySession {
    store: InMemoryEntityManager,
    unit_of_work: Mutex<Vec<PendingChange>>,
}

impl InMemorySession {
    /// Number of staged changes waiting for `flush`
    pub fn pending_changes(&self) -> Result<usize, StorageError> {
        Ok(self.lock_unit_of_work()?.len())
    }

    /// Discard every staged change
    pub fn clear(&self) -> Result<(), StorageError> {
        self.lock_unit_of_work()?.clear();
        Ok(())
    }

    fn lock_unit_of_work(&self) -> Result<MutexGuard<'_, Vec<PendingChange>>, StorageError> {
        self.unit_of_work
            .lock()
            .map_err(|e| StorageError::lock("unit of work", e))
    }

    fn stage(&self, class: EntityClass, id: EntityId, change: PendingChange) -> Result<(), StorageError> {
        let mut pending = self.lock_unit_of_work()?;
        pending.retain(|staged| !staged.targets(class, id));
        pending.push(change);
        Ok(())
    }
}

#[async_trait]
impl<T: Entity> EntityManager<T> for InMemorySession {
    async fn find(&self, id: EntityId) -> Result<Option<T>, StorageError> {
        let class = EntityClass::of::<T>();
        let cache = self.store.region_cache();

        if let Some(cache) = cache {
            if let Some(row) = cache.get_entity(class, id)? {
                return decode(class, row).map(Some);
            }
        }

        let Some(row) = self.store.committed_row(class, id)? else {
            return Ok(None);
        };
        if let Some(cache) = cache {
            cache.put_entity(class, id, row.clone())?;
        }
        decode(class, row).map(Some)
    }

    fn repository(&self) -> Arc<dyn Repository<T>> {
        Arc::new(InMemoryRepository::<T>::new(self.store.clone()))
    }

    async fn persist(&self, entity: &mut T) -> Result<(), StorageError> {
        let class = EntityClass::of::<T>();
        let id = self.store.identity_for(class, entity)?;
        let row = encode(class, entity)?;
        self.stage(class, id, PendingChange::Upsert { class, id, row })
    }

    async fn remove(&self, entity: &T) -> Result<(), StorageError> {
        let class = EntityClass::of::<T>();
        let Some(id) = entity.id() else {
            return Ok(());
        };
        self.stage(class, id, PendingChange::Remove { class, id })
    }

    async fn flush(&self) -> Result<(), StorageError> {
        let changes = std::mem::take(&mut *self.lock_unit_of_work()?);
        let count = changes.len();
        self.store.apply(changes)?;
        tracing::debug!(changes = count, "Unit of work flushed");
        Ok(())
    }

    fn cache(&self) -> Option<Arc<dyn Cache>> {
        self.store
            .cache
            .clone()
            .map(|cache| Arc::new(cache) as Arc<dyn Cache>)
    }
}

/// Repository view of an [`InMemoryEntityManager`] for one entity type
pub struct InMemoryRepository<T: Entity> {
    manager: InMemoryEntityManager,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> InMemoryRepository<T> {
    pub fn new(manager: InMemoryEntityManager) -> Self {
        Self {
            manager,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    async fn find_all(&self) -> Result<Vec<T>, StorageError> {
        let class = EntityClass::of::<T>();
        let cache = self.manager.region_cache();

        let rows = match cache.map(|c| c.get_collection(class)).transpose()?.flatten() {
            Some(rows) => rows,
            None => {
                let rows = self.manager.committed_rows(class)?;
                if let Some(cache) = cache {
                    cache.put_collection(class, rows.clone())?;
                }
                rows
            }
        };

        rows.into_iter().map(|row| decode(class, row)).collect()
    }

    async fn find_by(&self, field: &str, value: &Value) -> Result<Vec<T>, StorageError> {
        let class = EntityClass::of::<T>();
        let cache = self.manager.region_cache();
        let key = format!("{}:{}={}", class.plural, field, value);

        let rows = match cache.map(|c| c.get_query(&key)).transpose()?.flatten() {
            Some(rows) => rows,
            None => {
                let rows: Vec<Value> = self
                    .manager
                    .committed_rows(class)?
                    .into_iter()
                    .filter(|row| row.get(field) == Some(value))
                    .collect();
                if let Some(cache) = cache {
                    cache.put_query(key, rows.clone())?;
                }
                rows
            }
        };

        rows.into_iter().map(|row| decode(class, row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_resource_entity;
    use serde_json::json;

    impl_resource_entity!(Book, "book", "books", {
        title: String,
        author: String,
    });

    impl_resource_entity!(Shelf, "shelf", "shelves", {
        label: String,
    });

    fn book(title: &str, author: &str) -> Book {
        Book {
            id: None,
            title: title.to_string(),
            author: author.to_string(),
        }
    }

    #[tokio::test]
    async fn test_persist_assigns_identity_and_stages() {
        let session = InMemoryEntityManager::new().begin();
        let mut entity = book("Dune", "Herbert");

        EntityManager::<Book>::persist(&session, &mut entity).await.unwrap();

        assert_eq!(entity.id, Some(1));
        assert_eq!(session.pending_changes().unwrap(), 1);
        let found: Option<Book> = session.find(1).await.unwrap();
        assert!(found.is_none(), "staged rows are not visible before flush");
    }

    #[tokio::test]
    async fn test_flush_commits_staged_changes() {
        let manager = InMemoryEntityManager::new();
        let session = manager.begin();
        let mut entity = book("Dune", "Herbert");

        session.persist(&mut entity).await.unwrap();
        EntityManager::<Book>::flush(&session).await.unwrap();
        assert_eq!(session.pending_changes().unwrap(), 0);

        let found: Book = manager.begin().find(1).await.unwrap().unwrap();
        assert_eq!(found, entity);
    }

    #[tokio::test]
    async fn test_persist_twice_stages_one_upsert() {
        let session = InMemoryEntityManager::new().begin();
        let mut entity = book("Dune", "Herbert");

        session.persist(&mut entity).await.unwrap();
        entity.title = "Dune Messiah".into();
        session.persist(&mut entity).await.unwrap();

        assert_eq!(session.pending_changes().unwrap(), 1);
        EntityManager::<Book>::flush(&session).await.unwrap();
        let found: Book = session.find(1).await.unwrap().unwrap();
        assert_eq!(found.title, "Dune Messiah");
    }

    #[tokio::test]
    async fn test_sessions_keep_separate_units_of_work() {
        let manager = InMemoryEntityManager::new();
        let entity = manager.seed(book("Dune", "Herbert")).unwrap();

        let first = manager.begin();
        first.remove(&entity).await.unwrap();

        let second = manager.begin();
        let mut other = book("Foundation", "Asimov");
        second.persist(&mut other).await.unwrap();
        EntityManager::<Book>::flush(&second).await.unwrap();

        assert_eq!(first.pending_changes().unwrap(), 1);
        let still_there: Option<Book> = manager.begin().find(1).await.unwrap();
        assert!(still_there.is_some());

        drop(first);
        let listed = EntityManager::<Book>::repository(&manager.begin())
            .find_all()
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn test_persist_after_remove_cancels_removal() {
        let manager = InMemoryEntityManager::new();
        let mut entity = manager.seed(book("Dune", "Herbert")).unwrap();
        let session = manager.begin();

        session.remove(&entity).await.unwrap();
        entity.title = "Dune Messiah".into();
        session.persist(&mut entity).await.unwrap();
        EntityManager::<Book>::flush(&session).await.unwrap();

        let found: Book = session.find(1).await.unwrap().unwrap();
        assert_eq!(found.title, "Dune Messiah");
    }

    #[tokio::test]
    async fn test_identities_are_per_class() {
        let manager = InMemoryEntityManager::new();
        let first = manager.seed(book("A", "x")).unwrap();
        let second = manager.seed(book("B", "y")).unwrap();
        let shelf = manager
            .seed(Shelf {
                id: None,
                label: "top".into(),
            })
            .unwrap();

        assert_eq!(first.id, Some(1));
        assert_eq!(second.id, Some(2));
        assert_eq!(shelf.id, Some(1));
    }

    #[tokio::test]
    async fn test_seed_with_explicit_id_advances_sequence() {
        let manager = InMemoryEntityManager::new();
        manager
            .seed(Book {
                id: Some(10),
                ..book("A", "x")
            })
            .unwrap();
        let next = manager.seed(book("B", "y")).unwrap();
        assert_eq!(next.id, Some(11));
    }

    #[tokio::test]
    async fn test_exhausted_identity_sequence_is_a_storage_error() {
        let manager = InMemoryEntityManager::new();

        let err = manager
            .seed(Book {
                id: Some(EntityId::MAX),
                ..book("A", "x")
            })
            .unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert!(err.to_string().contains("books"));

        let session = manager.begin();
        let mut staged = Book {
            id: Some(EntityId::MAX),
            ..book("B", "y")
        };
        session.persist(&mut staged).await.unwrap();
        assert!(EntityManager::<Book>::flush(&session).await.is_err());

        // Nothing was written and the tables are still usable
        let listed = EntityManager::<Book>::repository(&session).find_all().await.unwrap();
        assert!(listed.is_empty());
        let next = manager.seed(book("C", "z")).unwrap();
        assert_eq!(next.id, Some(1));
    }

    #[tokio::test]
    async fn test_remove_is_staged_until_flush() {
        let manager = InMemoryEntityManager::new();
        let entity = manager.seed(book("Dune", "Herbert")).unwrap();
        let session = manager.begin();

        session.remove(&entity).await.unwrap();
        let still_there: Option<Book> = session.find(1).await.unwrap();
        assert!(still_there.is_some());

        EntityManager::<Book>::flush(&session).await.unwrap();
        let gone: Option<Book> = session.find(1).await.unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_remove_new_entity_is_noop() {
        let session = InMemoryEntityManager::new().begin();
        session.remove(&book("Dune", "Herbert")).await.unwrap();
        assert_eq!(session.pending_changes().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_discards_staged_changes() {
        let session = InMemoryEntityManager::new().begin();
        let mut entity = book("Dune", "Herbert");
        session.persist(&mut entity).await.unwrap();

        session.clear().unwrap();
        EntityManager::<Book>::flush(&session).await.unwrap();

        let found: Option<Book> = session.find(1).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_repository_lists_in_identity_order() {
        let manager = InMemoryEntityManager::new();
        manager.seed(Book { id: Some(3), ..book("C", "x") }).unwrap();
        manager.seed(Book { id: Some(1), ..book("A", "x") }).unwrap();

        let repository = InMemoryRepository::<Book>::new(manager.clone());
        let titles: Vec<String> = repository
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();

        assert_eq!(titles, vec!["A", "C"]);
        assert_eq!(repository.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_repository_find_by() {
        let manager = InMemoryEntityManager::new();
        manager.seed(book("A", "Herbert")).unwrap();
        manager.seed(book("B", "Asimov")).unwrap();
        manager.seed(book("C", "Herbert")).unwrap();

        let repository = InMemoryRepository::<Book>::new(manager.clone());
        let found = repository.find_by("author", &json!("Herbert")).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|b| b.author == "Herbert"));
    }

    #[tokio::test]
    async fn test_reads_populate_regions_until_evicted() {
        let manager = InMemoryEntityManager::with_cache(InMemoryRegionCache::new());
        manager.seed(book("A", "Herbert")).unwrap();
        let session = manager.begin();

        let _: Option<Book> = session.find(1).await.unwrap();
        let repository = EntityManager::<Book>::repository(&session);
        repository.find_all().await.unwrap();
        repository.find_by("author", &json!("Herbert")).await.unwrap();

        let cache = manager.region_cache().unwrap();
        let stats = cache.stats().unwrap();
        assert_eq!((stats.entities, stats.collections, stats.queries), (1, 1, 1));

        // A seeded row bypasses eviction, so the cached list is stale
        manager.seed(book("B", "Asimov")).unwrap();
        assert_eq!(repository.find_all().await.unwrap().len(), 1);

        let handle = EntityManager::<Book>::cache(&session).unwrap();
        handle.evict_entity_regions().await.unwrap();
        handle.evict_collection_regions().await.unwrap();
        handle.evict_query_regions().await.unwrap();

        assert_eq!(repository.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_no_cache_handle_without_cache() {
        let session = InMemoryEntityManager::new().begin();
        assert!(EntityManager::<Book>::cache(&session).is_none());

        let configured = InMemoryEntityManager::from_config(&CacheConfig { enabled: true });
        assert!(EntityManager::<Book>::cache(&configured.begin()).is_some());
    }
}
