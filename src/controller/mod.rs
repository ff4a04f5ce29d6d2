//! Generic resource controller
//!
//! [`ResourceController`] implements list/get/create/update/delete for one
//! entity type. It is bound at construction to a persistence gateway, a form
//! factory and the form type describing how payloads bind onto the entity.
//!
//! Two failure channels are kept apart. A missing entity is a fault
//! ([`ResourceError`]) while an invalid or unsubmitted payload is an ordinary
//! value ([`Submission::Err`]) the caller branches on.

use crate::core::entity::{Entity, EntityClass};
use crate::core::error::{ResourceError, ResourceResult, StorageError};
use crate::core::form::{FormErrors, FormFactory, FormOptions, FormType};
use crate::core::manager::{Cache, EntityManager, SessionFactory, SharedSession};
use crate::core::request::{ID_PARAM, ResourceRequest, coerce_id, display_id};
use crate::forms::JsonFormFactory;
use serde_json::Value;
use std::sync::Arc;

/// Outcome of binding a payload: the persisted entity or the form errors
pub type Submission<T> = Result<T, FormErrors>;

/// Controller for entities of type `T`
///
/// Every operation opens one gateway session, so the unit of work never
/// outlives the request that filled it.
pub struct ResourceController<T: Entity> {
    sessions: Arc<dyn SessionFactory<T>>,
    forms: Arc<dyn FormFactory<T>>,
    form_type: Arc<dyn FormType<T>>,
}

impl<T: Entity> Clone for ResourceController<T> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            forms: Arc::clone(&self.forms),
            form_type: Arc::clone(&self.form_type),
        }
    }
}

impl<T: Entity> ResourceController<T> {
    /// Controller bound to a single gateway whose unit of work spans every call
    pub fn new(
        manager: Arc<dyn EntityManager<T>>,
        forms: Arc<dyn FormFactory<T>>,
        form_type: Arc<dyn FormType<T>>,
    ) -> Self {
        Self::with_sessions(Arc::new(SharedSession::new(manager)), forms, form_type)
    }

    /// Controller opening a fresh gateway session per operation
    pub fn with_sessions(
        sessions: Arc<dyn SessionFactory<T>>,
        forms: Arc<dyn FormFactory<T>>,
        form_type: Arc<dyn FormType<T>>,
    ) -> Self {
        Self {
            sessions,
            forms,
            form_type,
        }
    }

    /// Controller binding JSON payloads with [`JsonFormFactory`]
    pub fn with_json_forms(
        sessions: Arc<dyn SessionFactory<T>>,
        form_type: Arc<dyn FormType<T>>,
    ) -> Self {
        Self::with_sessions(sessions, Arc::new(JsonFormFactory), form_type)
    }

    /// The entity type this controller manages
    pub fn entity_class(&self) -> EntityClass {
        EntityClass::of::<T>()
    }

    pub fn form_type(&self) -> &Arc<dyn FormType<T>> {
        &self.form_type
    }

    /// Every entity of the managed type, in gateway order
    pub async fn list(&self) -> ResourceResult<Vec<T>> {
        let manager = self.sessions.open_session();
        let entities = manager.repository().find_all().await?;
        tracing::debug!(
            resource = T::resource_name(),
            count = entities.len(),
            "Listed entities"
        );
        Ok(entities)
    }

    /// The entity identified by the request's `id` parameter
    pub async fn get(&self, request: &ResourceRequest) -> ResourceResult<T> {
        let manager = self.sessions.open_session();
        resolve(manager.as_ref(), &request_id(request)).await
    }

    /// Bind the payload onto a blank entity and persist it
    pub async fn create(&self, request: &ResourceRequest) -> ResourceResult<Submission<T>> {
        let manager = self.sessions.open_session();
        self.bind_and_save(manager.as_ref(), request, T::default())
            .await
    }

    /// Bind the payload onto the entity identified by `id` and persist it
    ///
    /// The entity is resolved before any binding happens, so an unknown id
    /// fails without touching the form.
    pub async fn update(&self, request: &ResourceRequest) -> ResourceResult<Submission<T>> {
        let manager = self.sessions.open_session();
        let entity = resolve(manager.as_ref(), &request_id(request)).await?;
        self.bind_and_save(manager.as_ref(), request, entity).await
    }

    /// Stage removal of the entity identified by `id` and return it
    ///
    /// The removal is only staged in this operation's session. Nothing is
    /// flushed and no cache region is evicted, so the stored row survives.
    pub async fn delete(&self, request: &ResourceRequest) -> ResourceResult<T> {
        let manager = self.sessions.open_session();
        let entity = resolve(manager.as_ref(), &request_id(request)).await?;
        manager.remove(&entity).await?;
        tracing::info!(
            resource = T::resource_name_singular(),
            id = ?entity.id(),
            "Staged entity removal"
        );
        Ok(entity)
    }

    /// Resolve an untyped identifier into an entity
    ///
    /// Identifiers that are not integers resolve to nothing, so a malformed id
    /// and an absent one both fail with not-found.
    pub async fn get_entity(&self, id: &Value) -> ResourceResult<T> {
        let manager = self.sessions.open_session();
        resolve(manager.as_ref(), id).await
    }

    /// Bind the request onto `entity` and persist the result when valid
    ///
    /// The persisted entity is the one produced by the form, which is not
    /// necessarily the instance passed in.
    pub async fn save(
        &self,
        request: &ResourceRequest,
        entity: T,
    ) -> ResourceResult<Submission<T>> {
        let manager = self.sessions.open_session();
        self.bind_and_save(manager.as_ref(), request, entity).await
    }

    /// Persist, flush, then evict every cache region of the gateway
    pub async fn save_entity(&self, entity: &mut T) -> ResourceResult<()> {
        let manager = self.sessions.open_session();
        persist_and_evict(manager.as_ref(), entity).await
    }

    async fn bind_and_save(
        &self,
        manager: &dyn EntityManager<T>,
        request: &ResourceRequest,
        entity: T,
    ) -> ResourceResult<Submission<T>> {
        let mut form = self.forms.create_named(
            None,
            Arc::clone(&self.form_type),
            entity,
            FormOptions::api(),
        );
        form.handle_request(request);

        if form.is_submitted() && form.is_valid() {
            let mut entity = form.into_data();
            persist_and_evict(manager, &mut entity).await?;
            return Ok(Ok(entity));
        }

        let errors = form.into_errors();
        tracing::debug!(
            form = %errors.form,
            submitted = errors.submitted,
            "Form rejected"
        );
        Ok(Err(errors))
    }
}

async fn resolve<T: Entity>(manager: &dyn EntityManager<T>, id: &Value) -> ResourceResult<T> {
    let found = match coerce_id(id) {
        Some(id) => manager.find(id).await?,
        None => None,
    };

    if let Some(entity) = found {
        tracing::debug!(
            resource = T::resource_name_singular(),
            id = ?entity.id(),
            "Resolved entity"
        );
        return Ok(entity);
    }

    let id = display_id(id);
    tracing::warn!(resource = T::resource_name_singular(), %id, "Entity not found");
    Err(ResourceError::not_found(T::resource_name_singular(), id))
}

async fn persist_and_evict<T: Entity>(manager: &dyn EntityManager<T>, entity: &mut T) -> ResourceResult<()> {
    manager.persist(entity).await?;
    manager.flush().await?;
    clear_cache(manager.cache()).await?;

    tracing::info!(
        resource = T::resource_name_singular(),
        id = ?entity.id(),
        "Saved entity"
    );
    Ok(())
}

/// Evict the entity, collection and query regions, in that order
///
/// Eviction covers the whole gateway since a write to one type can stale
/// cached joins or aggregates of another. Without a cache this does nothing.
pub async fn clear_cache(cache: Option<Arc<dyn Cache>>) -> Result<(), StorageError> {
    let Some(cache) = cache else {
        return Ok(());
    };

    cache.evict_entity_regions().await?;
    cache.evict_collection_regions().await?;
    cache.evict_query_regions().await?;
    tracing::debug!("Evicted entity, collection and query cache regions");
    Ok(())
}

fn request_id(request: &ResourceRequest) -> Value {
    request.get(ID_PARAM).cloned().unwrap_or(Value::Null)
}
