//! Entity traits defining the core abstraction for all managed types

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;

/// Identity type shared by every managed entity
pub type EntityId = i64;

/// Base trait for all entities managed by a resource controller.
///
/// The controller is generic over this trait and never looks at anything but
/// the identity. Everything else about the record is opaque to it:
/// - `Default` builds the blank instance used for creation
/// - `Serialize`/`DeserializeOwned` let forms and storage move it through JSON
/// - `id`/`assign_id` expose the single integer identity
pub trait Entity:
    Default + Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The plural resource name used in URLs (e.g., "users", "companies")
    fn resource_name() -> &'static str;

    /// The singular resource name (e.g., "user", "company")
    fn resource_name_singular() -> &'static str;

    /// Identity of this instance, `None` until it has been persisted
    fn id(&self) -> Option<EntityId>;

    /// Set the identity, called by the gateway on first persist
    fn assign_id(&mut self, id: EntityId);

    /// Whether the instance has never been persisted
    fn is_new(&self) -> bool {
        self.id().is_none()
    }
}

/// Descriptor identifying which entity type a component manages
///
/// This is the runtime counterpart of the `T: Entity` type parameter. Storage
/// uses it to key tables and cache regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityClass {
    pub singular: &'static str,
    pub plural: &'static str,
}

impl EntityClass {
    /// Descriptor for the entity type `T`
    pub fn of<T: Entity>() -> Self {
        Self {
            singular: T::resource_name_singular(),
            plural: T::resource_name(),
        }
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.singular)
    }
}
