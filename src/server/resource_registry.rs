//! Resource registry collecting the routes of every registered controller

use super::exposure::RestExposure;
use crate::controller::ResourceController;
use crate::core::entity::Entity;
use anyhow::Result;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait that describes how to build routes for a resource
pub trait ResourceDescriptor: Send + Sync {
    /// The resource type name (singular, e.g., "order")
    fn resource_type(&self) -> &str;

    /// The plural form the routes are mounted under (e.g., "orders")
    fn plural(&self) -> &str;

    /// Build the routes for this resource
    ///
    /// - GET /{plural}
    /// - POST /{plural}
    /// - GET /{plural}/{id}
    /// - POST /{plural}/{id}
    /// - DELETE /{plural}/{id}
    fn build_routes(&self) -> Router;
}

/// Descriptor exposing a [`ResourceController`] over REST
pub struct ControllerDescriptor<T: Entity> {
    plural: String,
    controller: Arc<ResourceController<T>>,
}

impl<T: Entity> ControllerDescriptor<T> {
    /// Mount `controller` under the entity's own plural name
    pub fn new(controller: ResourceController<T>) -> Self {
        Self::with_plural(T::resource_name(), controller)
    }

    /// Mount `controller` under a custom plural name
    pub fn with_plural(plural: impl Into<String>, controller: ResourceController<T>) -> Self {
        Self {
            plural: plural.into(),
            controller: Arc::new(controller),
        }
    }
}

impl<T: Entity> ResourceDescriptor for ControllerDescriptor<T> {
    fn resource_type(&self) -> &str {
        T::resource_name_singular()
    }

    fn plural(&self) -> &str {
        &self.plural
    }

    fn build_routes(&self) -> Router {
        RestExposure::resource_routes(&self.plural, Arc::clone(&self.controller))
    }
}

/// Registry for all resources of the application
#[derive(Default)]
pub struct ResourceRegistry {
    descriptors: HashMap<String, Box<dyn ResourceDescriptor>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, replacing any previous one for the same type
    ///
    /// Fails when another resource type is already mounted under the same
    /// plural, since both would claim the same routes.
    pub fn register(&mut self, descriptor: Box<dyn ResourceDescriptor>) -> Result<()> {
        let resource_type = descriptor.resource_type().to_string();
        if let Some(existing) = self
            .descriptors
            .values()
            .find(|d| d.plural() == descriptor.plural() && d.resource_type() != resource_type)
        {
            return Err(anyhow::anyhow!(
                "Cannot mount {} under /{}: already used by {}",
                resource_type,
                descriptor.plural(),
                existing.resource_type()
            ));
        }

        tracing::debug!(
            resource = %resource_type,
            plural = descriptor.plural(),
            "Registered resource"
        );
        self.descriptors.insert(resource_type, descriptor);
        Ok(())
    }

    /// Build a router with the routes of every registered resource
    pub fn build_routes(&self) -> Router {
        self.descriptors
            .values()
            .fold(Router::new(), |router, descriptor| {
                router.merge(descriptor.build_routes())
            })
    }

    /// Get all registered resource types
    pub fn resource_types(&self) -> Vec<&str> {
        self.descriptors.keys().map(|s| s.as_str()).collect()
    }

    /// Route prefix a resource type is mounted under
    pub fn plural_of(&self, resource_type: &str) -> Option<&str> {
        self.descriptors.get(resource_type).map(|d| d.plural())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::FormSchema;
    use crate::storage::InMemoryEntityManager;

    crate::impl_resource_entity!(Order, "order", "orders", {
        total: f64,
    });

    struct MockDescriptor {
        resource_type: String,
        plural: String,
    }

    impl MockDescriptor {
        fn new(resource_type: &str, plural: &str) -> Self {
            Self {
                resource_type: resource_type.to_string(),
                plural: plural.to_string(),
            }
        }
    }

    impl ResourceDescriptor for MockDescriptor {
        fn resource_type(&self) -> &str {
            &self.resource_type
        }

        fn plural(&self) -> &str {
            &self.plural
        }

        fn build_routes(&self) -> Router {
            Router::new()
        }
    }

    fn order_controller() -> ResourceController<Order> {
        ResourceController::with_json_forms(
            Arc::new(InMemoryEntityManager::new()),
            Arc::new(FormSchema::<Order>::for_entity()),
        )
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = ResourceRegistry::new();
        assert!(registry.resource_types().is_empty());
    }

    #[test]
    fn test_register_duplicate_replaces() {
        let mut registry = ResourceRegistry::new();
        registry.register(Box::new(MockDescriptor::new("order", "orders"))).unwrap();
        registry.register(Box::new(MockDescriptor::new("order", "commandes"))).unwrap();

        assert_eq!(registry.resource_types().len(), 1);
        assert_eq!(registry.plural_of("order"), Some("commandes"));
    }

    #[test]
    fn test_register_same_plural_for_other_type_fails() {
        let mut registry = ResourceRegistry::new();
        registry.register(Box::new(ControllerDescriptor::new(order_controller()))).unwrap();

        let err = registry
            .register(Box::new(MockDescriptor::new("purchase", "orders")))
            .unwrap_err();
        assert!(err.to_string().contains("already used by order"));

        assert_eq!(registry.resource_types(), vec!["order"]);
        let _router = registry.build_routes();
    }

    #[test]
    fn test_controller_descriptor_names() {
        let descriptor = ControllerDescriptor::new(order_controller());
        assert_eq!(descriptor.resource_type(), "order");
        assert_eq!(descriptor.plural(), "orders");

        let renamed = ControllerDescriptor::with_plural("purchases", order_controller());
        assert_eq!(renamed.plural(), "purchases");
    }

    #[test]
    fn test_build_routes_with_resources() {
        let mut registry = ResourceRegistry::new();
        registry.register(Box::new(ControllerDescriptor::new(order_controller()))).unwrap();
        registry.register(Box::new(MockDescriptor::new("invoice", "invoices"))).unwrap();
        let _router = registry.build_routes();
    }
}
