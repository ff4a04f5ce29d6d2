//! Declarative form type

use crate::core::entity::Entity;
use crate::core::form::{FieldDefinition, FieldValidationError, FormType};
use std::fmt;
use std::sync::Arc;

type EntityConstraint<T> = Arc<dyn Fn(&T) -> Vec<FieldValidationError> + Send + Sync>;

/// A form type assembled from field definitions and entity constraints
///
/// ```rust,ignore
/// let form = FormSchema::<User>::new("user")
///     .field(FieldDefinition::text("name").filter(trim()).validator(not_blank()))
///     .field(FieldDefinition::text("email").validator(email()));
/// ```
pub struct FormSchema<T: Entity> {
    name: String,
    fields: Vec<FieldDefinition>,
    constraints: Vec<EntityConstraint<T>>,
}

impl<T: Entity> FormSchema<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Form named after the entity's singular resource name
    pub fn for_entity() -> Self {
        Self::new(T::resource_name_singular())
    }

    /// Declare a field
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Add an entity-level constraint, checked after a successful bind
    pub fn constraint<F>(mut self, constraint: F) -> Self
    where
        F: Fn(&T) -> Vec<FieldValidationError> + Send + Sync + 'static,
    {
        self.constraints.push(Arc::new(constraint));
        self
    }
}

impl<T: Entity> FormType<T> for FormSchema<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    fn validate(&self, entity: &T) -> Vec<FieldValidationError> {
        self.constraints.iter().flat_map(|c| c(entity)).collect()
    }
}

impl<T: Entity> fmt::Debug for FormSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSchema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("constraints", &self.constraints.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validation::validators::not_blank;
    use crate::impl_resource_entity;

    impl_resource_entity!(Widget, "widget", "widgets", {
        name: String,
        size: i64,
    });

    #[test]
    fn test_for_entity_uses_singular_name() {
        let schema = FormSchema::<Widget>::for_entity();
        assert_eq!(schema.name(), "widget");
        assert!(schema.fields().is_empty());
    }

    #[test]
    fn test_fields_keep_declaration_order() {
        let schema = FormSchema::<Widget>::new("widget")
            .field(FieldDefinition::text("name").validator(not_blank()))
            .field(FieldDefinition::integer("size"));

        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "size"]);
    }

    #[test]
    fn test_constraints_run_on_entity() {
        let schema = FormSchema::<Widget>::new("widget").constraint(|w: &Widget| {
            if w.size > 10 && w.name.is_empty() {
                vec![FieldValidationError::new("name", "Large widgets need a name.")]
            } else {
                Vec::new()
            }
        });

        let small = Widget {
            size: 1,
            ..Widget::default()
        };
        let large = Widget {
            size: 20,
            ..Widget::default()
        };

        assert!(schema.validate(&small).is_empty());
        assert_eq!(schema.validate(&large).len(), 1);
    }
}
