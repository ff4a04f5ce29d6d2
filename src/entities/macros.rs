//! Macros for reducing boilerplate when defining entities

/// Define an entity struct together with its `Entity` implementation
///
/// The generated struct carries an optional integer `id` followed by the
/// declared fields, and derives everything the controller, forms and storage
/// need (`Default`, `Clone`, `Debug`, `PartialEq` and serde).
///
/// # Example
///
/// ```rust,ignore
/// use resource_controller::prelude::*;
///
/// impl_resource_entity!(Person, "person", "people", {
///     name: String,
///     age: i64,
/// });
///
/// let person = Person { id: None, name: "Ada".into(), age: 36 };
/// assert!(person.is_new());
/// ```
#[macro_export]
macro_rules! impl_resource_entity {
    (
        $type:ident,
        $singular:expr,
        $plural:expr,
        {
            $( $field:ident : $field_type:ty ),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $type {
            /// Identity, `None` until first persisted
            #[serde(default)]
            pub id: Option<$crate::core::entity::EntityId>,
            $( pub $field : $field_type ),*
        }

        impl $crate::core::entity::Entity for $type {
            fn resource_name() -> &'static str {
                $plural
            }

            fn resource_name_singular() -> &'static str {
                $singular
            }

            fn id(&self) -> Option<$crate::core::entity::EntityId> {
                self.id
            }

            fn assign_id(&mut self, id: $crate::core::entity::EntityId) {
                self.id = Some(id);
            }
        }
    };
}
