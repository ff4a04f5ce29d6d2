//! Core module containing the fundamental traits and types of the controller

pub mod entity;
pub mod error;
pub mod form;
pub mod manager;
pub mod request;
pub mod validation;

pub use entity::{Entity, EntityClass, EntityId};
pub use error::{EntityError, RequestError, ResourceError, ResourceResult, StorageError};
pub use form::{
    FieldDefinition, FieldKind, FieldValidationError, Form, FormErrors, FormFactory, FormOptions,
    FormType,
};
pub use manager::{Cache, EntityManager, Repository, SessionFactory, SharedSession};
pub use request::{ID_PARAM, ResourceRequest};
