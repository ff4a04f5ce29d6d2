//! # Resource Controller
//!
//! A generic REST resource controller: one reusable component implementing
//! list/get/create/update/delete for any persisted entity type.
//!
//! ## Features
//!
//! - **Generic controller**: `ResourceController<T>` bound at construction to a
//!   persistence gateway, a form factory and a form type
//! - **Dual error channel**: missing entities are faults, invalid payloads are
//!   returned as values (`Result<Result<T, FormErrors>, ResourceError>`)
//! - **Coarse cache invalidation**: every successful write evicts the entity,
//!   collection and query regions of the whole gateway
//! - **Declarative forms**: field coercion, filters and validators
//! - **REST exposure**: axum routes, health checks, YAML configuration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use resource_controller::prelude::*;
//!
//! impl_resource_entity!(Person, "person", "people", {
//!     name: String,
//!     age: i64,
//! });
//!
//! let form = FormSchema::<Person>::for_entity()
//!     .field(FieldDefinition::text("name").filter(trim()).validator(not_blank()))
//!     .field(FieldDefinition::integer("age").validator(positive()));
//!
//! let manager = Arc::new(InMemoryEntityManager::new());
//! let controller = ResourceController::with_json_forms(manager, Arc::new(form));
//!
//! ServerBuilder::new()
//!     .register_resource(controller)?
//!     .serve("127.0.0.1:3000")
//!     .await?;
//! ```

pub mod config;
pub mod controller;
pub mod core;
pub mod entities;
pub mod forms;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        Cache, Entity, EntityClass, EntityError, EntityId, EntityManager, FieldDefinition,
        FieldKind, FieldValidationError, Form, FormErrors, FormFactory, FormOptions, FormType,
        ID_PARAM, Repository, ResourceError, ResourceRequest, ResourceResult, SessionFactory,
        SharedSession, StorageError,
    };

    // === Validation ===
    pub use crate::core::validation::filters::{lowercase, round_decimals, trim, uppercase};
    pub use crate::core::validation::validators::{
        date_format, email, in_list, matches, max_value, not_blank, optional, positive, required,
        string_length,
    };

    // === Controller ===
    pub use crate::controller::{ResourceController, Submission, clear_cache};

    // === Forms ===
    pub use crate::forms::{FormSchema, JsonForm, JsonFormFactory};

    // === Macros ===
    pub use crate::impl_resource_entity;

    // === Storage ===
    pub use crate::storage::{CacheStats, InMemoryRegionCache};
    #[cfg(feature = "in-memory")]
    pub use crate::storage::{InMemoryEntityManager, InMemoryRepository, InMemorySession};

    // === Config ===
    pub use crate::config::{AppConfig, CacheConfig, ResourceConfig, ServerConfig};

    // === Server ===
    pub use crate::server::{
        ControllerDescriptor, ResourceDescriptor, ResourceRegistry, RestExposure, ServerBuilder,
    };

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;

    // === Axum ===
    pub use axum::{
        Router,
        extract::{Path, State},
        routing::{delete, get, post},
    };
}
