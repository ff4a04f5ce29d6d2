//! Typed error handling for resource controllers
//!
//! Faults are reported through [`ResourceError`]. Validation failures are not
//! faults: they travel as a normal value ([`FormErrors`](crate::core::form::FormErrors))
//! inside `Ok(..)`, so nothing in this module describes them.
//!
//! # Error Categories
//!
//! - [`EntityError`]: entity resolution failures (not found)
//! - [`StorageError`]: persistence gateway and cache failures
//! - [`RequestError`]: malformed inbound requests
//!
//! # Example
//!
//! ```rust,ignore
//! match controller.get(&request).await {
//!     Ok(entity) => println!("Found: {:?}", entity),
//!     Err(ResourceError::Entity(EntityError::NotFound { id, .. })) => {
//!         println!("Entity {} not found", id);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The main fault type raised by controller operations
#[derive(Debug)]
pub enum ResourceError {
    /// Entity resolution errors
    Entity(EntityError),

    /// Persistence gateway and cache errors
    Storage(StorageError),

    /// HTTP/Request errors
    Request(RequestError),

    /// Internal errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Entity(e) => write!(f, "{}", e),
            ResourceError::Storage(e) => write!(f, "{}", e),
            ResourceError::Request(e) => write!(f, "{}", e),
            ResourceError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Entity(e) => Some(e),
            ResourceError::Storage(e) => Some(e),
            ResourceError::Request(e) => Some(e),
            ResourceError::Internal(_) => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ResourceError {
    /// Shorthand for a not-found fault on the given entity type
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        ResourceError::Entity(EntityError::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        })
    }

    /// Whether this is an entity resolution failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResourceError::Entity(EntityError::NotFound { .. }))
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResourceError::Entity(e) => e.status_code(),
            ResourceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ResourceError::Request(e) => e.status_code(),
            ResourceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ResourceError::Entity(e) => e.error_code(),
            ResourceError::Storage(e) => e.error_code(),
            ResourceError::Request(e) => e.error_code(),
            ResourceError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ResourceError::Entity(EntityError::NotFound { entity_type, id }) => {
                Some(serde_json::json!({
                    "entity_type": entity_type,
                    "id": id
                }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ResourceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// Errors related to entity resolution
#[derive(Debug)]
pub enum EntityError {
    /// No entity with the requested identity. `id` is the raw requested value,
    /// which may not even be a valid identifier.
    NotFound { entity_type: String, id: String },
}

impl fmt::Display for EntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityError::NotFound { entity_type, id } => {
                write!(f, "Entity {} ({}) not found", entity_type, id)
            }
        }
    }
}

impl std::error::Error for EntityError {}

impl EntityError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EntityError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
        }
    }
}

impl From<EntityError> for ResourceError {
    fn from(err: EntityError) -> Self {
        ResourceError::Entity(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by persistence gateways and cache handles
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A lock guarding gateway state was poisoned
    #[error("Failed to acquire {resource} lock: {message}")]
    Lock { resource: String, message: String },

    /// A stored row could not be converted to or from the entity type
    #[error("Failed to serialize/deserialize {entity_type}: {message}")]
    Serialization {
        entity_type: String,
        message: String,
    },

    /// Second-level cache failure
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Backend-specific failure (constraint violation, lock conflict, ...)
    #[error("{backend} error: {message}")]
    Backend { backend: String, message: String },
}

impl StorageError {
    /// Wrap a poisoned-lock error
    pub fn lock(resource: &str, err: impl fmt::Display) -> Self {
        StorageError::Lock {
            resource: resource.to_string(),
            message: err.to_string(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::Lock { .. } => "STORAGE_LOCK_ERROR",
            StorageError::Serialization { .. } => "STORAGE_SERIALIZATION_ERROR",
            StorageError::Cache { .. } => "CACHE_ERROR",
            StorageError::Backend { .. } => "STORAGE_ERROR",
        }
    }
}

impl From<StorageError> for ResourceError {
    fn from(err: StorageError) -> Self {
        ResourceError::Storage(err)
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Errors related to HTTP requests
#[derive(Debug)]
pub enum RequestError {
    /// Request body is not valid JSON
    InvalidBody { message: String },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::InvalidBody { message } => {
                write!(f, "Invalid request body: {}", message)
            }
        }
    }
}

impl std::error::Error for RequestError {}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::InvalidBody { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::InvalidBody { .. } => "INVALID_BODY",
        }
    }
}

impl From<RequestError> for ResourceError {
    fn from(err: RequestError) -> Self {
        ResourceError::Request(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for ResourceError {
    fn from(err: serde_json::Error) -> Self {
        ResourceError::Request(RequestError::InvalidBody {
            message: err.to_string(),
        })
    }
}

impl From<anyhow::Error> for ResourceError {
    fn from(err: anyhow::Error) -> Self {
        ResourceError::Internal(err.to_string())
    }
}

/// A specialized Result type for controller operations
pub type ResourceResult<T> = Result<T, ResourceError>;
