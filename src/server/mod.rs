//! Server module for building HTTP servers with auto-registered routes
//!
//! This module provides a `ServerBuilder` that registers:
//! - REST routes for every registered resource controller
//! - Health check routes
//! - Any custom routes supplied by the application

pub mod builder;
pub mod exposure;
pub mod resource_registry;

pub use builder::ServerBuilder;
pub use exposure::RestExposure;
pub use resource_registry::{ControllerDescriptor, ResourceDescriptor, ResourceRegistry};
