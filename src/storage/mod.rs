//! Storage implementations

pub mod cache;
#[cfg(feature = "in-memory")]
pub mod in_memory;

pub use cache::{CacheStats, InMemoryRegionCache};
#[cfg(feature = "in-memory")]
pub use in_memory::{InMemoryEntityManager, InMemoryRepository, InMemorySession};
