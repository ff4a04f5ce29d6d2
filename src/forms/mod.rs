//! Concrete form implementations
//!
//! - [`FormSchema`]: declarative form type built field by field
//! - [`JsonFormFactory`]: builds [`JsonForm`]s that bind JSON payloads

pub mod json;
pub mod schema;

pub use json::{JsonForm, JsonFormFactory};
pub use schema::FormSchema;
