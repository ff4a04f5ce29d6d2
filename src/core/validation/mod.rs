//! Validation and filtering building blocks for forms
//!
//! Filters transform a field value before validation; validators accept or
//! reject it with a message. Both receive the field name so messages can
//! mention it.

pub mod filters;
pub mod validators;

use serde_json::Value;
use std::sync::Arc;

/// A field validator: `Err(message)` rejects the value
pub type Validator = Arc<dyn Fn(&str, &Value) -> Result<(), String> + Send + Sync>;

/// A field filter: returns the transformed value
pub type Filter = Arc<dyn Fn(&str, Value) -> Value + Send + Sync>;
