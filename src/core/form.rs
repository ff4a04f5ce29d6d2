//! Form binding and validation contracts
//!
//! A form binds an inbound payload onto an entity and reports either the bound
//! entity or a [`FormErrors`] value. Invalid input is expected and frequent, so
//! it is never raised as a fault.

use crate::core::entity::Entity;
use crate::core::request::ResourceRequest;
use crate::core::validation::{Filter, Validator};
use axum::Json;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// How a declared field coerces incoming values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Strings; numbers and booleans are converted to their text form
    Text,
    /// Integers or integer strings
    Integer,
    /// Any number or numeric string
    Number,
    /// Booleans, "true"/"false", "1"/"0"
    Boolean,
    /// No coercion
    Any,
}

/// One field of a form: its name, coercion, filters and validators
#[derive(Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub kind: FieldKind,
    pub filters: Vec<Filter>,
    pub validators: Vec<Validator>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            filters: Vec::new(),
            validators: Vec::new(),
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Any)
    }

    /// Add a filter, applied in declaration order before validation
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str, serde_json::Value) -> serde_json::Value + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Add a validator
    pub fn validator<V>(mut self, validator: V) -> Self
    where
        V: Fn(&str, &serde_json::Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validator));
        self
    }
}

impl fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("filters", &self.filters.len())
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// Binding and validation rules for one entity type
pub trait FormType<T: Entity>: Send + Sync {
    /// Form name, used as the payload key for named forms
    fn name(&self) -> &str;

    /// Declared fields
    fn fields(&self) -> &[FieldDefinition];

    /// Entity-level constraints, run after a successful bind
    fn validate(&self, _entity: &T) -> Vec<FieldValidationError> {
        Vec::new()
    }
}

/// Options passed when creating a bound form
#[derive(Debug, Clone)]
pub struct FormOptions {
    /// Only requests with this method are submitted
    pub method: Method,
    /// Require a `_token` field matching `csrf_token`
    pub csrf_protection: bool,
    pub csrf_token: Option<String>,
    /// Accept payload keys that are not declared fields
    pub allow_extra_fields: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            method: Method::POST,
            csrf_protection: true,
            csrf_token: None,
            allow_extra_fields: false,
        }
    }
}

impl FormOptions {
    /// Options for a programmatic API boundary: no anti-forgery token
    pub fn api() -> Self {
        Self {
            csrf_protection: false,
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn allow_extra_fields(mut self, allow: bool) -> Self {
        self.allow_extra_fields = allow;
        self
    }
}

/// A form bound to one entity instance
pub trait Form<T: Entity>: Send {
    /// Bind the request payload onto the form
    fn handle_request(&mut self, request: &ResourceRequest);

    fn is_submitted(&self) -> bool;

    fn is_valid(&self) -> bool;

    /// Current data: the original entity, or the bound one after a valid bind
    fn data(&self) -> &T;

    /// Take the data out of the form
    fn into_data(self: Box<Self>) -> T;

    /// Take the failure report out of the form
    fn into_errors(self: Box<Self>) -> FormErrors;
}

/// Builds bound forms from a form type
pub trait FormFactory<T: Entity>: Send + Sync {
    /// Create a form. `name: None` builds an unnamed form that binds the whole
    /// payload.
    fn create_named(
        &self,
        name: Option<&str>,
        form_type: Arc<dyn FormType<T>>,
        data: T,
        options: FormOptions,
    ) -> Box<dyn Form<T>>;
}

/// Validation error for a specific field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl FieldValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The validation-failure value returned instead of an entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormErrors {
    /// Form type name
    pub form: String,
    /// Whether the request actually submitted the form
    pub submitted: bool,
    /// Errors not tied to a field
    pub errors: Vec<String>,
    /// Field-level errors
    pub fields: Vec<FieldValidationError>,
}

impl FormErrors {
    pub fn new(form: impl Into<String>, submitted: bool) -> Self {
        Self {
            form: form.into(),
            submitted,
            errors: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.fields.is_empty()
    }

    /// Messages reported for one field
    pub fn field_messages(&self, field: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.submitted {
            return write!(f, "Form '{}' was not submitted", self.form);
        }
        let mut parts: Vec<String> = self.errors.clone();
        parts.extend(
            self.fields
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message)),
        );
        write!(f, "Validation failed: {}", parts.join(", "))
    }
}

impl IntoResponse for FormErrors {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let body = serde_json::json!({
            "code": "VALIDATION_FAILED",
            "message": message,
            "details": self,
        });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}
