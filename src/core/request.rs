//! Inbound request abstraction consumed by the controller

use crate::core::entity::EntityId;
use axum::http::Method;
use serde_json::Value;
use std::collections::HashMap;

/// Name of the identity parameter read by `get`, `update` and `delete`
pub const ID_PARAM: &str = "id";

/// Transport-agnostic view of an inbound request
///
/// Carries the HTTP method, untyped parameters (path and query merged) and an
/// optional payload to bind onto an entity.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    method: Method,
    params: HashMap<String, Value>,
    payload: Option<Value>,
}

impl ResourceRequest {
    /// Create an empty request with the given method
    pub fn new(method: Method) -> Self {
        Self {
            method,
            params: HashMap::new(),
            payload: None,
        }
    }

    pub fn get_request() -> Self {
        Self::new(Method::GET)
    }

    pub fn post_request() -> Self {
        Self::new(Method::POST)
    }

    pub fn delete_request() -> Self {
        Self::new(Method::DELETE)
    }

    /// Add a parameter, replacing any previous value with the same name
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Shorthand for `with_param("id", ..)`
    pub fn with_id(self, id: impl Into<Value>) -> Self {
        self.with_param(ID_PARAM, id)
    }

    /// Attach the payload to bind
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get a parameter by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }
}

/// Coerce an untyped identifier into an `EntityId`
///
/// Integers pass through, strings are trimmed and parsed, floats are accepted
/// only when they carry no fraction. Anything else has no identity.
pub fn coerce_id(value: &Value) -> Option<EntityId> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as EntityId)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Render an untyped identifier the way it is reported in not-found errors
pub fn display_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
