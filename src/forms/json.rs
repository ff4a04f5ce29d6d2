//! JSON payload binding
//!
//! [`JsonForm`] binds a JSON payload onto an entity by coercing each declared
//! field, running its filters and validators, then merging the bound values
//! over the serialized entity and deserializing the result. The bound entity
//! is therefore a new instance, never the one the form was created with.

use crate::core::entity::Entity;
use crate::core::form::{
    FieldKind, FieldValidationError, Form, FormErrors, FormFactory, FormOptions, FormType,
};
use crate::core::request::ResourceRequest;
use axum::http::Method;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Payload key carrying the anti-forgery token
pub const CSRF_FIELD: &str = "_token";

const NOT_AN_OBJECT: &str = "This form should be an object.";
const EXTRA_FIELDS: &str = "This form should not contain extra fields.";
const INVALID_CSRF: &str = "The CSRF token is invalid. Please try to resubmit the form.";
const INVALID_VALUE: &str = "This value is not valid.";

/// Factory for [`JsonForm`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormFactory;

impl JsonFormFactory {
    pub fn new() -> Self {
        Self
    }
}

impl<T: Entity> FormFactory<T> for JsonFormFactory {
    fn create_named(
        &self,
        name: Option<&str>,
        form_type: Arc<dyn FormType<T>>,
        data: T,
        options: FormOptions,
    ) -> Box<dyn Form<T>> {
        Box::new(JsonForm::new(name.map(str::to_string), form_type, data, options))
    }
}

/// A form bound to one entity, fed from a JSON payload
pub struct JsonForm<T: Entity> {
    name: Option<String>,
    form_type: Arc<dyn FormType<T>>,
    options: FormOptions,
    data: T,
    submitted: bool,
    errors: Vec<String>,
    field_errors: Vec<FieldValidationError>,
}

impl<T: Entity> JsonForm<T> {
    pub fn new(
        name: Option<String>,
        form_type: Arc<dyn FormType<T>>,
        data: T,
        options: FormOptions,
    ) -> Self {
        Self {
            name,
            form_type,
            options,
            data,
            submitted: false,
            errors: Vec::new(),
            field_errors: Vec::new(),
        }
    }

    /// An unnamed form only counts as present when a declared field is sent
    ///
    /// Non-object payloads are still submitted so the shape error surfaces.
    fn mentions_any_field(&self, payload: &Value) -> bool {
        let Value::Object(submitted) = payload else {
            return true;
        };
        self.form_type
            .fields()
            .iter()
            .any(|field| submitted.contains_key(&field.name))
    }

    fn has_errors(&self) -> bool {
        !self.errors.is_empty() || !self.field_errors.is_empty()
    }

    fn submit(&mut self, payload: &Value, clear_missing: bool) {
        let Value::Object(submitted) = payload else {
            self.errors.push(NOT_AN_OBJECT.to_string());
            return;
        };

        if self.options.csrf_protection {
            let token = submitted.get(CSRF_FIELD).and_then(Value::as_str);
            let valid = matches!(
                (token, self.options.csrf_token.as_deref()),
                (Some(given), Some(expected)) if given == expected
            );
            if !valid {
                self.errors.push(INVALID_CSRF.to_string());
            }
        }

        let form_type = Arc::clone(&self.form_type);
        let fields = form_type.fields();

        if !self.options.allow_extra_fields {
            let has_extra = submitted
                .keys()
                .any(|key| key != CSRF_FIELD && !fields.iter().any(|f| &f.name == key));
            if has_extra {
                self.errors.push(EXTRA_FIELDS.to_string());
            }
        }

        let mut bound = Map::new();
        for field in fields {
            let raw = match submitted.get(&field.name) {
                Some(value) => value.clone(),
                None if clear_missing => Value::Null,
                None => continue,
            };

            let value = match coerce(field.kind, raw) {
                Ok(value) => value,
                Err(message) => {
                    self.field_errors
                        .push(FieldValidationError::new(&field.name, message));
                    continue;
                }
            };

            let value = field
                .filters
                .iter()
                .fold(value, |value, filter| filter(&field.name, value));

            for validator in &field.validators {
                if let Err(message) = validator(&field.name, &value) {
                    self.field_errors
                        .push(FieldValidationError::new(&field.name, message));
                }
            }

            bound.insert(field.name.clone(), value);
        }

        if self.has_errors() {
            return;
        }

        let mut merged = match serde_json::to_value(&self.data) {
            Ok(Value::Object(existing)) => existing,
            _ => {
                self.errors.push(INVALID_VALUE.to_string());
                return;
            }
        };
        merged.extend(bound);

        match serde_json::from_value::<T>(Value::Object(merged)) {
            Ok(entity) => {
                self.field_errors.extend(form_type.validate(&entity));
                self.data = entity;
            }
            Err(e) => {
                tracing::debug!(
                    form = form_type.name(),
                    error = %e,
                    "Bound payload does not deserialize into the entity"
                );
                self.errors.push(INVALID_VALUE.to_string());
            }
        }
    }
}

impl<T: Entity> Form<T> for JsonForm<T> {
    fn handle_request(&mut self, request: &ResourceRequest) {
        if request.method() != self.options.method {
            return;
        }

        let Some(payload) = request.payload() else {
            return;
        };

        let submitted = match &self.name {
            Some(name) => match payload.get(name) {
                Some(value) => value,
                None => return,
            },
            None if !self.mentions_any_field(payload) => return,
            None => payload,
        };

        self.submitted = true;
        let clear_missing = request.method() != Method::PATCH;
        self.submit(submitted, clear_missing);
    }

    fn is_submitted(&self) -> bool {
        self.submitted
    }

    fn is_valid(&self) -> bool {
        self.submitted && !self.has_errors()
    }

    fn data(&self) -> &T {
        &self.data
    }

    fn into_data(self: Box<Self>) -> T {
        self.data
    }

    fn into_errors(self: Box<Self>) -> FormErrors {
        FormErrors {
            form: self.form_type.name().to_string(),
            submitted: self.submitted,
            errors: self.errors,
            fields: self.field_errors,
        }
    }
}

/// Coerce a submitted value according to the field kind. `null` is kept for
/// every kind; empty strings become `null` for numeric kinds.
fn coerce(kind: FieldKind, value: Value) -> Result<Value, &'static str> {
    if value.is_null() {
        return Ok(value);
    }

    match kind {
        FieldKind::Any => Ok(value),
        FieldKind::Text => match value {
            Value::String(_) => Ok(value),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err("Please enter a valid text."),
        },
        FieldKind::Integer => match &value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(json!(i)),
                None => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Ok(json!(f as i64))
                    }
                    _ => Err("Please enter an integer."),
                },
            },
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| json!(i))
                .map_err(|_| "Please enter an integer."),
            _ => Err("Please enter an integer."),
        },
        FieldKind::Number => match &value {
            Value::Number(_) => Ok(value),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(json!(f)),
                _ => Err("Please enter a number."),
            },
            _ => Err("Please enter a number."),
        },
        FieldKind::Boolean => match &value {
            Value::Bool(_) => Ok(value),
            Value::String(s) => match s.trim() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" | "" => Ok(Value::Bool(false)),
                _ => Err("Please choose a valid boolean."),
            },
            Value::Number(n) => match n.as_i64() {
                Some(1) => Ok(Value::Bool(true)),
                Some(0) => Ok(Value::Bool(false)),
                _ => Err("Please choose a valid boolean."),
            },
            _ => Err("Please choose a valid boolean."),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::form::FieldDefinition;
    use crate::core::validation::filters::trim;
    use crate::core::validation::validators::{not_blank, positive};
    use crate::forms::FormSchema;
    use crate::impl_resource_entity;

    impl_resource_entity!(Product, "product", "products", {
        name: String,
        price: f64,
        stock: i64,
        active: bool,
    });

    fn product_form() -> Arc<dyn FormType<Product>> {
        Arc::new(
            FormSchema::<Product>::new("product")
                .field(FieldDefinition::text("name").filter(trim()).validator(not_blank()))
                .field(FieldDefinition::number("price").validator(positive()))
                .field(FieldDefinition::integer("stock"))
                .field(FieldDefinition::boolean("active")),
        )
    }

    fn bind(
        data: Product,
        options: FormOptions,
        request: &ResourceRequest,
    ) -> Box<dyn Form<Product>> {
        let mut form = JsonFormFactory.create_named(None, product_form(), data, options);
        form.handle_request(request);
        form
    }

    fn full_payload() -> Value {
        json!({"name": "  Lamp ", "price": "12.5", "stock": "3", "active": "1"})
    }

    #[test]
    fn test_valid_payload_binds_with_coercion() {
        let request = ResourceRequest::post_request().with_payload(full_payload());
        let form = bind(Product::default(), FormOptions::api(), &request);

        assert!(form.is_submitted());
        assert!(form.is_valid());

        let product = form.into_data();
        assert_eq!(product.name, "Lamp");
        assert_eq!(product.price, 12.5);
        assert_eq!(product.stock, 3);
        assert!(product.active);
        assert_eq!(product.id, None);
    }

    #[test]
    fn test_bind_keeps_identity_of_existing_entity() {
        let existing = Product {
            id: Some(4),
            name: "Old".into(),
            ..Product::default()
        };
        let request = ResourceRequest::post_request().with_payload(full_payload());
        let product = bind(existing, FormOptions::api(), &request).into_data();

        assert_eq!(product.id, Some(4));
        assert_eq!(product.name, "Lamp");
    }

    #[test]
    fn test_missing_payload_is_not_submitted() {
        let request = ResourceRequest::post_request();
        let form = bind(Product::default(), FormOptions::api(), &request);

        assert!(!form.is_submitted());
        assert!(!form.is_valid());
        let errors = form.into_errors();
        assert!(!errors.submitted);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_payload_without_declared_fields_is_not_submitted() {
        for payload in [json!({}), json!({"unknown": 1}), json!({"_token": "secret"})] {
            let request = ResourceRequest::post_request().with_payload(payload);
            let form = bind(Product::default(), FormOptions::api(), &request);

            assert!(!form.is_submitted());
            let errors = form.into_errors();
            assert!(!errors.submitted);
            assert!(errors.is_empty());
        }
    }

    #[test]
    fn test_one_declared_field_submits_with_extras_reported() {
        let request = ResourceRequest::new(Method::PATCH)
            .with_payload(json!({"stock": 2, "unknown": 1}));
        let options = FormOptions::api().with_method(Method::PATCH);
        let form = bind(Product::default(), options, &request);

        assert!(form.is_submitted());
        assert_eq!(form.into_errors().errors, vec![EXTRA_FIELDS.to_string()]);
    }

    #[test]
    fn test_method_mismatch_is_not_submitted() {
        let request = ResourceRequest::delete_request().with_payload(full_payload());
        let form = bind(Product::default(), FormOptions::api(), &request);
        assert!(!form.is_submitted());
    }

    #[test]
    fn test_field_errors_are_reported() {
        let request = ResourceRequest::post_request()
            .with_payload(json!({"name": "   ", "price": -1, "stock": "many", "active": true}));
        let form = bind(Product::default(), FormOptions::api(), &request);

        assert!(form.is_submitted());
        assert!(!form.is_valid());

        let errors = form.into_errors();
        assert_eq!(errors.form, "product");
        assert_eq!(errors.field_messages("name"), vec!["This value should not be blank."]);
        assert_eq!(errors.field_messages("price"), vec!["This value should be positive."]);
        assert_eq!(errors.field_messages("stock"), vec!["Please enter an integer."]);
        assert!(errors.field_messages("active").is_empty());
    }

    #[test]
    fn test_invalid_bind_leaves_data_untouched() {
        let existing = Product {
            id: Some(1),
            name: "Keep".into(),
            ..Product::default()
        };
        let request = ResourceRequest::post_request().with_payload(json!({"name": ""}));
        let form = bind(existing, FormOptions::api(), &request);

        assert!(!form.is_valid());
        assert_eq!(form.data().name, "Keep");
    }

    #[test]
    fn test_extra_fields_rejected_unless_allowed() {
        let mut payload = full_payload();
        payload["color"] = json!("red");

        let request = ResourceRequest::post_request().with_payload(payload);
        let errors = bind(Product::default(), FormOptions::api(), &request).into_errors();
        assert_eq!(errors.errors, vec![EXTRA_FIELDS.to_string()]);

        let allowed = FormOptions::api().allow_extra_fields(true);
        assert!(bind(Product::default(), allowed, &request).is_valid());
    }

    #[test]
    fn test_non_object_payload() {
        let request = ResourceRequest::post_request().with_payload(json!([1, 2]));
        let form = bind(Product::default(), FormOptions::api(), &request);

        assert!(form.is_submitted());
        assert_eq!(form.into_errors().errors, vec![NOT_AN_OBJECT.to_string()]);
    }

    #[test]
    fn test_csrf_protection() {
        let options = FormOptions {
            csrf_token: Some("secret".into()),
            ..FormOptions::default()
        };

        let request = ResourceRequest::post_request().with_payload(full_payload());
        let errors = bind(Product::default(), options.clone(), &request).into_errors();
        assert_eq!(errors.errors, vec![INVALID_CSRF.to_string()]);

        let mut payload = full_payload();
        payload[CSRF_FIELD] = json!("secret");
        let request = ResourceRequest::post_request().with_payload(payload);
        assert!(bind(Product::default(), options, &request).is_valid());
    }

    #[test]
    fn test_missing_fields_cleared_on_post() {
        let existing = Product {
            id: Some(1),
            name: "Lamp".into(),
            stock: 9,
            ..Product::default()
        };
        let request = ResourceRequest::post_request().with_payload(json!({"name": "Lamp"}));
        let form = bind(existing, FormOptions::api(), &request);

        // price/stock/active cleared to null, which the entity cannot hold
        assert!(!form.is_valid());
        assert_eq!(form.into_errors().errors, vec![INVALID_VALUE.to_string()]);
    }

    #[test]
    fn test_missing_fields_kept_on_patch() {
        let existing = Product {
            id: Some(1),
            name: "Lamp".into(),
            stock: 9,
            ..Product::default()
        };
        let request = ResourceRequest::new(Method::PATCH).with_payload(json!({"stock": 2}));
        let options = FormOptions::api().with_method(Method::PATCH);
        let product = bind(existing, options, &request).into_data();

        assert_eq!(product.name, "Lamp");
        assert_eq!(product.stock, 2);
    }

    #[test]
    fn test_named_form_reads_nested_payload() {
        let request = ResourceRequest::post_request()
            .with_payload(json!({"product": full_payload()}));
        let mut form =
            JsonFormFactory.create_named(Some("product"), product_form(), Product::default(), FormOptions::api());
        form.handle_request(&request);
        assert!(form.is_valid());

        let request = ResourceRequest::post_request().with_payload(full_payload());
        let mut form =
            JsonFormFactory.create_named(Some("product"), product_form(), Product::default(), FormOptions::api());
        form.handle_request(&request);
        assert!(!form.is_submitted());
    }

    #[test]
    fn test_coerce_kinds() {
        assert_eq!(coerce(FieldKind::Text, json!(12)), Ok(json!("12")));
        assert_eq!(coerce(FieldKind::Text, json!({})), Err("Please enter a valid text."));
        assert_eq!(coerce(FieldKind::Integer, json!(3.0)), Ok(json!(3)));
        assert_eq!(coerce(FieldKind::Integer, json!("")), Ok(Value::Null));
        assert_eq!(coerce(FieldKind::Number, json!("x")), Err("Please enter a number."));
        assert_eq!(coerce(FieldKind::Boolean, json!(0)), Ok(json!(false)));
        assert_eq!(coerce(FieldKind::Boolean, json!("yes")), Err("Please choose a valid boolean."));
        assert_eq!(coerce(FieldKind::Any, json!([1])), Ok(json!([1])));
        assert_eq!(coerce(FieldKind::Integer, Value::Null), Ok(Value::Null));
    }
}
