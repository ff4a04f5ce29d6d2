//! Reusable field validators
//!
//! Every validator except `required`/`not_blank` lets `null` and values of an
//! unexpected JSON type through, so rules compose: pair them with `required`
//! to forbid missing values.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Validator: field must not be null
pub fn required() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |_: &str, value: &Value| {
        if value.is_null() {
            Err("This value should not be null.".to_string())
        } else {
            Ok(())
        }
    }
}

/// Validator: field must not be null, an empty string, or an empty array
pub fn not_blank() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |_: &str, value: &Value| {
        let blank = match value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        };
        if blank {
            Err("This value should not be blank.".to_string())
        } else {
            Ok(())
        }
    }
}

/// Validator: always valid
pub fn optional() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |_: &str, _: &Value| Ok(())
}

/// Validator: number must be strictly positive
pub fn positive() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |_: &str, value: &Value| match value.as_f64() {
        Some(num) if num <= 0.0 => Err("This value should be positive.".to_string()),
        _ => Ok(()),
    }
}

/// Validator: string length (in characters) must be within range
pub fn string_length(
    min: usize,
    max: usize,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |_: &str, value: &Value| {
        let Some(s) = value.as_str() else {
            return Ok(());
        };
        let len = s.chars().count();
        if len < min {
            Err(format!(
                "This value is too short. It should have {} characters or more.",
                min
            ))
        } else if len > max {
            Err(format!(
                "This value is too long. It should have {} characters or less.",
                max
            ))
        } else {
            Ok(())
        }
    }
}

/// Validator: number must not exceed maximum
pub fn max_value(max: f64) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |_: &str, value: &Value| match value.as_f64() {
        Some(num) if num > max => Err(format!(
            "This value should be less than or equal to {}.",
            max
        )),
        _ => Ok(()),
    }
}

/// Validator: value must be in allowed list
pub fn in_list(
    allowed: Vec<String>,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |_: &str, value: &Value| match value.as_str() {
        Some(s) if !allowed.iter().any(|a| a == s) => Err(format!(
            "The value you selected is not a valid choice ({}).",
            allowed.join(", ")
        )),
        _ => Ok(()),
    }
}

/// Validator: date must match a chrono format
pub fn date_format(
    format: &'static str,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |_: &str, value: &Value| {
        let Some(s) = value.as_str() else {
            return Ok(());
        };
        match chrono::NaiveDate::parse_from_str(s, format) {
            Ok(_) => Ok(()),
            Err(_) => Err(format!("This value is not a valid date ({}).", format)),
        }
    }
}

/// Validator: string must look like an email address
pub fn email() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |_: &str, value: &Value| {
        static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
        let Some(s) = value.as_str() else {
            return Ok(());
        };
        let regex = EMAIL_REGEX.get_or_init(|| {
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
                .expect("email pattern is valid")
        });
        if regex.is_match(s) {
            Ok(())
        } else {
            Err("This value is not a valid email address.".to_string())
        }
    }
}

/// Validator: string must match a regular expression
pub fn matches(regex: Regex) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |_: &str, value: &Value| match value.as_str() {
        Some(s) if !regex.is_match(s) => Err("This value is not valid.".to_string()),
        _ => Ok(()),
    }
}
