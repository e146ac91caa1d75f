//! Tool parameter validation and typed accessors.
//!
//! [`validate_params`] checks a JSON object against a tool's declared
//! schema (required fields, primitive types, enums, array item types,
//! integer bounds) and injects declared defaults for absent fields. The
//! accessors below read the validated object.

use anyhow::{bail, Result};
use serde_json::{Map, Value};

/// Validate `params` against `schema` and return the object with defaults
/// filled in. A `null` params value is treated as `{}`.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let params_obj = match params {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => bail!("parameters must be an object, got {}", json_type_name(other)),
    };

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    for req_field in &required {
        match params_obj.get(*req_field) {
            None | Some(Value::Null) => bail!("missing required parameter: {}", req_field),
            _ => {}
        }
    }

    let mut result = params_obj.clone();

    for (prop_name, prop_schema) in &properties {
        match params_obj.get(prop_name) {
            Some(Value::Null) | None => {
                result.remove(prop_name);
                if let Some(default) = prop_schema.get("default") {
                    result.insert(prop_name.clone(), default.clone());
                }
            }
            Some(value) => check_value(prop_name, prop_schema, value)?,
        }
    }

    Ok(Value::Object(result))
}

fn check_value(name: &str, prop_schema: &Value, value: &Value) -> Result<()> {
    if let Some(expected_type) = prop_schema.get("type").and_then(|t| t.as_str()) {
        if !type_matches(expected_type, value) {
            bail!(
                "parameter '{}' must be of type '{}', got {}",
                name,
                expected_type,
                json_type_name(value)
            );
        }
    }

    if let Some(enum_values) = prop_schema.get("enum").and_then(|e| e.as_array()) {
        if !enum_values.contains(value) {
            let allowed: Vec<String> = enum_values.iter().map(|v| v.to_string()).collect();
            bail!(
                "parameter '{}' must be one of [{}], got {}",
                name,
                allowed.join(", "),
                value
            );
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = prop_schema.get("minimum").and_then(Value::as_f64) {
            if n < min {
                bail!("parameter '{}' must be >= {}, got {}", name, min, value);
            }
        }
        if let Some(max) = prop_schema.get("maximum").and_then(Value::as_f64) {
            if n > max {
                bail!("parameter '{}' must be <= {}, got {}", name, max, value);
            }
        }
    }

    if let Some(items) = value.as_array() {
        if let Some(min) = prop_schema.get("minItems").and_then(Value::as_u64) {
            if (items.len() as u64) < min {
                bail!("parameter '{}' needs at least {} item(s)", name, min);
            }
        }
        if let Some(max) = prop_schema.get("maxItems").and_then(Value::as_u64) {
            if items.len() as u64 > max {
                bail!(
                    "parameter '{}' accepts at most {} items, got {}",
                    name,
                    max,
                    items.len()
                );
            }
        }
        if let Some(item_schema) = prop_schema.get("items") {
            for (i, item) in items.iter().enumerate() {
                check_value(&format!("{}[{}]", name, i), item_schema, item)?;
            }
        }
    }

    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A required, non-blank string parameter.
pub fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    match params.get(key).and_then(Value::as_str).map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => bail!("{} must not be empty", key),
    }
}

pub fn opt_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn opt_u64(params: &Value, key: &str) -> Option<u64> {
    params.get(key).and_then(Value::as_u64)
}

pub fn opt_f64(params: &Value, key: &str) -> Option<f64> {
    params.get(key).and_then(Value::as_f64)
}

pub fn opt_bool(params: &Value, key: &str) -> Option<bool> {
    params.get(key).and_then(Value::as_bool)
}

pub fn bool_or(params: &Value, key: &str, default: bool) -> bool {
    opt_bool(params, key).unwrap_or(default)
}

/// String array parameter with blank entries dropped. Absent means empty.
pub fn string_list(params: &Value, key: &str) -> Vec<String> {
    params
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "mode": { "type": "string", "enum": ["smart", "semantic"], "default": "smart" },
                "limit": { "type": "integer", "minimum": 1, "maximum": 50 },
                "ids": { "type": "array", "items": { "type": "string" }, "minItems": 1, "maxItems": 3 }
            },
            "required": ["query"]
        })
    }

    #[test]
    fn test_missing_required() {
        let err = validate_params(&schema(), &json!({})).unwrap_err();
        assert!(err.to_string().contains("missing required parameter: query"));
        let err = validate_params(&schema(), &json!({"query": null})).unwrap_err();
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn test_injects_defaults() {
        let v = validate_params(&schema(), &json!({"query": "x"})).unwrap();
        assert_eq!(v["mode"], "smart");
        assert!(v.get("limit").is_none());
    }

    #[test]
    fn test_null_optional_takes_default() {
        let v = validate_params(&schema(), &json!({"query": "x", "mode": null})).unwrap();
        assert_eq!(v["mode"], "smart");
    }

    #[test]
    fn test_type_enum_and_bounds() {
        assert!(validate_params(&schema(), &json!({"query": 3})).is_err());
        assert!(validate_params(&schema(), &json!({"query": "x", "mode": "loud"})).is_err());
        assert!(validate_params(&schema(), &json!({"query": "x", "limit": 0})).is_err());
        assert!(validate_params(&schema(), &json!({"query": "x", "limit": 51})).is_err());
        assert!(validate_params(&schema(), &json!({"query": "x", "limit": 2.5})).is_err());
    }

    #[test]
    fn test_array_items_and_length() {
        assert!(validate_params(&schema(), &json!({"query": "x", "ids": []})).is_err());
        assert!(validate_params(&schema(), &json!({"query": "x", "ids": ["a", 1]})).is_err());
        let err =
            validate_params(&schema(), &json!({"query": "x", "ids": ["a", "b", "c", "d"]})).unwrap_err();
        assert!(err.to_string().contains("at most 3"));
        assert!(validate_params(&schema(), &json!({"query": "x", "ids": ["a"]})).is_ok());
    }

    #[test]
    fn test_non_object_params_rejected() {
        assert!(validate_params(&schema(), &json!([1, 2])).is_err());
        let v = validate_params(&json!({"properties": {}}), &Value::Null).unwrap();
        assert_eq!(v, json!({}));
    }

    #[test]
    fn test_accessors() {
        let p = json!({"q": "  hi ", "blank": " ", "tags": ["a", " ", "b"], "n": 4, "f": true});
        assert_eq!(required_str(&p, "q").unwrap(), "hi");
        assert!(required_str(&p, "blank").is_err());
        assert_eq!(opt_str(&p, "blank"), None);
        assert_eq!(string_list(&p, "tags"), vec!["a", "b"]);
        assert_eq!(string_list(&p, "missing"), Vec::<String>::new());
        assert_eq!(opt_u64(&p, "n"), Some(4));
        assert!(bool_or(&p, "f", false));
        assert!(!bool_or(&p, "g", false));
    }
}
