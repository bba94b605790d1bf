//! Recursive validator for a constrained JSON-Schema subset.
//!
//! The reference data schemas only use a small, predictable slice of JSON
//! Schema: `type`, `enum`, `const`, `pattern`, `minLength`, `minItems`,
//! `items`, `properties`/`required`/`additionalProperties:false`, `anyOf`
//! and `oneOf`. Rather than pulling in a full draft-2020 implementation,
//! this module walks exactly that subset and accumulates human-readable
//! error strings prefixed with a `$`-style path.
//!
//! Validation never fails with an exception: an absent or non-object schema
//! node is a silent no-op, and a type mismatch stops further checks on that
//! node only.

use serde_json::Value;

/// Validate `value` against `schema`, returning every violation found.
///
/// `path` seeds the error prefix; callers typically pass a collection-scoped
/// root such as `medications.dipirona`.
pub fn validate_against_schema(value: &Value, schema: &Value, path: &str) -> Vec<String> {
    let mut errors = Vec::new();
    validate_node(value, schema, path, &mut errors);
    errors
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn validate_node(value: &Value, schema: &Value, path: &str, errors: &mut Vec<String>) {
    let Some(schema) = schema.as_object() else {
        return;
    };

    if let Some(branches) = schema.get("anyOf").and_then(Value::as_array) {
        let is_valid = branches.iter().any(|branch| {
            let mut local = Vec::new();
            validate_node(value, branch, path, &mut local);
            local.is_empty()
        });
        if !is_valid {
            errors.push(format!("{path}: does not satisfy anyOf schemas"));
        }
        return;
    }

    if let Some(branches) = schema.get("oneOf").and_then(Value::as_array) {
        let valid_count = branches
            .iter()
            .filter(|branch| {
                let mut local = Vec::new();
                validate_node(value, branch, path, &mut local);
                local.is_empty()
            })
            .count();
        if valid_count != 1 {
            errors.push(format!("{path}: must satisfy exactly one schema in oneOf"));
        }
        return;
    }

    if let Some(expected) = schema.get("const") {
        if value != expected {
            errors.push(format!("{path}: expected const {expected}"));
            return;
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            errors.push(format!(
                "{path}: must be one of {}",
                Value::Array(allowed.clone())
            ));
            return;
        }
    }

    let declared_type = schema.get("type").and_then(Value::as_str);
    if let Some(expected) = declared_type {
        let actual = json_type_name(value);
        if actual != expected {
            errors.push(format!(
                "{path}: expected type \"{expected}\", got \"{actual}\""
            ));
            return;
        }
    }

    match declared_type {
        Some("string") => {
            let text = value.as_str().unwrap_or_default();
            if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
                if (text.chars().count() as u64) < min {
                    errors.push(format!("{path}: string length must be >= {min}"));
                }
            }
            if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
                match regex::Regex::new(pattern) {
                    Ok(re) => {
                        if !re.is_match(text) {
                            errors.push(format!("{path}: does not match pattern {pattern}"));
                        }
                    }
                    Err(_) => {
                        errors.push(format!("{path}: schema pattern {pattern} is not valid"));
                    }
                }
            }
        }
        Some("array") => {
            let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
            if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
                if (items.len() as u64) < min {
                    errors.push(format!("{path}: array length must be >= {min}"));
                }
            }
            if let Some(item_schema) = schema.get("items") {
                for (index, item) in items.iter().enumerate() {
                    validate_node(item, item_schema, &format!("{path}[{index}]"), errors);
                }
            }
        }
        Some("object") => {
            let object = match value.as_object() {
                Some(object) => object,
                None => return,
            };

            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for key in required.iter().filter_map(Value::as_str) {
                    if !object.contains_key(key) {
                        errors.push(format!("{path}: missing required property \"{key}\""));
                    }
                }
            }

            let properties = schema.get("properties").and_then(Value::as_object);
            if let Some(properties) = properties {
                for (key, prop_schema) in properties {
                    if let Some(prop_value) = object.get(key) {
                        validate_node(prop_value, prop_schema, &format!("{path}.{key}"), errors);
                    }
                }
            }

            if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
                for key in object.keys() {
                    let declared = properties.map(|p| p.contains_key(key)).unwrap_or(false);
                    if !declared {
                        errors.push(format!("{path}: unexpected property \"{key}\""));
                    }
                }
            }
        }
        _ => {}
    }
}
