//! Minimal entry-payload validator for `LedgerMetadata::schema` (§4.6
//! "Schema validation when `metadata.schema` is non-null").
//!
//! This is a deliberately small subset of JSON Schema: `type`, `required`,
//! and `properties` (recursively). It covers the cases a ledger owner is
//! realistically expected to declare for opaque entry payloads; it is not a
//! general-purpose JSON Schema validator.

use ledger_types::LedgerError;
use serde_json::Value;

pub fn validate(schema: &Value, data: &Value) -> Result<(), LedgerError> {
    if let Some(expected_type) = schema.get("type").and_then(Value::as_str) {
        if !matches_type(expected_type, data) {
            return Err(LedgerError::ValidationError {
                field: "$".to_string(),
                message: format!("expected type `{expected_type}`, got `{}`", type_name(data)),
            });
        }
    }

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        let object = data.as_object().ok_or_else(|| LedgerError::ValidationError {
            field: "$".to_string(),
            message: "`required` specified but payload is not an object".to_string(),
        })?;
        for field in required {
            let Some(name) = field.as_str() else { continue };
            if !object.contains_key(name) {
                return Err(LedgerError::ValidationError {
                    field: name.to_string(),
                    message: "required field missing".to_string(),
                });
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        if let Some(object) = data.as_object() {
            for (name, sub_schema) in properties {
                if let Some(value) = object.get(name) {
                    validate(sub_schema, value).map_err(|e| match e {
                        LedgerError::ValidationError { message, .. } => LedgerError::ValidationError {
                            field: name.clone(),
                            message,
                        },
                        other => other,
                    })?;
                }
            }
        }
    }

    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_matching_type() {
        let schema = json!({"type": "object"});
        assert!(validate(&schema, &json!({"a": 1})).is_ok());
    }

    #[test]
    fn rejects_mismatched_type() {
        let schema = json!({"type": "object"});
        assert!(validate(&schema, &json!("not an object")).is_err());
    }

    #[test]
    fn rejects_missing_required_field() {
        let schema = json!({"type": "object", "required": ["amount"]});
        assert!(validate(&schema, &json!({"currency": "usd"})).is_err());
    }

    #[test]
    fn validates_nested_properties() {
        let schema = json!({
            "type": "object",
            "properties": {"amount": {"type": "integer"}}
        });
        assert!(validate(&schema, &json!({"amount": 5})).is_ok());
        assert!(validate(&schema, &json!({"amount": "five"})).is_err());
    }
}
