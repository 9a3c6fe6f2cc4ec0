//! Schema guard for action schemas
//!
//! Compiles the JSON Schema fragment a game attaches to an action (Draft 7)
//! and flags keywords the server does not support. Flagged keywords are
//! advisory; only a fragment that fails to compile is rejected.

use serde_json::Value;
use thiserror::Error;

/// Schema keywords that games may send but the server does not support.
pub const FORBIDDEN_SCHEMA_KEYS: &[&str] = &[
    "$anchor",
    "$comment",
    "$defs",
    "$dynamicAnchor",
    "$dynamicRef",
    "$id",
    "$ref",
    "$schema",
    "$vocabulary",
    "additionalProperties",
    "allOf",
    "anyOf",
    "contentEncoding",
    "contentMediaType",
    "contentSchema",
    "dependentRequired",
    "dependentSchemas",
    "deprecated",
    "description",
    "else",
    "if",
    "maxProperties",
    "minProperties",
    "mutuallyExclusive",
    "not",
    "oneOf",
    "patternProperties",
    "readOnly",
    "then",
    "title",
    "unevaluatedItems",
    "unevaluatedProperties",
    "writeOnly",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid schema: {0}")]
    Invalid(String),
}

/// A schema fragment that compiled successfully
pub struct CompiledSchema {
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema").finish_non_exhaustive()
    }
}

impl CompiledSchema {
    /// Check an instance against the compiled schema
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }
}

/// Compile a fragment as a Draft 7 validator.
pub fn validate(fragment: &Value) -> Result<CompiledSchema, SchemaError> {
    let validator = jsonschema::options()
        .with_draft(jsonschema::Draft::Draft7)
        .build(fragment)
        .map_err(|e| SchemaError::Invalid(e.to_string()))?;

    Ok(CompiledSchema { validator })
}

/// Collect forbidden keywords used by a fragment.
///
/// Checks the fragment itself and every sub-schema reached through nested
/// `properties`. Combinators, `items` and definitions are not entered.
/// Keys are returned once each, in the order first seen.
pub fn scan_forbidden_keys(fragment: &Value) -> Vec<String> {
    let mut found = Vec::new();
    scan_into(fragment, &mut found);
    found
}

fn scan_into(schema: &Value, found: &mut Vec<String>) {
    let Some(object) = schema.as_object() else {
        return;
    };

    for key in object.keys() {
        if FORBIDDEN_SCHEMA_KEYS.contains(&key.as_str()) && !found.contains(key) {
            found.push(key.clone());
        }
    }

    if let Some(properties) = object.get("properties").and_then(Value::as_object) {
        for property in properties.values() {
            scan_into(property, found);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_schema_compiles() {
        assert!(validate(&json!({})).is_ok());
    }

    #[test]
    fn test_compiled_schema_checks_instances() {
        let compiled = validate(&json!({
            "type": "object",
            "properties": {"height": {"type": "number"}}
        }))
        .unwrap();
        assert!(compiled.is_valid(&json!({"height": 4})));
        assert!(!compiled.is_valid(&json!({"height": "tall"})));
    }

    #[test]
    fn test_invalid_type_is_rejected() {
        let err = validate(&json!({"type": "banana"})).unwrap_err();
        assert!(matches!(err, SchemaError::Invalid(_)));
    }

    #[test]
    fn test_forbidden_list_size() {
        assert_eq!(FORBIDDEN_SCHEMA_KEYS.len(), 33);
    }

    #[test]
    fn test_scan_finds_nested_property_keys() {
        let schema = json!({
            "type": "object",
            "title": "Jump",
            "properties": {
                "height": {"type": "number", "description": "How high"},
                "style": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "$ref": "#/definitions/name", "title": "Name"}
                    }
                }
            }
        });
        assert_eq!(
            scan_forbidden_keys(&schema),
            vec!["title".to_string(), "description".to_string(), "$ref".to_string()]
        );
    }

    #[test]
    fn test_scan_skips_combinator_contents() {
        let schema = json!({
            "properties": {
                "mode": {"anyOf": [{"type": "string", "title": "inner"}]}
            }
        });
        // the combinator itself is flagged, not what is inside it
        assert_eq!(scan_forbidden_keys(&schema), vec!["anyOf".to_string()]);
    }

    #[test]
    fn test_scan_clean_schema() {
        let schema = json!({"type": "object", "properties": {"x": {"type": "integer"}}});
        assert!(scan_forbidden_keys(&schema).is_empty());
    }
}
