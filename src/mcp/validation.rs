//! Tool argument validation against declared input schemas.
//!
//! Supports the schema subset the tool definitions use: `type`, `required`,
//! `properties`, `additionalProperties: false`, `enum`, `items`, `minimum`
//! and the `vault-path` string format. Every violation is collected.

// Static regex patterns are known to compile.
#![allow(clippy::expect_used)]

use crate::models::json_type_name;
use crate::{Error, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// `format` value marking a string as a vault-relative path.
pub const PATH_FORMAT: &str = "vault-path";

static DRIVE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]:").expect("static regex: drive prefix"));

/// Validates tool arguments against a schema.
///
/// # Errors
///
/// Returns [`Error::Validation`] listing every violation found.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Result<()> {
    let mut errors = Vec::new();

    let empty = Map::new();
    let args = match arguments {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(Error::Validation(vec![format!(
                "arguments must be an object, got {}",
                json_type_name(other)
            )]));
        },
    };

    let properties = schema.get("properties").and_then(Value::as_object);
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));

    for name in &required {
        if args.get(*name).is_none_or(Value::is_null) {
            errors.push(format!("missing required field '{name}'"));
        }
    }

    for (name, value) in args {
        match properties.and_then(|p| p.get(name)) {
            Some(field_schema) => {
                if value.is_null() && !required.contains(&name.as_str()) {
                    continue;
                }
                check_value(name, value, field_schema, required.contains(&name.as_str()), &mut errors);
            },
            None if closed => errors.push(format!("unknown field '{name}'")),
            None => {},
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}

fn check_value(name: &str, value: &Value, schema: &Value, required: bool, errors: &mut Vec<String>) {
    if value.is_null() {
        // Already reported as missing.
        return;
    }

    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !type_matches(expected, value) {
            errors.push(format!(
                "'{name}' must be {}, got {}",
                article(expected),
                json_type_name(value)
            ));
            return;
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            let options: Vec<String> = allowed
                .iter()
                .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                .collect();
            errors.push(format!("'{name}' must be one of {}", options.join(", ")));
        }
    }

    if let (Some(minimum), Some(n)) = (
        schema.get("minimum").and_then(Value::as_f64),
        value.as_f64(),
    ) {
        if n < minimum {
            errors.push(format!("'{name}' must be at least {minimum}"));
        }
    }

    if schema.get("format").and_then(Value::as_str) == Some(PATH_FORMAT) {
        if let Some(path) = value.as_str() {
            check_path(name, path, required, errors);
        }
    }

    if let (Some(items), Some(values)) = (schema.get("items"), value.as_array()) {
        for (i, item) in values.iter().enumerate() {
            check_value(&format!("{name}[{i}]"), item, items, true, errors);
        }
    }
}

/// Rejects traversal sequences and absolute path forms.
fn check_path(name: &str, path: &str, required: bool, errors: &mut Vec<String>) {
    if path.trim().is_empty() {
        if required {
            errors.push(format!("'{name}' must not be empty"));
        }
        return;
    }
    if path.starts_with('/') || path.starts_with('\\') || DRIVE_PREFIX.is_match(path) {
        errors.push(format!("'{name}' must be relative to the vault root"));
    }
    if path.split(['/', '\\']).any(|segment| segment == "..") {
        errors.push(format!("'{name}' must not contain '..' segments"));
    }
    if path.contains('\0') {
        errors.push(format!("'{name}' must not contain NUL characters"));
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

fn article(type_name: &str) -> String {
    match type_name {
        "array" | "integer" | "object" => format!("an {type_name}"),
        _ => format!("a {type_name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "filepath": {"type": "string", "format": PATH_FORMAT},
                "content": {"type": "string"},
                "replace": {"type": "boolean"},
                "mode": {"type": "string", "enum": ["a", "b"]},
                "contextLength": {"type": "integer", "minimum": 0},
                "tags": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["filepath", "content"],
            "additionalProperties": false
        })
    }

    fn violations(args: Value) -> Vec<String> {
        match validate_arguments(&schema(), &args) {
            Ok(()) => Vec::new(),
            Err(Error::Validation(errors)) => errors,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_valid_arguments() {
        assert!(violations(json!({"filepath": "a.md", "content": "x", "replace": true})).is_empty());
    }

    #[test]
    fn test_reports_all_violations() {
        let errors = violations(json!({"replace": "yes"}));
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors.contains(&"missing required field 'filepath'".to_string()));
        assert!(errors.contains(&"missing required field 'content'".to_string()));
        assert!(errors.contains(&"'replace' must be a boolean, got string".to_string()));
    }

    #[test]
    fn test_unknown_field_and_enum() {
        let errors = violations(json!({"filepath": "a.md", "content": "x", "mode": "c", "bogus": 1}));
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("unknown field 'bogus'")));
        assert!(errors.iter().any(|e| e.contains("must be one of a, b")));
    }

    #[test]
    fn test_array_items_and_minimum() {
        let errors =
            violations(json!({"filepath": "a.md", "content": "x", "tags": ["ok", 3], "contextLength": -1}));
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("'tags[1]' must be a string")));
        assert!(errors.iter().any(|e| e.contains("at least")));
    }

    #[test_case("../secret.md" ; "parent traversal")]
    #[test_case("notes/../../etc/passwd" ; "nested traversal")]
    #[test_case("notes\\..\\x.md" ; "backslash traversal")]
    #[test_case("/etc/passwd" ; "unix absolute")]
    #[test_case("\\\\server\\share" ; "unc path")]
    #[test_case("C:\\Windows\\x.md" ; "drive prefix")]
    #[test_case("" ; "empty")]
    fn test_path_rejected(path: &str) {
        let errors = violations(json!({"filepath": path, "content": "x"}));
        assert!(!errors.is_empty(), "{path} should be rejected");
    }

    #[test_case("note.md" ; "plain")]
    #[test_case("projects/2024/plan.md" ; "nested")]
    #[test_case("notes/..hidden.md" ; "dots in name")]
    fn test_path_accepted(path: &str) {
        assert!(violations(json!({"filepath": path, "content": "x"})).is_empty());
    }

    #[test]
    fn test_non_object_arguments() {
        assert!(validate_arguments(&schema(), &json!([1, 2])).is_err());
    }
}
