//! Front-matter property management.
//!
//! Two validation tiers:
//!
//! - [`PropertyManager::parse_properties`] is lenient. It never fails and
//!   returns whatever it could read, logging schema problems.
//! - [`PropertyManager::validate_properties`] is strict. It is applied to
//!   update inputs and reports every violation.
//!
//! Front matter format:
//! ```text
//! ---
//! title: Release notes
//! tags:
//! - project
//! status:
//! - draft
//! ---
//! Note body.
//! ```

// Static regex patterns are known to compile.
#![allow(clippy::expect_used)]

use crate::client::VaultBackend;
use crate::models::{Properties, PropertyResult, STATUS_VALUES, json_type_name};
use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::{Arc, LazyLock};

/// Leading front-matter block. Group 1 is the YAML text, absent when empty.
static FRONT_MATTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A---[ \t]*\r?\n(?:(.*?)\r?\n)?---[ \t]*(?:\r?\n|\z)")
        .expect("static regex: front matter block")
});

/// Scheme-prefixed URI.
static URI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://\S+$").expect("static regex: URI shape")
});

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

/// Plain string properties.
const STRING_FIELDS: &[&str] = &["title", "author", "version", "platform"];
/// String-list properties.
const STRING_LIST_FIELDS: &[&str] = &["type", "tags", "dependencies", "sources", "papers"];
/// System-managed timestamps; accepted in input, never applied.
const TIMESTAMP_FIELDS: &[&str] = &["created", "modified"];

/// A note split into its front matter and body.
#[derive(Debug)]
struct ParsedNote<'a> {
    properties: Properties,
    body: &'a str,
    malformed: bool,
}

/// Reads, validates, merges and writes note front matter.
pub struct PropertyManager {
    backend: Arc<dyn VaultBackend>,
}

impl PropertyManager {
    /// Creates a manager over a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn VaultBackend>) -> Self {
        Self { backend }
    }

    /// Parses front matter out of note content.
    ///
    /// Missing or malformed front matter yields an empty set. Tags lose any
    /// leading `#`. Schema problems are logged, not returned.
    #[must_use]
    pub fn parse_properties(content: &str) -> Properties {
        Self::split(content).properties
    }

    fn split(content: &str) -> ParsedNote<'_> {
        let Some(captures) = FRONT_MATTER.captures(content) else {
            return ParsedNote {
                properties: Properties::new(),
                body: content,
                malformed: false,
            };
        };
        let end = captures.get(0).map_or(0, |m| m.end());
        let body = &content[end..];
        let yaml = captures.get(1).map_or("", |m| m.as_str());

        let properties = match serde_yaml_ng::from_str::<Value>(yaml) {
            Ok(Value::Object(map)) => Properties::from(map),
            Ok(Value::Null) => Properties::new(),
            Ok(other) => {
                tracing::warn!(
                    found = json_type_name(&other),
                    "Front matter is not a mapping; treating as empty"
                );
                return ParsedNote {
                    properties: Properties::new(),
                    body,
                    malformed: true,
                };
            },
            Err(e) => {
                tracing::warn!(error = %e, "Front matter is not valid YAML; treating as empty");
                return ParsedNote {
                    properties: Properties::new(),
                    body,
                    malformed: true,
                };
            },
        };

        let properties = normalize_tags(properties);
        let problems = Self::validate_properties(&properties);
        if !problems.is_empty() {
            tracing::warn!(problems = ?problems, "Front matter does not match the property schema");
        }

        ParsedNote {
            properties,
            body,
            malformed: false,
        }
    }

    /// Serializes properties into a front-matter block.
    ///
    /// Undefined entries are dropped. Lines end with the platform convention.
    ///
    /// # Errors
    ///
    /// Returns an error if YAML serialization fails.
    pub fn generate_properties(properties: &Properties) -> Result<String> {
        let defined = properties.defined();
        if defined.is_empty() {
            return Ok(format!("---{LINE_ENDING}---{LINE_ENDING}"));
        }

        let mut yaml =
            serde_yaml_ng::to_string(&defined).map_err(|e| Error::operation("serialize_yaml", e))?;
        if !yaml.ends_with('\n') {
            yaml.push('\n');
        }
        if LINE_ENDING != "\n" {
            yaml = yaml.replace('\n', LINE_ENDING);
        }

        Ok(format!("---{LINE_ENDING}{yaml}---{LINE_ENDING}"))
    }

    /// Strictly checks properties, returning every violation.
    ///
    /// An empty list means the input conforms.
    #[must_use]
    pub fn validate_properties(properties: &Properties) -> Vec<String> {
        let mut errors = Vec::new();

        for (key, value) in properties.iter() {
            if value.is_null() {
                continue;
            }
            let key = key.as_str();
            if STRING_FIELDS.contains(&key) || TIMESTAMP_FIELDS.contains(&key) {
                if !value.is_string() {
                    errors.push(format!(
                        "'{key}' must be a string, got {}",
                        json_type_name(value)
                    ));
                }
            } else if STRING_LIST_FIELDS.contains(&key) {
                check_string_list(key, value, &mut errors, |_| None);
            } else if key == "status" {
                check_string_list(key, value, &mut errors, |s| {
                    (!STATUS_VALUES.contains(&s))
                        .then(|| format!("must be one of {}", STATUS_VALUES.join(", ")))
                });
            } else if key == "urls" {
                check_string_list(key, value, &mut errors, |s| {
                    (!is_uri(s)).then(|| "must be a valid URI".to_string())
                });
            } else if key == "repository" {
                match value.as_str() {
                    Some(s) if is_uri(s) => {},
                    Some(_) => errors.push("'repository' must be a valid URI".to_string()),
                    None => errors.push(format!(
                        "'repository' must be a string, got {}",
                        json_type_name(value)
                    )),
                }
            } else if key == "custom" {
                if !value.is_object() {
                    errors.push(format!(
                        "'custom' must be an object, got {}",
                        json_type_name(value)
                    ));
                }
            } else {
                errors.push(format!("unknown property '{key}'"));
            }
        }

        errors
    }

    /// Merges `updates` into `existing`, stamping `modified` with now.
    #[must_use]
    pub fn merge_properties(existing: &Properties, updates: &Properties, replace: bool) -> Properties {
        Self::merge_properties_at(existing, updates, replace, Utc::now())
    }

    /// Merges `updates` into `existing`, stamping `modified` with `now`.
    ///
    /// - list + list: union, or the new list when `replace`
    /// - `custom` object: new keys over existing ones
    /// - anything else: new value wins
    ///
    /// Undefined update values and caller-supplied timestamps are ignored.
    #[must_use]
    pub fn merge_properties_at(
        existing: &Properties,
        updates: &Properties,
        replace: bool,
        now: DateTime<Utc>,
    ) -> Properties {
        let mut merged = existing.clone();

        for (key, new_value) in updates.iter() {
            if new_value.is_null() || TIMESTAMP_FIELDS.contains(&key.as_str()) {
                continue;
            }

            let value = match (merged.get(key), new_value) {
                (Some(Value::Array(old)), Value::Array(new)) if !replace => {
                    Value::Array(union(old, new))
                },
                (Some(Value::Object(old)), Value::Object(new)) if key == "custom" => {
                    let mut combined: Map<String, Value> = old.clone();
                    for (k, v) in new {
                        combined.insert(k.clone(), v.clone());
                    }
                    Value::Object(combined)
                },
                _ => new_value.clone(),
            };
            merged.insert(key.clone(), value);
        }

        merged.insert(
            "modified",
            Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        merged
    }

    /// Reads a note's properties.
    ///
    /// Never fails; problems are reported in the result.
    pub async fn get_properties(&self, filepath: &str) -> PropertyResult {
        match self.read_content(filepath).await {
            Ok(content) => PropertyResult::ok(
                "Properties retrieved successfully",
                Self::parse_properties(&content),
            ),
            Err(e) => {
                tracing::debug!(filepath, error = %e, "Failed to read properties");
                PropertyResult::failed("Failed to get properties", vec![e.to_string()])
            },
        }
    }

    /// Validates, merges and writes back a note's properties.
    ///
    /// Invalid input is rejected before the note is read. A malformed
    /// existing block is replaced wholesale; the result message says so.
    /// Concurrent updates to one note are last-writer-wins.
    pub async fn update_properties(
        &self,
        filepath: &str,
        new_properties: &Properties,
        replace: bool,
    ) -> PropertyResult {
        let errors = Self::validate_properties(new_properties);
        if !errors.is_empty() {
            return PropertyResult::failed("Invalid properties", errors);
        }

        match self.apply_update(filepath, new_properties, replace).await {
            Ok((merged, malformed)) => {
                let message = if malformed {
                    "Properties updated successfully; the previous front matter could not be parsed and was replaced"
                } else {
                    "Properties updated successfully"
                };
                PropertyResult::ok(message, merged)
            },
            Err(e) => {
                tracing::debug!(filepath, error = %e, "Failed to update properties");
                PropertyResult::failed("Failed to update properties", vec![e.to_string()])
            },
        }
    }

    async fn apply_update(
        &self,
        filepath: &str,
        new_properties: &Properties,
        replace: bool,
    ) -> Result<(Properties, bool)> {
        let content = self.read_content(filepath).await?;
        let parsed = Self::split(&content);
        if parsed.malformed {
            tracing::warn!(
                filepath,
                "Replacing unparseable front matter; its previous contents will be lost"
            );
        }

        let updates = normalize_tags(new_properties.clone());
        let merged = Self::merge_properties(&parsed.properties, &updates, replace);
        let front_matter = Self::generate_properties(&merged)?;
        let new_content = format!("{front_matter}{}", parsed.body);

        self.backend.update_content(filepath, &new_content).await?;
        Ok((merged, parsed.malformed))
    }

    async fn read_content(&self, filepath: &str) -> Result<String> {
        match self.backend.get_file_contents(filepath).await {
            Err(Error::NoContent) => Ok(String::new()),
            other => other,
        }
    }
}

/// Strips leading `#` from tags and splits a scalar tag string.
fn normalize_tags(mut properties: Properties) -> Properties {
    let normalized = match properties.get("tags") {
        Some(Value::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Value::String(strip_hash(s)),
                    other => other.clone(),
                })
                .collect(),
        ),
        Some(Value::String(s)) => Value::Array(
            s.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty())
                .map(|t| Value::String(strip_hash(t)))
                .collect(),
        ),
        _ => return properties,
    };
    properties.insert("tags", normalized);
    properties
}

fn strip_hash(tag: &str) -> String {
    tag.trim().trim_start_matches('#').to_string()
}

fn is_uri(value: &str) -> bool {
    URI_PATTERN.is_match(value)
}

/// Checks that `value` is a list of strings, applying `item_check` to each.
fn check_string_list<F>(key: &str, value: &Value, errors: &mut Vec<String>, item_check: F)
where
    F: Fn(&str) -> Option<String>,
{
    let Some(items) = value.as_array() else {
        errors.push(format!(
            "'{key}' must be an array of strings, got {}",
            json_type_name(value)
        ));
        return;
    };
    for (i, item) in items.iter().enumerate() {
        match item.as_str() {
            Some(s) => {
                if let Some(problem) = item_check(s) {
                    errors.push(format!("'{key}[{i}]' {problem}"));
                }
            },
            None => errors.push(format!(
                "'{key}[{i}]' must be a string, got {}",
                json_type_name(item)
            )),
        }
    }
}

/// Set union keeping first-seen order.
fn union(old: &[Value], new: &[Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(old.len() + new.len());
    for item in old.iter().chain(new) {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Properties {
        Properties::try_from(value).unwrap()
    }

    #[test]
    fn test_parse_without_front_matter() {
        assert!(PropertyManager::parse_properties("# Heading\nbody").is_empty());
    }

    #[test]
    fn test_parse_strips_tag_hashes() {
        let content = "---\ntitle: Plan\ntags:\n  - \"#work\"\n  - home\n---\nBody";
        let parsed = PropertyManager::parse_properties(content);
        assert_eq!(parsed.get("title"), Some(&json!("Plan")));
        assert_eq!(parsed.tags(), vec!["work".to_string(), "home".to_string()]);
    }

    #[test]
    fn test_parse_crlf() {
        let content = "---\r\ntitle: Windows\r\n---\r\nBody";
        let parsed = PropertyManager::split(content);
        assert_eq!(parsed.properties.get("title"), Some(&json!("Windows")));
        assert_eq!(parsed.body, "Body");
    }

    #[test]
    fn test_parse_empty_block() {
        let parsed = PropertyManager::split("---\n---\nBody");
        assert!(parsed.properties.is_empty());
        assert!(!parsed.malformed);
        assert_eq!(parsed.body, "Body");
    }

    #[test]
    fn test_parse_malformed_is_lenient() {
        let parsed = PropertyManager::split("---\ntitle: [unclosed\n---\nBody");
        assert!(parsed.properties.is_empty());
        assert!(parsed.malformed);
        assert_eq!(parsed.body, "Body");
    }

    #[test]
    fn test_parse_scalar_tags_split() {
        let parsed = PropertyManager::parse_properties("---\ntags: alpha, beta\n---\n");
        assert_eq!(parsed.tags(), vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn test_generate_drops_undefined() {
        let out = PropertyManager::generate_properties(&props(json!({
            "title": "T",
            "author": null
        })))
        .unwrap();
        assert!(out.starts_with(&format!("---{LINE_ENDING}")));
        assert!(out.ends_with(&format!("---{LINE_ENDING}")));
        assert!(out.contains("title: T"));
        assert!(!out.contains("author"));
    }

    #[test]
    fn test_generate_empty() {
        let out = PropertyManager::generate_properties(&Properties::new()).unwrap();
        assert_eq!(out, format!("---{LINE_ENDING}---{LINE_ENDING}"));
    }

    #[test]
    fn test_validate_reports_every_violation() {
        let errors = PropertyManager::validate_properties(&props(json!({
            "title": 5,
            "status": ["draft", "shipped"],
            "urls": ["https://example.com", "not a url"],
            "repository": "github.com/x",
            "mystery": true
        })));
        assert_eq!(errors.len(), 5, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("unknown property 'mystery'")));
        assert!(errors.iter().any(|e| e.contains("status[1]")));
        assert!(errors.iter().any(|e| e.contains("urls[1]")));
    }

    #[test]
    fn test_validate_accepts_conforming_input() {
        let errors = PropertyManager::validate_properties(&props(json!({
            "title": "T",
            "tags": ["a"],
            "status": ["in-progress"],
            "repository": "https://github.com/obsidianmd/obsidian-api",
            "custom": {"priority": 1},
            "modified": "2024-01-01T00:00:00.000Z"
        })));
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_merge_union_and_replace() {
        let existing = props(json!({"tags": ["a", "b"]}));
        let update = props(json!({"tags": ["b", "c"]}));

        let merged = PropertyManager::merge_properties(&existing, &update, false);
        assert_eq!(merged.get("tags"), Some(&json!(["a", "b", "c"])));

        let replaced = PropertyManager::merge_properties(&existing, &update, true);
        assert_eq!(replaced.get("tags"), Some(&json!(["b", "c"])));
    }

    #[test]
    fn test_merge_custom_is_shallow() {
        let existing = props(json!({"custom": {"keep": 1, "change": "old"}}));
        let update = props(json!({"custom": {"change": "new", "add": true}}));
        let merged = PropertyManager::merge_properties(&existing, &update, false);
        assert_eq!(
            merged.get("custom"),
            Some(&json!({"keep": 1, "change": "new", "add": true}))
        );
    }

    #[test]
    fn test_merge_ignores_timestamps_and_undefined() {
        let now = Utc::now();
        let existing = props(json!({"title": "keep", "created": "2020-01-01"}));
        let update = props(json!({
            "title": null,
            "created": "1999-01-01",
            "modified": "1999-01-01T00:00:00.000Z"
        }));
        let merged = PropertyManager::merge_properties_at(&existing, &update, false, now);
        assert_eq!(merged.get("title"), Some(&json!("keep")));
        assert_eq!(merged.get("created"), Some(&json!("2020-01-01")));
        assert_eq!(
            merged.modified(),
            Some(now.to_rfc3339_opts(SecondsFormat::Millis, true).as_str())
        );
    }

    #[test]
    fn test_merge_scalar_replaces() {
        let existing = props(json!({"title": "old", "tags": ["a"]}));
        let update = props(json!({"title": "new", "tags": "b"}));
        let merged = PropertyManager::merge_properties(&existing, &update, false);
        assert_eq!(merged.get("title"), Some(&json!("new")));
        assert_eq!(merged.get("tags"), Some(&json!("b")));
    }
}
