//! MCP tool implementations.
//!
//! - [`definitions`]: tool schemas
//! - [`handlers`]: tool execution, one module per capability

mod definitions;
mod handlers;

use crate::client::VaultBackend;
use crate::services::{PropertyManager, TagCache};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Collaborators a tool handler may use.
#[derive(Clone)]
pub struct ToolContext {
    /// Note store.
    pub backend: Arc<dyn VaultBackend>,
    /// Front-matter manager.
    pub properties: Arc<PropertyManager>,
    /// Tag index.
    pub tags: Arc<TagCache>,
}

impl ToolContext {
    /// Builds a context whose property manager and tag cache share `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn VaultBackend>) -> Self {
        Self {
            properties: Arc::new(PropertyManager::new(Arc::clone(&backend))),
            tags: Arc::new(TagCache::new(Arc::clone(&backend))),
            backend,
        }
    }
}

/// Registry of MCP tools.
pub struct ToolRegistry {
    tools: HashMap<String, ToolDefinition>,
}

impl ToolRegistry {
    /// Creates a registry with every vault tool.
    #[must_use]
    pub fn new() -> Self {
        let tools = [
            definitions::list_files_in_vault_tool(),
            definitions::list_files_in_dir_tool(),
            definitions::get_file_contents_tool(),
            definitions::find_in_file_tool(),
            definitions::append_content_tool(),
            definitions::patch_content_tool(),
            definitions::complex_search_tool(),
            definitions::get_properties_tool(),
            definitions::update_properties_tool(),
            definitions::get_tags_tool(),
        ]
        .into_iter()
        .map(|tool| (tool.name.clone(), tool))
        .collect();

        Self { tools }
    }

    /// Returns all tool definitions, sorted by name.
    #[must_use]
    pub fn list_tools(&self) -> Vec<&ToolDefinition> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Gets a tool definition by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// Executes a tool. Arguments are assumed to have passed validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown tool, or the handler's
    /// error.
    pub async fn execute(&self, ctx: &ToolContext, name: &str, arguments: Value) -> Result<ToolResult> {
        match name {
            "list_files_in_vault" => handlers::execute_list_files_in_vault(ctx, arguments).await,
            "list_files_in_dir" => handlers::execute_list_files_in_dir(ctx, arguments).await,
            "get_file_contents" => handlers::execute_get_file_contents(ctx, arguments).await,
            "find_in_file" => handlers::execute_find_in_file(ctx, arguments).await,
            "append_content" => handlers::execute_append_content(ctx, arguments).await,
            "patch_content" => handlers::execute_patch_content(ctx, arguments).await,
            "complex_search" => handlers::execute_complex_search(ctx, arguments).await,
            "get_properties" => handlers::execute_get_properties(ctx, arguments).await,
            "update_properties" => handlers::execute_update_properties(ctx, arguments).await,
            "get_tags" => handlers::execute_get_tags(ctx, arguments).await,
            _ => Err(Error::NotFound(format!("Unknown tool: {name}"))),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Definition of an MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema for input validation.
    pub input_schema: Value,
}

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the result represents an error.
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// A single text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// A single text block holding pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        serde_json::to_string_pretty(value)
            .map(Self::text)
            .map_err(|e| Error::operation("serialize_tool_result", e))
    }

    /// Concatenated text of all blocks.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                ToolContent::Text { text } => text.as_str(),
            })
            .collect()
    }
}

/// Content types that can be returned by tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_every_tool() {
        let registry = ToolRegistry::new();
        let names: Vec<_> = registry.list_tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "append_content",
                "complex_search",
                "find_in_file",
                "get_file_contents",
                "get_properties",
                "get_tags",
                "list_files_in_dir",
                "list_files_in_vault",
                "patch_content",
                "update_properties",
            ]
        );
    }

    #[test]
    fn test_definitions_declare_required_paths() {
        let registry = ToolRegistry::new();
        let update = registry.get_tool("update_properties").unwrap();
        let required = update.input_schema["required"].as_array().unwrap();
        assert!(required.contains(&serde_json::json!("filepath")));
        assert!(required.contains(&serde_json::json!("properties")));
        assert_eq!(update.input_schema["properties"]["filepath"]["format"], "vault-path");
    }

    #[test]
    fn test_tool_content_serialization() {
        let result = ToolResult::text("hi");
        let value = serde_json::to_value(&result.content).unwrap();
        assert_eq!(value, serde_json::json!([{"type": "text", "text": "hi"}]));
    }
}
