//! Tool definitions for MCP tools.
//!
//! Contains the JSON Schema definitions for all vault tools. Path arguments
//! carry `"format": "vault-path"` so validation rejects traversal.

use super::ToolDefinition;
use crate::mcp::tool_types::DEFAULT_CONTEXT_LENGTH;
use crate::mcp::validation::PATH_FORMAT;
use crate::models::STATUS_VALUES;

/// Defines the `list_files_in_vault` tool.
pub fn list_files_in_vault_tool() -> ToolDefinition {
    ToolDefinition {
        name: "list_files_in_vault".to_string(),
        description: "List all files and directories in the root directory of the Obsidian vault"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
    }
}

/// Defines the `list_files_in_dir` tool.
pub fn list_files_in_dir_tool() -> ToolDefinition {
    ToolDefinition {
        name: "list_files_in_dir".to_string(),
        description: "List all files and directories in a specific vault directory".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "dirpath": {
                    "type": "string",
                    "format": PATH_FORMAT,
                    "description": "Path to list files from, relative to the vault root"
                }
            },
            "required": ["dirpath"],
            "additionalProperties": false
        }),
    }
}

/// Defines the `get_file_contents` tool.
pub fn get_file_contents_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_file_contents".to_string(),
        description: "Return the content of a single file in the vault".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "filepath": {
                    "type": "string",
                    "format": PATH_FORMAT,
                    "description": "Path to the file, relative to the vault root"
                }
            },
            "required": ["filepath"],
            "additionalProperties": false
        }),
    }
}

/// Defines the `find_in_file` tool.
pub fn find_in_file_tool() -> ToolDefinition {
    ToolDefinition {
        name: "find_in_file".to_string(),
        description: "Search for text across all files in the vault. More than five matching \
                      files are summarised by match count."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text to search for"
                },
                "contextLength": {
                    "type": "integer",
                    "minimum": 0,
                    "default": DEFAULT_CONTEXT_LENGTH,
                    "description": "Characters of context to return around each match"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

/// Defines the `append_content` tool.
pub fn append_content_tool() -> ToolDefinition {
    ToolDefinition {
        name: "append_content".to_string(),
        description: "Append content to a new or existing file".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "filepath": {
                    "type": "string",
                    "format": PATH_FORMAT,
                    "description": "Path to the file, relative to the vault root"
                },
                "content": {
                    "type": "string",
                    "description": "Content to append"
                }
            },
            "required": ["filepath", "content"],
            "additionalProperties": false
        }),
    }
}

/// Defines the `patch_content` tool.
pub fn patch_content_tool() -> ToolDefinition {
    ToolDefinition {
        name: "patch_content".to_string(),
        description: "Replace the entire content of a file".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "filepath": {
                    "type": "string",
                    "format": PATH_FORMAT,
                    "description": "Path to the file, relative to the vault root"
                },
                "content": {
                    "type": "string",
                    "description": "New file content"
                }
            },
            "required": ["filepath", "content"],
            "additionalProperties": false
        }),
    }
}

/// Defines the `complex_search` tool.
pub fn complex_search_tool() -> ToolDefinition {
    ToolDefinition {
        name: "complex_search".to_string(),
        description: "Search vault files with a JsonLogic query. Supported operators: glob, \
                      var, and, or, in, not (!), ==, !=. Example: {\"glob\": [\"*.md\", {\"var\": \"path\"}]}"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "object",
                    "description": "JsonLogic query object"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

/// Defines the `get_properties` tool.
pub fn get_properties_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_properties".to_string(),
        description: "Read the YAML front-matter properties of a note".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "filepath": {
                    "type": "string",
                    "format": PATH_FORMAT,
                    "description": "Path to the note, relative to the vault root"
                }
            },
            "required": ["filepath"],
            "additionalProperties": false
        }),
    }
}

/// Defines the `update_properties` tool.
pub fn update_properties_tool() -> ToolDefinition {
    ToolDefinition {
        name: "update_properties".to_string(),
        description: "Update the YAML front-matter properties of a note. Lists are merged \
                      unless replace is true; custom entries are merged key by key; the \
                      modified timestamp is always set by the server."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "filepath": {
                    "type": "string",
                    "format": PATH_FORMAT,
                    "description": "Path to the note, relative to the vault root"
                },
                "properties": {
                    "type": "object",
                    "description": "Properties to set",
                    "properties": {
                        "title": {"type": "string"},
                        "author": {"type": "string"},
                        "type": {"type": "array", "items": {"type": "string"}},
                        "tags": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Tags, written as #tag"
                        },
                        "status": {
                            "type": "array",
                            "items": {"type": "string", "enum": STATUS_VALUES}
                        },
                        "version": {"type": "string"},
                        "platform": {"type": "string"},
                        "repository": {"type": "string", "format": "uri"},
                        "dependencies": {"type": "array", "items": {"type": "string"}},
                        "sources": {"type": "array", "items": {"type": "string"}},
                        "urls": {"type": "array", "items": {"type": "string", "format": "uri"}},
                        "papers": {"type": "array", "items": {"type": "string"}},
                        "custom": {"type": "object"}
                    },
                    "additionalProperties": false
                },
                "replace": {
                    "type": "boolean",
                    "default": false,
                    "description": "Replace lists instead of merging them"
                }
            },
            "required": ["filepath", "properties"],
            "additionalProperties": false
        }),
    }
}

/// Defines the `get_tags` tool.
pub fn get_tags_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_tags".to_string(),
        description: "List front-matter tags with the files that use them, most used first"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "format": PATH_FORMAT,
                    "description": "Only count files under this path"
                }
            },
            "additionalProperties": false
        }),
    }
}
