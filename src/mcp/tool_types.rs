//! Argument types for MCP tools.
//!
//! All argument types use `#[serde(deny_unknown_fields)]` so a field the
//! schema check missed still cannot slip through.

use crate::{Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Default characters of context around each search match.
pub const DEFAULT_CONTEXT_LENGTH: u32 = 10;

/// Arguments for tools that take none.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoArgs {}

/// Arguments for `list_files_in_dir`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirArgs {
    /// Vault-relative directory.
    pub dirpath: String,
}

/// Arguments for tools addressing one note.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileArgs {
    /// Vault-relative note path.
    pub filepath: String,
}

/// Arguments for `append_content` and `patch_content`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentArgs {
    /// Vault-relative note path.
    pub filepath: String,
    /// Content to write.
    pub content: String,
}

/// Arguments for `find_in_file`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FindInFileArgs {
    /// Text to search for.
    pub query: String,
    /// Characters of context around each match.
    #[serde(rename = "contextLength", default = "default_context_length")]
    pub context_length: u32,
}

const fn default_context_length() -> u32 {
    DEFAULT_CONTEXT_LENGTH
}

/// Arguments for `complex_search`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComplexSearchArgs {
    /// JsonLogic query.
    pub query: Value,
}

/// Arguments for `update_properties`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePropertiesArgs {
    /// Vault-relative note path.
    pub filepath: String,
    /// Properties to merge in.
    pub properties: Value,
    /// Replace lists instead of merging them.
    #[serde(default)]
    pub replace: bool,
}

/// Arguments for `get_tags`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetTagsArgs {
    /// Only count files under this path.
    pub path: Option<String>,
}

/// Deserializes tool arguments.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the arguments do not fit `T`.
pub fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    serde_json::from_value(arguments).map_err(|e| Error::InvalidInput(e.to_string()))
}
