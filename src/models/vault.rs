//! Vault listing and search result types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of vault entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A note or attachment.
    File,
    /// A directory.
    Folder,
}

/// One entry of a vault listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Vault-relative path; folders carry no trailing slash.
    pub path: String,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Nested entries, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileEntry>>,
}

impl FileEntry {
    /// Builds an entry from a listing name; a trailing `/` marks a folder.
    ///
    /// `prefix` is the listed directory, joined in front of `name`.
    #[must_use]
    pub fn from_listing(prefix: &str, name: &str) -> Self {
        let (name, kind) = name
            .strip_suffix('/')
            .map_or((name, EntryKind::File), |n| (n, EntryKind::Folder));
        let prefix = prefix.trim_matches('/');
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        };
        Self {
            path,
            kind,
            children: None,
        }
    }
}

/// Span of a match within its context string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpan {
    /// Start offset.
    pub start: u64,
    /// End offset.
    pub end: u64,
}

/// One match with surrounding context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    /// Text surrounding the match.
    pub context: String,
    /// Position of the match within `context`.
    #[serde(rename = "match")]
    pub span: MatchSpan,
}

/// A file matched by a simple text search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Vault-relative path.
    pub filename: String,
    /// Relevance score.
    #[serde(default)]
    pub score: f64,
    /// Matches in the file.
    #[serde(default)]
    pub matches: Vec<SearchMatch>,
}

/// A file matched by a JsonLogic search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSearchHit {
    /// Vault-relative path.
    pub filename: String,
    /// Value the query evaluated to for this file.
    #[serde(default)]
    pub result: Value,
}
