//! Vault backend access.
//!
//! [`VaultBackend`] is the seam between the tool handlers and the note store.
//! [`ObsidianClient`] implements it over the Local REST API plugin.

mod obsidian;

pub use obsidian::ObsidianClient;

use crate::Result;
use crate::models::{FileEntry, JsonSearchHit, SearchHit};
use async_trait::async_trait;
use serde_json::Value;

/// Operations the server needs from the note store.
///
/// Every method fails with [`crate::Error::Backend`] carrying the HTTP
/// status when the store rejects a request. Read operations fail with
/// [`crate::Error::NoContent`] when the store answers with an empty success.
#[async_trait]
pub trait VaultBackend: Send + Sync {
    /// Lists the vault root.
    async fn list_files_in_vault(&self) -> Result<Vec<FileEntry>>;

    /// Lists one directory.
    async fn list_files_in_dir(&self, dirpath: &str) -> Result<Vec<FileEntry>>;

    /// Returns the raw text of a note.
    async fn get_file_contents(&self, filepath: &str) -> Result<String>;

    /// Runs a simple text search.
    async fn search(&self, query: &str, context_length: u32) -> Result<Vec<SearchHit>>;

    /// Appends content to a note, creating it if missing.
    async fn append_content(&self, filepath: &str, content: &str) -> Result<()>;

    /// Replaces the full content of a note.
    async fn update_content(&self, filepath: &str, content: &str) -> Result<()>;

    /// Runs a JsonLogic query over vault files.
    async fn search_json(&self, query: &Value) -> Result<Vec<JsonSearchHit>>;
}
