//! MCP resource handlers.
//!
//! Supported URIs:
//!
//! - `obsidian://tags`: the tag index snapshot as JSON

use crate::services::TagCache;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// URI of the tag index resource.
pub const TAGS_URI: &str = "obsidian://tags";

const JSON_MIME: &str = "application/json";

/// Resolves resource URIs to content.
pub struct ResourceHandler {
    tags: Arc<TagCache>,
}

impl ResourceHandler {
    /// Creates a handler reading from the shared tag cache.
    #[must_use]
    pub const fn new(tags: Arc<TagCache>) -> Self {
        Self { tags }
    }

    /// Lists the resources this server exposes.
    #[must_use]
    pub fn list_resources(&self) -> Vec<ResourceDefinition> {
        vec![ResourceDefinition {
            uri: TAGS_URI.to_string(),
            name: "Vault tags".to_string(),
            description: Some(
                "Front-matter tags across the vault with the files that use them".to_string(),
            ),
            mime_type: Some(JSON_MIME.to_string()),
        }]
    }

    /// Reads a resource by URI.
    ///
    /// The tag snapshot is rebuilt first when stale.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown URI, or the tag cache's
    /// rebuild error.
    pub async fn get_resource(&self, uri: &str) -> Result<ResourceContent> {
        match uri {
            TAGS_URI => {
                let snapshot = self.tags.get_content(None).await?;
                let text = serde_json::to_string_pretty(&snapshot)
                    .map_err(|e| Error::operation("serialize_tags", e))?;
                Ok(ResourceContent {
                    uri: uri.to_string(),
                    mime_type: Some(JSON_MIME.to_string()),
                    text: Some(text),
                })
            },
            _ => Err(Error::NotFound(format!("Unknown resource: {uri}"))),
        }
    }
}

/// Definition of an MCP resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// Resource URI.
    pub uri: String,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// MIME type of the resource.
    pub mime_type: Option<String>,
}

/// Content of an MCP resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceContent {
    /// Resource URI.
    pub uri: String,
    /// MIME type.
    pub mime_type: Option<String>,
    /// Text content.
    pub text: Option<String>,
}
