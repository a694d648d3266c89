//! Front-matter property handlers.
//!
//! Both tools always answer with a [`crate::models::PropertyResult`]; a
//! failed read or an invalid update comes back as `success: false` rather
//! than as a protocol error.

use crate::Result;
use crate::mcp::tool_types::{FileArgs, UpdatePropertiesArgs, parse_args};
use crate::models::Properties;
use serde_json::Value;

use super::super::{ToolContext, ToolResult};

/// Executes the `get_properties` tool.
pub async fn execute_get_properties(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: FileArgs = parse_args(arguments)?;
    let result = ctx.properties.get_properties(&args.filepath).await;
    ToolResult::json(&result)
}

/// Executes the `update_properties` tool.
pub async fn execute_update_properties(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: UpdatePropertiesArgs = parse_args(arguments)?;
    let updates = Properties::try_from(args.properties)?;
    let result = ctx
        .properties
        .update_properties(&args.filepath, &updates, args.replace)
        .await;
    if result.success {
        tracing::info!(filepath = %args.filepath, replace = args.replace, "Updated properties");
    }
    ToolResult::json(&result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::VaultBackend;
    use crate::models::{FileEntry, JsonSearchHit, SearchHit};
    use crate::{Error, Result};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct OneNote {
        content: Mutex<String>,
    }

    #[async_trait]
    impl VaultBackend for OneNote {
        async fn list_files_in_vault(&self) -> Result<Vec<FileEntry>> {
            Ok(Vec::new())
        }

        async fn list_files_in_dir(&self, _dirpath: &str) -> Result<Vec<FileEntry>> {
            Ok(Vec::new())
        }

        async fn get_file_contents(&self, filepath: &str) -> Result<String> {
            if filepath == "note.md" {
                Ok(self.content.lock().unwrap().clone())
            } else {
                Err(Error::Backend {
                    status: 404,
                    code: Some(40400),
                    message: "File does not exist".into(),
                })
            }
        }

        async fn search(&self, _query: &str, _context_length: u32) -> Result<Vec<SearchHit>> {
            Ok(Vec::new())
        }

        async fn append_content(&self, _filepath: &str, _content: &str) -> Result<()> {
            Ok(())
        }

        async fn update_content(&self, _filepath: &str, content: &str) -> Result<()> {
            *self.content.lock().unwrap() = content.to_string();
            Ok(())
        }

        async fn search_json(&self, _query: &Value) -> Result<Vec<JsonSearchHit>> {
            Ok(Vec::new())
        }
    }

    fn context(content: &str) -> (Arc<OneNote>, ToolContext) {
        let backend = Arc::new(OneNote {
            content: Mutex::new(content.to_string()),
        });
        let ctx = ToolContext::new(backend.clone());
        (backend, ctx)
    }

    async fn call_update(ctx: &ToolContext, args: Value) -> Value {
        let result = execute_update_properties(ctx, args).await.unwrap();
        serde_json::from_str(&result.text_content()).unwrap()
    }

    #[tokio::test]
    async fn test_get_properties_reads_front_matter() {
        let (_, ctx) = context("---\ntitle: Plan\ntags:\n- '#work'\n---\nBody\n");
        let result = execute_get_properties(&ctx, json!({"filepath": "note.md"}))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&result.text_content()).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["properties"]["title"], "Plan");
        assert_eq!(value["properties"]["tags"], json!(["work"]));
    }

    #[tokio::test]
    async fn test_get_properties_missing_note_is_reported() {
        let (_, ctx) = context("");
        let result = execute_get_properties(&ctx, json!({"filepath": "gone.md"}))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&result.text_content()).unwrap();
        assert_eq!(value["success"], false);
        assert!(value["errors"][0].as_str().unwrap().contains("404"));
    }

    #[tokio::test]
    async fn test_update_merges_and_keeps_body() {
        let (backend, ctx) = context("---\ntags:\n- a\n- b\n---\nBody\n");
        let value = call_update(
            &ctx,
            json!({"filepath": "note.md", "properties": {"tags": ["#b", "#c"]}}),
        )
        .await;
        assert_eq!(value["success"], true);
        assert_eq!(value["properties"]["tags"], json!(["a", "b", "c"]));
        assert!(value["properties"]["modified"].is_string());

        let written = backend.content.lock().unwrap().clone();
        assert!(written.starts_with("---"));
        assert!(written.ends_with("Body\n"));
    }

    #[tokio::test]
    async fn test_update_replace_overwrites_lists() {
        let (_, ctx) = context("---\ntags:\n- a\n- b\n---\n");
        let value = call_update(
            &ctx,
            json!({"filepath": "note.md", "properties": {"tags": ["b", "c"]}, "replace": true}),
        )
        .await;
        assert_eq!(value["properties"]["tags"], json!(["b", "c"]));
    }

    #[tokio::test]
    async fn test_update_invalid_status_is_a_failed_result() {
        let (backend, ctx) = context("Body\n");
        let value = call_update(
            &ctx,
            json!({"filepath": "note.md", "properties": {"status": ["finished"]}}),
        )
        .await;
        assert_eq!(value["success"], false);
        assert_eq!(value["errors"].as_array().unwrap().len(), 1);
        assert_eq!(*backend.content.lock().unwrap(), "Body\n");
    }

    #[tokio::test]
    async fn test_update_replaces_unparseable_front_matter() {
        // The old block is lost; the body must survive.
        let (backend, ctx) = context("---\ntitle: [oops\n---\nBody\n");
        let value = call_update(
            &ctx,
            json!({"filepath": "note.md", "properties": {"tags": ["x"]}}),
        )
        .await;
        assert_eq!(value["success"], true);
        assert!(
            value["message"]
                .as_str()
                .unwrap()
                .contains("could not be parsed and was replaced")
        );
        assert_eq!(value["properties"]["tags"], json!(["x"]));
        assert!(value["properties"].get("title").is_none());

        let written = backend.content.lock().unwrap().clone();
        assert!(!written.contains("oops"));
        assert!(written.starts_with("---\n"));
        assert!(written.contains("tags:\n- x\n"));
        assert!(written.ends_with("---\nBody\n"));
    }
}
