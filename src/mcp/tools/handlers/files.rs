//! File listing, reading and writing handlers.

use crate::Result;
use crate::mcp::tool_types::{ContentArgs, DirArgs, FileArgs, NoArgs, parse_args};
use serde::Serialize;
use serde_json::Value;

use super::super::{ToolContext, ToolResult};

/// Acknowledgement returned by write tools.
#[derive(Debug, Serialize)]
struct WriteAck {
    success: bool,
    message: &'static str,
}

impl WriteAck {
    const fn ok(message: &'static str) -> Self {
        Self {
            success: true,
            message,
        }
    }
}

/// Executes the `list_files_in_vault` tool.
pub async fn execute_list_files_in_vault(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let _: NoArgs = parse_args(none_as_empty(arguments))?;
    let entries = ctx.backend.list_files_in_vault().await?;
    ToolResult::json(&entries)
}

/// Executes the `list_files_in_dir` tool.
pub async fn execute_list_files_in_dir(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: DirArgs = parse_args(arguments)?;
    let entries = ctx.backend.list_files_in_dir(&args.dirpath).await?;
    ToolResult::json(&entries)
}

/// Executes the `get_file_contents` tool.
///
/// Returns the note text as-is.
pub async fn execute_get_file_contents(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: FileArgs = parse_args(arguments)?;
    let content = ctx.backend.get_file_contents(&args.filepath).await?;
    Ok(ToolResult::text(content))
}

/// Executes the `append_content` tool.
pub async fn execute_append_content(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: ContentArgs = parse_args(arguments)?;
    ctx.backend
        .append_content(&args.filepath, &args.content)
        .await?;
    tracing::debug!(filepath = %args.filepath, bytes = args.content.len(), "Appended content");
    ToolResult::json(&WriteAck::ok("Content appended successfully"))
}

/// Executes the `patch_content` tool.
///
/// Replaces the whole note; there is no partial patching.
pub async fn execute_patch_content(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: ContentArgs = parse_args(arguments)?;
    ctx.backend
        .update_content(&args.filepath, &args.content)
        .await?;
    tracing::debug!(filepath = %args.filepath, bytes = args.content.len(), "Replaced content");
    ToolResult::json(&WriteAck::ok("Content updated successfully"))
}

/// Callers may omit `arguments` entirely for argument-less tools.
pub(super) fn none_as_empty(arguments: Value) -> Value {
    if arguments.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        arguments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::VaultBackend;
    use crate::models::{FileEntry, JsonSearchHit, SearchHit};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        writes: Mutex<Vec<(&'static str, String, String)>>,
    }

    #[async_trait]
    impl VaultBackend for Recorder {
        async fn list_files_in_vault(&self) -> Result<Vec<FileEntry>> {
            Ok(vec![
                FileEntry::from_listing("", "Inbox/"),
                FileEntry::from_listing("", "todo.md"),
            ])
        }

        async fn list_files_in_dir(&self, dirpath: &str) -> Result<Vec<FileEntry>> {
            Ok(vec![FileEntry::from_listing(dirpath, "plan.md")])
        }

        async fn get_file_contents(&self, filepath: &str) -> Result<String> {
            Ok(format!("contents of {filepath}"))
        }

        async fn search(&self, _query: &str, _context_length: u32) -> Result<Vec<SearchHit>> {
            Ok(Vec::new())
        }

        async fn append_content(&self, filepath: &str, content: &str) -> Result<()> {
            self.writes
                .lock()
                .unwrap()
                .push(("append", filepath.to_string(), content.to_string()));
            Ok(())
        }

        async fn update_content(&self, filepath: &str, content: &str) -> Result<()> {
            self.writes
                .lock()
                .unwrap()
                .push(("update", filepath.to_string(), content.to_string()));
            Ok(())
        }

        async fn search_json(&self, _query: &Value) -> Result<Vec<JsonSearchHit>> {
            Ok(Vec::new())
        }
    }

    fn context() -> (Arc<Recorder>, ToolContext) {
        let backend = Arc::new(Recorder::default());
        let ctx = ToolContext::new(backend.clone());
        (backend, ctx)
    }

    #[tokio::test]
    async fn test_list_vault_returns_tree() {
        let (_, ctx) = context();
        let result = execute_list_files_in_vault(&ctx, Value::Null).await.unwrap();
        let value: Value = serde_json::from_str(&result.text_content()).unwrap();
        assert_eq!(
            value,
            json!([
                {"path": "Inbox", "type": "folder"},
                {"path": "todo.md", "type": "file"}
            ])
        );
    }

    #[tokio::test]
    async fn test_list_dir_prefixes_paths() {
        let (_, ctx) = context();
        let result = execute_list_files_in_dir(&ctx, json!({"dirpath": "Projects"}))
            .await
            .unwrap();
        assert!(result.text_content().contains("Projects/plan.md"));
    }

    #[tokio::test]
    async fn test_get_file_contents_is_raw_text() {
        let (_, ctx) = context();
        let result = execute_get_file_contents(&ctx, json!({"filepath": "a.md"}))
            .await
            .unwrap();
        assert_eq!(result.text_content(), "contents of a.md");
    }

    #[tokio::test]
    async fn test_append_and_patch_use_distinct_writes() {
        let (backend, ctx) = context();
        let appended = execute_append_content(&ctx, json!({"filepath": "a.md", "content": "x"}))
            .await
            .unwrap();
        let patched = execute_patch_content(&ctx, json!({"filepath": "a.md", "content": "y"}))
            .await
            .unwrap();

        let appended: Value = serde_json::from_str(&appended.text_content()).unwrap();
        let patched: Value = serde_json::from_str(&patched.text_content()).unwrap();
        assert_eq!(appended["message"], "Content appended successfully");
        assert_eq!(patched["message"], "Content updated successfully");
        assert_eq!(patched["success"], true);

        let writes = backend.writes.lock().unwrap();
        assert_eq!(writes[0].0, "append");
        assert_eq!(writes[1], ("update", "a.md".to_string(), "y".to_string()));
    }
}
