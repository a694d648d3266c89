//! Tag index handler.

use crate::Result;
use crate::mcp::tool_types::{GetTagsArgs, parse_args};
use serde_json::Value;

use super::files::none_as_empty;
use super::super::{ToolContext, ToolResult};

/// Executes the `get_tags` tool.
///
/// Rebuilds the index first when it is stale.
pub async fn execute_get_tags(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: GetTagsArgs = parse_args(none_as_empty(arguments))?;
    let prefix = args.path.as_deref().filter(|p| !p.trim().is_empty());
    let snapshot = ctx.tags.get_content(prefix).await?;
    ToolResult::json(&snapshot)
}
