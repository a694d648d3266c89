//! MCP server implementation.
//!
//! Exposes the vault over the Model Context Protocol.
//!
//! ## Features
//!
//! - **Tools**: file listing and reading, text and JsonLogic search, content
//!   writes, front-matter properties, tag index
//! - **Resources**: the tag index via `obsidian://tags`
//!
//! ## Usage
//!
//! ```bash
//! OBSIDIAN_API_KEY=... obsidian-mcp serve
//! ```
//!
//! ### Client Configuration
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "obsidian": {
//!       "command": "obsidian-mcp",
//!       "args": ["serve"],
//!       "env": { "OBSIDIAN_API_KEY": "<key>" }
//!     }
//!   }
//! }
//! ```

// Allow option_if_let_else for clearer match statements.
#![allow(clippy::option_if_let_else)]

mod pipeline;
mod resources;
mod server;
pub mod tool_types;
mod tools;
pub mod validation;

pub use pipeline::ToolPipeline;
pub use resources::{ResourceContent, ResourceDefinition, ResourceHandler, TAGS_URI};
pub use server::{MAX_REQUEST_BYTES, McpServer, PROTOCOL_VERSION, ServerContext};
pub use tools::{ToolContent, ToolContext, ToolDefinition, ToolRegistry, ToolResult};
