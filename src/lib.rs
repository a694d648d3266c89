//! # obsidian-mcp
//!
//! Model Context Protocol server for an Obsidian vault.
//!
//! Exposes the Obsidian Local REST API plugin as MCP tools and resources so an
//! agent can list files, search text, edit note content, and manage YAML front
//! matter.
//!
//! ## Features
//!
//! - JSON-RPC 2.0 over stdio
//! - Per-tool fixed-window rate limiting
//! - Argument validation with path-traversal rejection
//! - Timeout-bounded dispatch that cancels in-flight backend requests
//! - Front-matter property merging with array union and `custom` deep merge
//! - Time-invalidated tag index
//! - Token-budgeted responses
//!
//! ## Example
//!
//! ```rust,ignore
//! use obsidian_mcp::{ServerConfig, mcp::McpServer};
//!
//! let config = ServerConfig::load(None)?;
//! let server = McpServer::from_config(&config)?;
//! server.run_stdio().await?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::fmt;
use std::time::Duration;
use thiserror::Error as ThisError;

pub mod client;
pub mod config;
pub mod mcp;
pub mod models;
pub mod observability;
pub mod services;

pub use client::{ObsidianClient, VaultBackend};
pub use config::ServerConfig;
pub use models::{Properties, TagSnapshot};
pub use services::{PropertyManager, RateLimiter, TagCache, TokenBudgeter};

/// Error type for obsidian-mcp operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed arguments, bad configuration values |
/// | `Validation` | Tool arguments or property updates fail schema checks |
/// | `Unauthorized` | The REST API rejects the API key |
/// | `NotFound` | Unknown tool, unknown resource, missing note |
/// | `RateLimitExceeded` | A tool exceeded its fixed-window quota |
/// | `Timeout` | A tool call outlived the dispatch timeout |
/// | `Backend` | The REST API answered with an error status |
/// | `NoContent` | The REST API signalled success with an empty body |
/// | `OperationFailed` | I/O, serialization, or other unexpected failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Schema validation failed.
    ///
    /// Carries every violation found, not just the first.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Authentication with the backend failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A tool, resource, or note does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A rate limit window is exhausted.
    #[error("rate limit exceeded for '{key}': max {max_requests} requests per {window:?}")]
    RateLimitExceeded {
        /// Rate limit key (tool name).
        key: String,
        /// Configured maximum per window.
        max_requests: u32,
        /// Window duration.
        window: Duration,
    },

    /// An operation did not finish in time.
    #[error("operation '{operation}' timed out after {timeout:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The configured timeout.
        timeout: Duration,
    },

    /// The backend returned an error status.
    #[error("backend error (HTTP {status}): {message}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Backend-specific error code, when the body carried one.
        code: Option<i64>,
        /// Error message.
        message: String,
    },

    /// The backend reported success without a response body.
    ///
    /// Never reaches a caller: the dispatch pipeline converts it into a
    /// normal success response.
    #[error("operation succeeded with no content")]
    NoContent,

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Returns the machine-readable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) | Self::Validation(_) => ErrorCode::BadRequest,
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::RateLimitExceeded { .. } => ErrorCode::RateLimitExceeded,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::Backend { status, .. } => ErrorCode::from_http_status(*status),
            Self::NoContent => ErrorCode::SuccessNoContent,
            Self::OperationFailed { .. } => ErrorCode::InternalError,
        }
    }

    /// Shorthand for an [`Error::OperationFailed`].
    pub fn operation(operation: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Error taxonomy surfaced to MCP callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Schema or validation failure.
    BadRequest,
    /// Missing or invalid credential.
    Unauthorized,
    /// Unknown tool or missing resource.
    NotFound,
    /// Rate limit window exhausted.
    RateLimitExceeded,
    /// Dispatch timeout elapsed.
    Timeout,
    /// Unexpected failure or backend 5xx.
    InternalError,
    /// Backend success with an empty body.
    SuccessNoContent,
}

impl ErrorCode {
    /// Maps an HTTP status from the backend onto the taxonomy.
    #[must_use]
    pub const fn from_http_status(status: u16) -> Self {
        match status {
            204 => Self::SuccessNoContent,
            400 | 405 | 422 => Self::BadRequest,
            401 | 403 => Self::Unauthorized,
            404 => Self::NotFound,
            408 | 504 => Self::Timeout,
            429 => Self::RateLimitExceeded,
            _ => Self::InternalError,
        }
    }

    /// Returns the stable string form of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::Timeout => "TIMEOUT",
            Self::InternalError => "INTERNAL_ERROR",
            Self::SuccessNoContent => "SUCCESS_NO_CONTENT",
        }
    }

    /// Returns the JSON-RPC error code used on the wire.
    #[must_use]
    pub const fn rpc_code(self) -> i32 {
        match self {
            Self::BadRequest => -32602,
            Self::Unauthorized => -32001,
            Self::NotFound => -32004,
            Self::RateLimitExceeded => -32029,
            Self::Timeout => -32008,
            Self::InternalError => -32603,
            Self::SuccessNoContent => -32000,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for obsidian-mcp operations.
pub type Result<T> = std::result::Result<T, Error>;
