//! Tool call pipeline.
//!
//! Every `tools/call` passes through the same stages:
//!
//! ```text
//! resolve ──► rate limit ──► validate ──► execute (with timeout) ──► budget
//!   │             │              │                 │
//!   NotFound   RateLimit     BadRequest      Timeout / backend error
//! ```
//!
//! Rejections before `execute` never reach the backend. A timeout drops the
//! handler future, which cancels any in-flight HTTP request.

use super::tools::{ToolContent, ToolContext, ToolRegistry, ToolResult};
use super::validation::validate_arguments;
use crate::observability::{InvocationContext, scope_invocation};
use crate::services::{RateLimiter, TokenBudgeter};
use crate::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Runs tool calls through rate limiting, validation, timeout and budgeting.
pub struct ToolPipeline {
    registry: ToolRegistry,
    context: ToolContext,
    limiter: Arc<RateLimiter>,
    budgeter: Arc<TokenBudgeter>,
    timeout: Duration,
}

impl ToolPipeline {
    /// Creates a pipeline over the full tool registry.
    #[must_use]
    pub fn new(
        context: ToolContext,
        limiter: Arc<RateLimiter>,
        budgeter: Arc<TokenBudgeter>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry: ToolRegistry::new(),
            context,
            limiter,
            budgeter,
            timeout,
        }
    }

    /// Returns the tool registry.
    #[must_use]
    pub const fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Returns the per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs one tool call.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] for an unknown tool
    /// - [`Error::RateLimitExceeded`] when the tool's window is exhausted
    /// - [`Error::Validation`] listing every argument violation
    /// - [`Error::Timeout`] when the handler outlives the timeout
    /// - the handler's own error otherwise
    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        let invocation = InvocationContext::new(name);
        let span = tracing::info_span!(
            "mcp.tool.call",
            tool.name = name,
            invocation.id = invocation.invocation_id(),
            status = tracing::field::Empty
        );

        let result = scope_invocation(invocation.clone(), self.run(name, arguments))
            .instrument(span.clone())
            .await;

        let status = match &result {
            Ok(_) => "success",
            Err(e) => e.code().as_str(),
        };
        span.record("status", status);
        if let Err(e) = &result {
            span.in_scope(|| tracing::debug!(error = %e, "Tool call failed"));
        }

        // Unknown names are not recorded as labels.
        let tool_label = if self.registry.get_tool(name).is_some() {
            name.to_string()
        } else {
            "unknown".to_string()
        };
        metrics::counter!(
            "mcp_tool_calls_total",
            "tool" => tool_label.clone(),
            "status" => status
        )
        .increment(1);
        metrics::histogram!("mcp_tool_duration_ms", "tool" => tool_label)
            .record(invocation.elapsed_ms());

        result
    }

    async fn run(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        let tool = self
            .registry
            .get_tool(name)
            .ok_or_else(|| Error::NotFound(format!("Unknown tool: {name}")))?;

        self.limiter.check(name)?;
        validate_arguments(&tool.input_schema, &arguments)?;

        tracing::debug!("Executing tool");
        let execution = self.registry.execute(&self.context, name, arguments);
        let outcome = tokio::time::timeout(self.timeout, execution)
            .await
            .map_err(|_| {
                tracing::warn!(timeout = ?self.timeout, "Tool call timed out");
                metrics::counter!("mcp_tool_timeouts_total", "tool" => name.to_string())
                    .increment(1);
                Error::Timeout {
                    operation: name.to_string(),
                    timeout: self.timeout,
                }
            })?;

        let result = match outcome {
            Ok(result) => result,
            Err(Error::NoContent) => ToolResult::json(&serde_json::json!({
                "success": true,
                "message": "Operation completed successfully"
            }))?,
            Err(e) => return Err(e),
        };

        Ok(self.budget(result))
    }

    /// Truncates each text block to the token ceiling.
    fn budget(&self, mut result: ToolResult) -> ToolResult {
        for block in &mut result.content {
            match block {
                ToolContent::Text { text } => {
                    let budgeted = self.budgeter.truncate(text);
                    if budgeted.truncated {
                        metrics::counter!("mcp_responses_truncated_total").increment(1);
                        *text = budgeted.text;
                    }
                },
            }
        }
        result
    }
}
