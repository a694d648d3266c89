//! Invocation context propagation for correlation IDs.

use std::future::Future;
use std::time::Instant;
use uuid::Uuid;

/// Per-invocation context: tool name, correlation ID and start time.
#[derive(Clone, Debug)]
pub struct InvocationContext {
    invocation_id: String,
    tool: String,
    started: Instant,
}

impl InvocationContext {
    /// Creates a context with a generated ID.
    #[must_use]
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            invocation_id: Uuid::new_v4().to_string(),
            tool: tool.into(),
            started: Instant::now(),
        }
    }

    /// Creates a context with an existing ID.
    #[must_use]
    pub fn from_id(invocation_id: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            tool: tool.into(),
            started: Instant::now(),
        }
    }

    /// Returns the invocation ID.
    #[must_use]
    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    /// Returns the tool name.
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Milliseconds since the invocation started.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

tokio::task_local! {
    static TASK_CONTEXT: InvocationContext;
}

/// Scopes an invocation context across an async future.
pub async fn scope_invocation<F, T>(context: InvocationContext, fut: F) -> T
where
    F: Future<Output = T>,
{
    TASK_CONTEXT.scope(context, fut).await
}

/// Returns the current invocation ID, if set.
#[must_use]
pub fn current_invocation_id() -> Option<String> {
    TASK_CONTEXT
        .try_with(|ctx| ctx.invocation_id.clone())
        .ok()
}
