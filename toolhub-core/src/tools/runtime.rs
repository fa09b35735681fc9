//! Tool runtime
//!
//! The runtime wraps every invocation with the same front half of the
//! pipeline: rate-limit check, then schema validation. Building the argument
//! vector and running it through the executor is the tool's own job.

use super::result::{ExecutionResult, ToolError};
use super::tool::Tool;
use crate::security::RateLimiter;
use serde_json::Value;
use std::sync::Arc;

/// Shared invocation front-end
#[derive(Debug, Clone)]
pub struct ToolRuntime {
    limiter: Arc<RateLimiter>,
}

impl ToolRuntime {
    /// Create a runtime around a shared rate limiter
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Rate-limit, validate, then execute `tool`.
    ///
    /// The rate-limit slot is consumed even when validation later fails.
    pub async fn invoke(&self, tool: &dyn Tool, input: Value) -> Result<ExecutionResult, ToolError> {
        let name = tool.name();

        self.limiter.check(name).await?;

        let parsed = tool.validate(&input).map_err(|errors| {
            tracing::debug!(tool = name, errors = errors.len(), "input rejected by schema");
            ToolError::validation(errors)
        })?;

        tool.execute(parsed).await
    }
}
