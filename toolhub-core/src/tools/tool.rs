//! Tool trait and metadata definitions
//!
//! Every invocable unit in the catalog implements [`Tool`]: it advertises a
//! name, a description and a compiled input schema, and turns validated input
//! into a subprocess execution.

use super::result::{ExecutionResult, ToolError, ValidationError};
use crate::schema::CompiledSchema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Where a tool came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOrigin {
    Script,
    Cli,
    Manifest,
    Builtin,
    Meta,
}

/// Tool metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Tool name (unique identifier)
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Source that produced the tool
    pub origin: ToolOrigin,

    /// Tags for categorization
    pub tags: Vec<String>,
}

impl ToolMetadata {
    /// Create new metadata with required fields
    pub fn new(name: impl Into<String>, description: impl Into<String>, origin: ToolOrigin) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            origin,
            tags: Vec::new(),
        }
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// The core Tool trait
///
/// `execute` receives input that has already passed [`Tool::validate`]; the
/// runtime performs rate limiting and validation before calling it.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get tool metadata
    fn metadata(&self) -> &ToolMetadata;

    /// Get tool name
    fn name(&self) -> &str {
        &self.metadata().name
    }

    /// Get tool description
    fn description(&self) -> &str {
        &self.metadata().description
    }

    /// Compiled input schema
    fn schema(&self) -> &CompiledSchema;

    /// Validate input, returning the accepted value
    fn validate(&self, args: &Value) -> Result<Value, Vec<ValidationError>> {
        self.schema().parse(args)
    }

    /// Build the argument vector and run the command
    async fn execute(&self, args: Value) -> Result<ExecutionResult, ToolError>;
}

/// Type alias for shared tool references
pub type BoxedTool = Arc<dyn Tool>;
