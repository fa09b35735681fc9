//! Tool Registry
//!
//! The registry is an immutable catalog assembled once at startup from a list
//! of [`ToolSource`]s. Sources are consulted in order and the first tool to
//! claim a name keeps it; later tools with the same name are skipped, logged
//! and recorded in [`ToolRegistry::skipped`].
//!
//! # Example
//!
//! ```rust,ignore
//! use toolhub_core::tools::{ToolRegistry, ToolRuntime};
//!
//! let registry = ToolRegistry::build(&sources, ToolRuntime::new(limiter));
//! let result = registry.invoke("sh_tree_list", serde_json::json!({})).await?;
//! ```

use super::result::{ExecutionResult, ToolError, ToolErrorKind};
use super::runtime::ToolRuntime;
use super::tool::{Tool, ToolOrigin};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Tool with this name already exists
    DuplicateTool(String),
    /// Tool not found
    NotFound(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::DuplicateTool(name) => {
                write!(f, "Tool '{}' is already registered", name)
            }
            RegistryError::NotFound(name) => {
                write!(f, "Tool '{}' not found", name)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// A producer of tools, consulted once while the catalog is built
pub trait ToolSource: Send + Sync {
    /// Short label used in logs
    fn label(&self) -> &'static str;

    /// Produce this source's tools
    fn discover(&self) -> Vec<Arc<dyn Tool>>;
}

/// Summary of a tool for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSummary {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// Advertised input schema
    pub schema: Value,
}

impl From<&dyn Tool> for ToolSummary {
    fn from(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            schema: tool.schema().document().clone(),
        }
    }
}

/// A tool dropped because its name was already taken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTool {
    pub name: String,
    pub source: &'static str,
    pub kept_origin: ToolOrigin,
}

/// Immutable catalog of callable tools
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
    skipped: Vec<SkippedTool>,
    runtime: ToolRuntime,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tool_count", &self.tools.len())
            .field("tools", &self.names())
            .field("skipped", &self.skipped)
            .finish()
    }
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new(runtime: ToolRuntime) -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
            skipped: Vec::new(),
            runtime,
        }
    }

    /// Build the catalog from `sources`, in order
    pub fn build(sources: &[Box<dyn ToolSource>], runtime: ToolRuntime) -> Self {
        let mut registry = Self::new(runtime);

        for source in sources {
            let tools = source.discover();
            tracing::debug!(source = source.label(), count = tools.len(), "source discovered tools");

            for tool in tools {
                let name = tool.name().to_string();
                if let Err(e) = registry.register(tool) {
                    let kept_origin = registry
                        .get(&name)
                        .map(|kept| kept.metadata().origin)
                        .unwrap_or(ToolOrigin::Meta);
                    tracing::warn!(
                        tool = %name,
                        source = source.label(),
                        ?kept_origin,
                        "{}; skipping later definition",
                        e
                    );
                    registry.skipped.push(SkippedTool {
                        name,
                        source: source.label(),
                        kept_origin,
                    });
                }
            }
        }

        tracing::info!(
            tools = registry.len(),
            skipped = registry.skipped.len(),
            "tool catalog ready"
        );
        registry
    }

    /// Register a tool
    ///
    /// Returns an error if a tool with the same name is already registered.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Check if a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All tools in registration order
    pub fn all(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tools dropped because of name collisions
    pub fn skipped(&self) -> &[SkippedTool] {
        &self.skipped
    }

    /// List all tools with their summaries
    pub fn list(&self) -> Vec<ToolSummary> {
        self.tools
            .iter()
            .map(|t| ToolSummary::from(t.as_ref()))
            .collect()
    }

    /// Invoke a tool by name through the runtime
    pub async fn invoke(&self, name: &str, input: Value) -> Result<ExecutionResult, ToolError> {
        let tool = self.get(name).ok_or_else(|| {
            ToolError::new(
                ToolErrorKind::Internal,
                RegistryError::NotFound(name.to_string()).to_string(),
            )
        })?;
        self.runtime.invoke(tool.as_ref(), input).await
    }
}
