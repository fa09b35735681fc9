//! Tool system
//!
//! Every callable tool implements [`Tool`] and is reached through the
//! [`ToolRegistry`], which runs the shared front half of the pipeline:
//! - Sliding-window rate limiting per tool name
//! - Schema validation, dropping undeclared fields
//! - Argument-vector construction, owned by each tool
//! - Policy enforcement and bounded execution in the executor
//!
//! # Example
//!
//! ```rust,no_run
//! use toolhub_core::catalog::build_catalog;
//! use toolhub_core::config::ToolhubConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = build_catalog(&ToolhubConfig::load()?);
//! let result = registry.invoke("jq", serde_json::json!({"args": ["--version"]})).await?;
//! println!("{}", result.output);
//! # Ok(())
//! # }
//! ```

pub mod args;
mod registry;
mod result;
mod runtime;
pub mod sources;
mod tool;

pub use registry::{RegistryError, SkippedTool, ToolRegistry, ToolSource, ToolSummary};
pub use result::{ExecutionResult, ToolError, ToolErrorKind, ValidationError};
pub use runtime::ToolRuntime;
pub use sources::{ExecutableProbe, SearchPathProbe};
pub use tool::{BoxedTool, Tool, ToolMetadata, ToolOrigin};
