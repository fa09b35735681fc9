//! # Toolhub - Security-enforced tool execution for MCP
//!
//! Toolhub exposes local scripts and well-known command-line programs as MCP
//! tools, while keeping every invocation inside a configured safety envelope:
//! - Script discovery with embedded JSON metadata
//! - JSON Schema compilation into input validators
//! - Destructive-pattern blocking and path/host allowlists
//! - Guardrails for vulnerability scanners
//! - Sliding-window rate limiting per tool
//! - Bounded subprocess execution with output truncation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use toolhub_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ToolhubConfig::load()?;
//!     let registry = Arc::new(build_catalog(&config));
//!
//!     McpServer::builder(registry)
//!         .name(config.server.name.clone())
//!         .version(config.server.version.clone())
//!         .build()
//!         .run(&mut StdioTransport::stdio())
//!         .await
//! }
//! ```
//!
//! ## Invocation pipeline
//!
//! rate limit → schema validation → argument vector → safe-mode policy →
//! spawn with timeout → merged output → truncation

pub mod catalog;
pub mod config;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod mcp;
pub mod schema;
pub mod security;
pub mod tools;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{build_catalog, build_catalog_with};
    pub use crate::config::{SecurityConfig, ServerSettings, ToolhubConfig};
    pub use crate::discovery::{ScriptDescriptor, discover_scripts};
    pub use crate::error::{Result, ToolhubError};
    pub use crate::executor::{CommandExecutor, ExecOptions, TRUNCATION_MARKER};
    pub use crate::mcp::{
        ContentBlock, JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpServer, McpServerBuilder,
        McpServerConfig, McpTool, MemoryTransport, RequestId, StdioTransport, ToolCallResult,
        Transport,
    };
    pub use crate::schema::{CompiledSchema, SchemaError};
    pub use crate::security::{RateLimiter, SecurityError, SecurityPolicy};
    pub use crate::tools::{
        BoxedTool, ExecutableProbe, ExecutionResult, RegistryError, SearchPathProbe, Tool,
        ToolError, ToolErrorKind, ToolMetadata, ToolOrigin, ToolRegistry, ToolRuntime, ToolSource,
        ToolSummary, ValidationError,
    };
}
