//! Model Context Protocol (MCP) Server Implementation
//!
//! Exposes the tool catalog to MCP clients using JSON-RPC 2.0 over
//! newline-delimited stdio.
//!
//! # Example
//!
//! ```rust,ignore
//! use toolhub_core::mcp::{McpServer, StdioTransport};
//!
//! let server = McpServer::builder(Arc::new(registry))
//!     .name("toolhub-mcp")
//!     .version("0.1.1")
//!     .build();
//!
//! server.run(&mut StdioTransport::stdio()).await?;
//! ```
//!
//! # Protocol Overview
//!
//! - `initialize` - Connection setup, advertises the tools capability
//! - `ping` - Liveness check
//! - `tools/list` - List available tools
//! - `tools/call` - Call a tool
//!
//! Requests without an `id` are notifications and are never answered.

mod protocol;
mod server;
mod transport;

pub use protocol::*;
pub use server::{McpServer, McpServerBuilder, McpServerConfig, call_result};
pub use transport::{Incoming, LineTransport, MemoryTransport, StdioTransport, Transport};
