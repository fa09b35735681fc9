//! Toolhub MCP server - exposes scripts and CLIs over stdio

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use toolhub_core::catalog::build_catalog;
use toolhub_core::config::ToolhubConfig;
use toolhub_core::mcp::{McpServer, StdioTransport};

#[derive(Parser)]
#[command(name = "toolhub-mcp")]
#[command(about = "Security-enforced MCP tool server", long_about = None)]
#[command(version)]
struct Cli {
    /// Print the tool catalog as JSON and exit
    #[arg(long)]
    list_tools: bool,

    /// TOML configuration file layered under the environment
    #[arg(short, long, env = "TOOLHUB_CONFIG_PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = ToolhubConfig::load_with(cli.config).context("failed to load configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let registry = build_catalog(&config);

    if cli.list_tools {
        let catalog = serde_json::to_string_pretty(&registry.list())?;
        println!("{}", catalog);
        return Ok(());
    }

    tracing::info!(
        name = %config.server.name,
        version = %config.server.version,
        tools = registry.len(),
        "serving tools over stdio"
    );

    McpServer::builder(Arc::new(registry))
        .name(config.server.name)
        .version(config.server.version)
        .build()
        .run(&mut StdioTransport::stdio())
        .await
        .context("MCP server failed")?;

    Ok(())
}
