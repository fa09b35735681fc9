//! Catalog assembly
//!
//! Builds the immutable [`ToolRegistry`] once at startup. Sources are composed
//! in a fixed precedence order: discovered scripts, the CLI whitelist,
//! manifests, hand-built tools, then `run_script`.

use crate::config::ToolhubConfig;
use crate::discovery::discover_scripts;
use crate::executor::CommandExecutor;
use crate::security::RateLimiter;
use crate::tools::sources::{
    BuiltinSource, CliSource, ExecutableProbe, ManifestSource, MetaSource, ScriptSource,
    SearchPathProbe,
};
use crate::tools::{ToolRegistry, ToolRuntime, ToolSource};
use std::sync::Arc;

/// Build the catalog, resolving executables on `PATH`
pub fn build_catalog(config: &ToolhubConfig) -> ToolRegistry {
    let limiter = RateLimiter::new(
        config.security.rate_limit_count,
        config.security.rate_limit_window(),
    );
    build_catalog_with(config, Arc::new(SearchPathProbe), Arc::new(limiter))
}

/// Build the catalog with an explicit probe and rate limiter
pub fn build_catalog_with(
    config: &ToolhubConfig,
    probe: Arc<dyn ExecutableProbe>,
    limiter: Arc<RateLimiter>,
) -> ToolRegistry {
    let executor = Arc::new(CommandExecutor::new(
        config.security.clone(),
        Some(config.scripts_root.as_path()),
    ));
    let scripts = Arc::new(discover_scripts(&config.scripts_root));
    tracing::info!(
        root = %config.scripts_root.display(),
        count = scripts.len(),
        "script discovery complete"
    );

    let sources: Vec<Box<dyn ToolSource>> = vec![
        Box::new(ScriptSource::new(scripts.clone(), executor.clone())),
        Box::new(CliSource::new(probe.clone(), executor.clone())),
        Box::new(ManifestSource::new(&config.tools_dir, executor.clone())),
        Box::new(BuiltinSource::new(
            probe,
            config.scanner_templates.clone(),
            executor.clone(),
        )),
        Box::new(MetaSource::new(scripts, executor)),
    ];

    ToolRegistry::build(&sources, ToolRuntime::new(limiter))
}
