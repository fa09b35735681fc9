//! Whitelisted command-line tools

use super::ExecutableProbe;
use crate::executor::CommandExecutor;
use crate::schema::CompiledSchema;
use crate::tools::args::positional_args;
use crate::tools::registry::ToolSource;
use crate::tools::{ExecutionResult, Tool, ToolError, ToolMetadata, ToolOrigin};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// A well-known executable exposed when present on `PATH`
#[derive(Debug, Clone, Copy)]
pub struct CliEntry {
    pub name: &'static str,
    /// Tried in order; the first one found is used
    pub commands: &'static [&'static str],
    pub description: &'static str,
}

pub const CLI_WHITELIST: &[CliEntry] = &[
    CliEntry {
        name: "ffmpeg",
        commands: &["ffmpeg"],
        description: "Execute the ffmpeg multimedia CLI.",
    },
    CliEntry {
        name: "sox",
        commands: &["sox"],
        description: "Execute the SoX audio processing CLI.",
    },
    CliEntry {
        name: "magick",
        commands: &["magick", "convert"],
        description: "Execute ImageMagick (magick/convert).",
    },
    CliEntry {
        name: "tesseract",
        commands: &["tesseract"],
        description: "Execute the Tesseract OCR engine.",
    },
    CliEntry {
        name: "pdftotext",
        commands: &["pdftotext"],
        description: "Execute pdftotext from poppler-utils.",
    },
    CliEntry {
        name: "pdfinfo",
        commands: &["pdfinfo"],
        description: "Execute pdfinfo from poppler-utils.",
    },
    CliEntry {
        name: "jq",
        commands: &["jq"],
        description: "Execute the jq JSON processor.",
    },
    CliEntry {
        name: "curl",
        commands: &["curl"],
        description: "Execute curl for HTTP requests (restricted by allowlist).",
    },
    CliEntry {
        name: "exiftool",
        commands: &["exiftool"],
        description: "Execute ExifTool metadata inspector.",
    },
    CliEntry {
        name: "syft",
        commands: &["syft"],
        description: "Execute Anchore Syft software bill-of-materials scanner.",
    },
    CliEntry {
        name: "grype",
        commands: &["grype"],
        description: "Execute Anchore Grype vulnerability scanner.",
    },
    CliEntry {
        name: "trivy",
        commands: &["trivy"],
        description: "Execute Trivy vulnerability scanner.",
    },
    CliEntry {
        name: "nuclei",
        commands: &["nuclei"],
        description: "Execute ProjectDiscovery nuclei (safe-mode restrictions apply).",
    },
];

/// A whitelisted executable taking positional arguments
#[derive(Debug)]
pub struct CliTool {
    metadata: ToolMetadata,
    schema: CompiledSchema,
    executable: PathBuf,
    executor: Arc<CommandExecutor>,
}

impl CliTool {
    pub fn new(entry: &CliEntry, executable: PathBuf, executor: Arc<CommandExecutor>) -> Self {
        Self {
            metadata: ToolMetadata::new(entry.name, entry.description, ToolOrigin::Cli),
            schema: CompiledSchema::default_args(),
            executable,
            executor,
        }
    }

    pub fn executable(&self) -> &PathBuf {
        &self.executable
    }
}

#[async_trait]
impl Tool for CliTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    async fn execute(&self, args: Value) -> Result<ExecutionResult, ToolError> {
        let argv = positional_args(&args);

        // screened even with safe mode off
        for arg in &argv {
            self.executor.policy().screen_argument(arg)?;
        }

        let command = self.executable.to_string_lossy();
        self.executor.execute(self.name(), &command, &argv).await
    }
}

/// Source over [`CLI_WHITELIST`]
#[derive(Debug, Clone)]
pub struct CliSource {
    probe: Arc<dyn ExecutableProbe>,
    executor: Arc<CommandExecutor>,
}

impl CliSource {
    pub fn new(probe: Arc<dyn ExecutableProbe>, executor: Arc<CommandExecutor>) -> Self {
        Self { probe, executor }
    }
}

impl ToolSource for CliSource {
    fn label(&self) -> &'static str {
        "cli"
    }

    fn discover(&self) -> Vec<Arc<dyn Tool>> {
        CLI_WHITELIST
            .iter()
            .filter_map(|entry| {
                let Some((command, executable)) = self.probe.resolve_any(entry.commands) else {
                    tracing::debug!(tool = entry.name, "executable not found, tool not registered");
                    return None;
                };
                tracing::debug!(tool = entry.name, command, path = %executable.display(), "registering CLI tool");
                Some(Arc::new(CliTool::new(entry, executable, self.executor.clone())) as Arc<dyn Tool>)
            })
            .collect()
    }
}
