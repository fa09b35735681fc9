//! Manifest-declared tools
//!
//! A `manifest.json` names an executable and an ordered list of string
//! arguments:
//!
//! ```json
//! {
//!   "name": "wav_info",
//!   "description": "Print WAV header fields.",
//!   "command": "./wav-info",
//!   "args": [
//!     { "name": "file", "type": "string", "required": true },
//!     { "name": "format", "type": "string", "description": "text or json" }
//!   ]
//! }
//! ```
//!
//! Values are placed on the command line in declaration order with no flag
//! syntax. An optional argument the caller leaves out is omitted entirely, so
//! every later value moves one position left. Manifest authors must order
//! arguments with that in mind.

use crate::discovery::is_executable;
use crate::error::ToolhubError;
use crate::executor::CommandExecutor;
use crate::schema::CompiledSchema;
use crate::tools::registry::ToolSource;
use crate::tools::{ExecutionResult, Tool, ToolError, ToolMetadata, ToolOrigin};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

const MANIFEST_FILE: &str = "manifest.json";

/// Declared argument type; only strings are supported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestArgType {
    #[default]
    String,
}

/// One positional argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestArgument {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ManifestArgType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// Parsed `manifest.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolManifest {
    pub name: String,
    pub description: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<ManifestArgument>,
}

impl ToolManifest {
    /// Input schema: one string property per argument, nothing else accepted
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for arg in &self.args {
            let mut property = json!({ "type": "string" });
            if let Some(description) = &arg.description {
                property["description"] = Value::String(description.clone());
            }
            properties.insert(arg.name.clone(), property);
        }
        let required: Vec<&str> = self
            .args
            .iter()
            .filter(|arg| arg.required)
            .map(|arg| arg.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Command path, resolved against `manifest_dir` unless absolute
    pub fn resolve_command(&self, manifest_dir: &Path) -> PathBuf {
        let command = Path::new(&self.command);
        if command.is_absolute() {
            command.to_path_buf()
        } else {
            manifest_dir.join(command)
        }
    }
}

/// Read and parse one manifest file
pub fn load_manifest(path: &Path) -> crate::error::Result<ToolManifest> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| ToolhubError::Manifest(format!("{}: {}", path.display(), e)))
}

/// A tool backed by a manifest
#[derive(Debug)]
pub struct ManifestTool {
    metadata: ToolMetadata,
    schema: CompiledSchema,
    manifest: ToolManifest,
    command_path: PathBuf,
    executor: Arc<CommandExecutor>,
}

impl ManifestTool {
    /// Build a tool from a manifest found in `manifest_dir`.
    ///
    /// Fails when the command does not exist or is not executable.
    pub fn new(manifest: ToolManifest, manifest_dir: &Path, executor: Arc<CommandExecutor>) -> crate::error::Result<Self> {
        let command_path = manifest.resolve_command(manifest_dir);
        if !command_path.is_file() {
            return Err(ToolhubError::Manifest(format!(
                "command {} for tool {} does not exist",
                command_path.display(),
                manifest.name
            )));
        }
        if !is_executable(&command_path) {
            return Err(ToolhubError::Manifest(format!(
                "command {} for tool {} is not executable",
                command_path.display(),
                manifest.name
            )));
        }

        let schema = CompiledSchema::compile(manifest.input_schema())
            .map_err(|e| ToolhubError::Manifest(e.to_string()))?;

        Ok(Self {
            metadata: ToolMetadata::new(
                manifest.name.clone(),
                manifest.description.clone(),
                ToolOrigin::Manifest,
            ),
            schema,
            manifest,
            command_path,
            executor,
        })
    }

    pub fn command_path(&self) -> &Path {
        &self.command_path
    }

    /// Present values in declaration order
    pub fn build_args(&self, input: &Value) -> Vec<String> {
        self.manifest
            .args
            .iter()
            .filter_map(|arg| input.get(&arg.name).and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl Tool for ManifestTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    async fn execute(&self, args: Value) -> Result<ExecutionResult, ToolError> {
        let argv = self.build_args(&args);
        let command = self.command_path.to_string_lossy();
        self.executor.execute(self.name(), &command, &argv).await
    }
}

/// Source over every `manifest.json` under the tools directory
#[derive(Debug, Clone)]
pub struct ManifestSource {
    tools_dir: PathBuf,
    executor: Arc<CommandExecutor>,
}

impl ManifestSource {
    pub fn new(tools_dir: impl Into<PathBuf>, executor: Arc<CommandExecutor>) -> Self {
        Self {
            tools_dir: tools_dir.into(),
            executor,
        }
    }

    fn manifest_paths(&self) -> Vec<PathBuf> {
        if !self.tools_dir.is_dir() {
            tracing::debug!(dir = %self.tools_dir.display(), "tools directory not found, no manifests loaded");
            return Vec::new();
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(&self.tools_dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && entry.file_name() == MANIFEST_FILE)
            .map(|entry| entry.into_path())
            .collect();
        paths.sort();
        paths
    }
}

impl ToolSource for ManifestSource {
    fn label(&self) -> &'static str {
        "manifests"
    }

    fn discover(&self) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<Arc<dyn Tool>> = Vec::new();

        for path in self.manifest_paths() {
            let dir = path.parent().unwrap_or(&self.tools_dir);
            let loaded = load_manifest(&path)
                .and_then(|manifest| ManifestTool::new(manifest, dir, self.executor.clone()));
            match loaded {
                Ok(tool) => {
                    tracing::debug!(tool = tool.name(), path = %path.display(), "loaded manifest tool");
                    tools.push(Arc::new(tool));
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), "skipping manifest: {}", e);
                }
            }
        }

        tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::tools::ToolErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn executor() -> Arc<CommandExecutor> {
        Arc::new(CommandExecutor::new(SecurityConfig::default(), None))
    }

    fn write_tool(root: &Path, dir: &str, manifest: Value, command: Option<(&str, u32)>) {
        use std::os::unix::fs::PermissionsExt;
        let tool_dir = root.join(dir);
        fs::create_dir_all(&tool_dir).unwrap();
        fs::write(tool_dir.join(MANIFEST_FILE), manifest.to_string()).unwrap();
        if let Some((name, mode)) = command {
            let path = tool_dir.join(name);
            fs::write(&path, "#!/bin/sh\necho \"$@\"\n").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        }
    }

    fn echo_manifest(name: &str) -> Value {
        json!({
            "name": name,
            "description": "Echo arguments.",
            "command": "./run.sh",
            "args": [
                { "name": "first", "type": "string", "required": true },
                { "name": "second", "type": "string", "description": "optional" },
                { "name": "third", "type": "string" }
            ]
        })
    }

    #[test]
    fn test_input_schema_is_closed() {
        let manifest: ToolManifest = serde_json::from_value(echo_manifest("echo")).unwrap();
        let schema = manifest.input_schema();
        assert_eq!(schema["required"], json!(["first"]));
        assert_eq!(schema["additionalProperties"], json!(false));
        assert_eq!(schema["properties"]["second"]["description"], "optional");
        assert!(schema["properties"]["third"].get("description").is_none());
    }

    #[test]
    fn test_non_string_argument_type_rejected() {
        let result: Result<ToolManifest, _> = serde_json::from_value(json!({
            "name": "x",
            "description": "x",
            "command": "x",
            "args": [{ "name": "n", "type": "number" }]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_discover_skips_broken_manifests() {
        let root = TempDir::new().unwrap();
        write_tool(root.path(), "good", echo_manifest("echo_args"), Some(("run.sh", 0o755)));
        write_tool(root.path(), "not_exec", echo_manifest("not_exec"), Some(("run.sh", 0o644)));
        write_tool(root.path(), "missing", echo_manifest("missing"), None);
        fs::create_dir_all(root.path().join("garbled")).unwrap();
        fs::write(root.path().join("garbled").join(MANIFEST_FILE), "{ nope").unwrap();

        let tools = ManifestSource::new(root.path(), executor()).discover();
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["echo_args"]);
        assert_eq!(tools[0].metadata().origin, ToolOrigin::Manifest);
    }

    #[test]
    fn test_missing_tools_dir_yields_nothing() {
        let tools = ManifestSource::new("/definitely/not/here", executor()).discover();
        assert!(tools.is_empty());
    }

    #[tokio::test]
    async fn test_missing_optional_shifts_positions() {
        let root = TempDir::new().unwrap();
        write_tool(root.path(), "echo", echo_manifest("echo_args"), Some(("run.sh", 0o755)));
        let manifest = load_manifest(&root.path().join("echo").join(MANIFEST_FILE)).unwrap();
        let tool = ManifestTool::new(manifest, &root.path().join("echo"), executor()).unwrap();

        let input = tool.validate(&json!({"first": "a", "third": "c"})).unwrap();
        assert_eq!(tool.build_args(&input), vec!["a", "c"]);

        let result = tool.execute(input).await.unwrap();
        assert_eq!(result.output, "a c\n");
    }

    #[test]
    fn test_undeclared_arguments_rejected() {
        let root = TempDir::new().unwrap();
        write_tool(root.path(), "echo", echo_manifest("echo_args"), Some(("run.sh", 0o755)));
        let manifest = load_manifest(&root.path().join("echo").join(MANIFEST_FILE)).unwrap();
        let tool = ManifestTool::new(manifest, &root.path().join("echo"), executor()).unwrap();

        let errors = tool
            .validate(&json!({"first": "a", "extra": "b"}))
            .unwrap_err();
        assert_eq!(errors[0].code.as_deref(), Some("unrecognized_keys"));

        let err = crate::tools::ToolError::validation(tool.validate(&json!({})).unwrap_err());
        assert_eq!(err.kind, ToolErrorKind::SchemaValidation);
    }
}
