//! The `run_script` meta-tool

use crate::discovery::ScriptDescriptor;
use crate::executor::CommandExecutor;
use crate::schema::CompiledSchema;
use crate::tools::args::positional_args;
use crate::tools::registry::ToolSource;
use crate::tools::{ExecutionResult, Tool, ToolError, ToolMetadata, ToolOrigin};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

pub const RUN_SCRIPT: &str = "run_script";

/// Dispatches to any discovered script by name
#[derive(Debug)]
pub struct RunScriptTool {
    metadata: ToolMetadata,
    schema: CompiledSchema,
    scripts: HashMap<String, ScriptDescriptor>,
    executor: Arc<CommandExecutor>,
}

impl RunScriptTool {
    pub fn new(scripts: &[ScriptDescriptor], executor: Arc<CommandExecutor>) -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Discovered script tool name (e.g., sh_audio_split)."
                },
                "args": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Arguments forwarded to the script."
                }
            },
            "required": ["name"]
        });
        // first descriptor per name wins, as in the registry
        let mut by_name = HashMap::new();
        for script in scripts {
            by_name
                .entry(script.name.clone())
                .or_insert_with(|| script.clone());
        }
        Self {
            metadata: ToolMetadata::new(
                RUN_SCRIPT,
                "Execute a discovered Toolhub script by name.",
                ToolOrigin::Meta,
            ),
            schema: CompiledSchema::compile_or_default(schema),
            scripts: by_name,
            executor,
        }
    }
}

#[async_trait]
impl Tool for RunScriptTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    async fn execute(&self, args: Value) -> Result<ExecutionResult, ToolError> {
        let name = args.get("name").and_then(Value::as_str).unwrap_or_default();
        let script = self
            .scripts
            .get(name)
            .ok_or_else(|| ToolError::unknown_script(name))?;

        let mut argv = script.base_args.clone();
        argv.extend(positional_args(&args));

        // limits and timeouts are keyed on the meta-tool, not the target
        self.executor
            .execute(RUN_SCRIPT, &script.interpreter, &argv)
            .await
    }
}

/// Registers `run_script` when at least one script exists
#[derive(Debug, Clone)]
pub struct MetaSource {
    scripts: Arc<Vec<ScriptDescriptor>>,
    executor: Arc<CommandExecutor>,
}

impl MetaSource {
    pub fn new(scripts: Arc<Vec<ScriptDescriptor>>, executor: Arc<CommandExecutor>) -> Self {
        Self { scripts, executor }
    }
}

impl ToolSource for MetaSource {
    fn label(&self) -> &'static str {
        "meta"
    }

    fn discover(&self) -> Vec<Arc<dyn Tool>> {
        if self.scripts.is_empty() {
            return Vec::new();
        }
        vec![Arc::new(RunScriptTool::new(&self.scripts, self.executor.clone())) as Arc<dyn Tool>]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::tools::ToolErrorKind;
    use std::path::PathBuf;

    fn executor() -> Arc<CommandExecutor> {
        Arc::new(CommandExecutor::new(SecurityConfig::default(), None))
    }

    fn echo_script() -> ScriptDescriptor {
        ScriptDescriptor {
            name: "sh_echo".to_string(),
            description: "echo".to_string(),
            interpreter: "sh".to_string(),
            base_args: vec!["-c".to_string(), "echo \"$@\"".to_string(), "sh_echo".to_string()],
            script_path: PathBuf::from("/app/scripts/echo.sh"),
            schema: CompiledSchema::default_args(),
        }
    }

    #[test]
    fn test_registered_only_with_scripts() {
        assert!(MetaSource::new(Arc::new(Vec::new()), executor()).discover().is_empty());

        let tools = MetaSource::new(Arc::new(vec![echo_script()]), executor()).discover();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), RUN_SCRIPT);
        assert_eq!(tools[0].metadata().origin, ToolOrigin::Meta);
    }

    #[tokio::test]
    async fn test_unknown_script() {
        let tool = RunScriptTool::new(&[echo_script()], executor());
        let err = tool.execute(json!({"name": "sh_missing"})).await.unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::UnknownScript);
        assert_eq!(err.message, "Script sh_missing is not registered.");
    }

    #[tokio::test]
    async fn test_dispatches_with_positional_args() {
        let tool = RunScriptTool::new(&[echo_script()], executor());
        let input = tool
            .validate(&json!({"name": "sh_echo", "args": ["one", " ", "two"]}))
            .unwrap();
        let result = tool.execute(input).await.unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output, "one two\n");
    }
}
