//! Discovered scripts as tools

use crate::discovery::ScriptDescriptor;
use crate::executor::CommandExecutor;
use crate::schema::CompiledSchema;
use crate::tools::args::{flag_args, positional_args};
use crate::tools::registry::ToolSource;
use crate::tools::{ExecutionResult, Tool, ToolError, ToolMetadata, ToolOrigin};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A discovered `.sh` or `.py` script
#[derive(Debug)]
pub struct ScriptTool {
    metadata: ToolMetadata,
    descriptor: ScriptDescriptor,
    executor: Arc<CommandExecutor>,
}

impl ScriptTool {
    pub fn new(descriptor: ScriptDescriptor, executor: Arc<CommandExecutor>) -> Self {
        let metadata = ToolMetadata::new(
            descriptor.name.clone(),
            descriptor.description.clone(),
            ToolOrigin::Script,
        )
        .with_tag(descriptor.interpreter.clone());
        Self {
            metadata,
            descriptor,
            executor,
        }
    }

    pub fn descriptor(&self) -> &ScriptDescriptor {
        &self.descriptor
    }

    /// Script path, then structured fields as flags, then positional `args`
    pub fn build_args(&self, input: &Value) -> Vec<String> {
        let mut argv = self.descriptor.base_args.clone();
        if let Some(fields) = input.as_object() {
            argv.extend(flag_args(fields, &["args"]));
        }
        argv.extend(positional_args(input));
        argv
    }
}

#[async_trait]
impl Tool for ScriptTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    fn schema(&self) -> &CompiledSchema {
        &self.descriptor.schema
    }

    async fn execute(&self, args: Value) -> Result<ExecutionResult, ToolError> {
        let argv = self.build_args(&args);
        self.executor
            .execute(&self.descriptor.name, &self.descriptor.interpreter, &argv)
            .await
    }
}

/// Source over the scripts found at startup
#[derive(Debug, Clone)]
pub struct ScriptSource {
    scripts: Arc<Vec<ScriptDescriptor>>,
    executor: Arc<CommandExecutor>,
}

impl ScriptSource {
    pub fn new(scripts: Arc<Vec<ScriptDescriptor>>, executor: Arc<CommandExecutor>) -> Self {
        Self { scripts, executor }
    }
}

impl ToolSource for ScriptSource {
    fn label(&self) -> &'static str {
        "scripts"
    }

    fn discover(&self) -> Vec<Arc<dyn Tool>> {
        self.scripts
            .iter()
            .map(|descriptor| {
                Arc::new(ScriptTool::new(descriptor.clone(), self.executor.clone())) as Arc<dyn Tool>
            })
            .collect()
    }
}
