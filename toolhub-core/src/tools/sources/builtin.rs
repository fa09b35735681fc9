//! Hand-built tools for common executables
//!
//! Each tool has a bespoke schema and always checks its path or URL input
//! against the allowlists, whether or not safe mode is enabled.

use super::ExecutableProbe;
use crate::executor::CommandExecutor;
use crate::schema::CompiledSchema;
use crate::tools::registry::ToolSource;
use crate::tools::{ExecutionResult, Tool, ToolError, ToolMetadata, ToolOrigin};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;

const SCANNER_ALLOWED_TAGS: &[&str] = &["info", "misconfiguration"];
const SCANNER_DEFAULT_TAGS: &str = "info,misconfiguration";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    PdfText,
    PdfInfo,
    MediaProbe,
    Ocr,
    SafeScan,
}

impl BuiltinKind {
    pub const ALL: [BuiltinKind; 5] = [
        BuiltinKind::PdfText,
        BuiltinKind::PdfInfo,
        BuiltinKind::MediaProbe,
        BuiltinKind::Ocr,
        BuiltinKind::SafeScan,
    ];

    pub fn tool_name(self) -> &'static str {
        match self {
            BuiltinKind::PdfText => "pdftotext_extract",
            BuiltinKind::PdfInfo => "pdfinfo_read",
            BuiltinKind::MediaProbe => "ffprobe_info",
            BuiltinKind::Ocr => "tesseract_ocr",
            BuiltinKind::SafeScan => "nuclei_safe",
        }
    }

    /// Executable that must be present for the tool to be registered
    pub fn command(self) -> &'static str {
        match self {
            BuiltinKind::PdfText => "pdftotext",
            BuiltinKind::PdfInfo => "pdfinfo",
            BuiltinKind::MediaProbe => "ffprobe",
            BuiltinKind::Ocr => "tesseract",
            BuiltinKind::SafeScan => "nuclei",
        }
    }

    fn description(self) -> &'static str {
        match self {
            BuiltinKind::PdfText => "Extract raw text from a PDF file using pdftotext.",
            BuiltinKind::PdfInfo => "Read PDF metadata using pdfinfo.",
            BuiltinKind::MediaProbe => "Inspect media streams using ffprobe (JSON output).",
            BuiltinKind::Ocr => "Perform OCR on an image using Tesseract (stdout output).",
            BuiltinKind::SafeScan => "Run nuclei with safe-mode defaults (info/low severity).",
        }
    }

    fn schema(self) -> Value {
        match self {
            BuiltinKind::PdfText | BuiltinKind::PdfInfo => json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Absolute or relative path to the PDF file." }
                },
                "required": ["path"]
            }),
            BuiltinKind::MediaProbe => json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Absolute or relative path to the media file." }
                },
                "required": ["path"]
            }),
            BuiltinKind::Ocr => json!({
                "type": "object",
                "properties": {
                    "imagePath": { "type": "string", "description": "Path to the image to OCR." },
                    "lang": { "type": "string", "description": "Optional Tesseract language code (e.g., eng)." }
                },
                "required": ["imagePath"]
            }),
            BuiltinKind::SafeScan => json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "Target URL or hostname." },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Optional nuclei template tags (info,misconfiguration)."
                    }
                },
                "required": ["url"]
            }),
        }
    }
}

/// One of the hand-built tools
#[derive(Debug)]
pub struct BuiltinTool {
    kind: BuiltinKind,
    metadata: ToolMetadata,
    schema: CompiledSchema,
    executable: PathBuf,
    scanner_templates: Option<PathBuf>,
    executor: Arc<CommandExecutor>,
}

impl BuiltinTool {
    pub fn new(
        kind: BuiltinKind,
        executable: PathBuf,
        scanner_templates: Option<PathBuf>,
        executor: Arc<CommandExecutor>,
    ) -> Self {
        Self {
            kind,
            metadata: ToolMetadata::new(kind.tool_name(), kind.description(), ToolOrigin::Builtin),
            schema: CompiledSchema::compile_or_default(kind.schema()),
            executable,
            scanner_templates,
            executor,
        }
    }

    pub fn kind(&self) -> BuiltinKind {
        self.kind
    }

    /// Check the path or URL input, then build the argument vector
    pub fn build_args(&self, input: &Value) -> Result<Vec<String>, ToolError> {
        let policy = self.executor.policy();
        let text = |key: &str| input.get(key).and_then(Value::as_str).unwrap_or_default().to_string();

        let argv = match self.kind {
            BuiltinKind::PdfText => {
                let path = text("path");
                policy.ensure_path_allowed(&path)?;
                vec![path, "-".to_string()]
            }
            BuiltinKind::PdfInfo => {
                let path = text("path");
                policy.ensure_path_allowed(&path)?;
                vec![path]
            }
            BuiltinKind::MediaProbe => {
                let path = text("path");
                policy.ensure_path_allowed(&path)?;
                ["-v", "error", "-show_format", "-show_streams", "-of", "json"]
                    .iter()
                    .map(|s| s.to_string())
                    .chain(std::iter::once(path))
                    .collect()
            }
            BuiltinKind::Ocr => {
                let image = text("imagePath");
                policy.ensure_path_allowed(&image)?;
                let mut argv = vec![image, "stdout".to_string()];
                if let Some(lang) = input.get("lang").and_then(Value::as_str) {
                    if !lang.is_empty() {
                        argv.push("-l".to_string());
                        argv.push(lang.to_string());
                    }
                }
                argv
            }
            BuiltinKind::SafeScan => {
                let url = text("url");
                policy.ensure_host_allowed(&url)?;
                let mut argv = vec![
                    "-severity".to_string(),
                    "info,low".to_string(),
                    "-tags".to_string(),
                    scanner_tags(input.get("tags")),
                    "-target".to_string(),
                    url,
                ];
                if let Some(templates) = &self.scanner_templates {
                    argv.push("-t".to_string());
                    argv.push(templates.to_string_lossy().into_owned());
                }
                argv
            }
        };
        Ok(argv)
    }
}

/// Requested tags limited to the allowed set, or the default list
fn scanner_tags(requested: Option<&Value>) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for tag in requested
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
    {
        if SCANNER_ALLOWED_TAGS.contains(&tag) && !kept.contains(&tag) {
            kept.push(tag);
        }
    }
    if kept.is_empty() {
        SCANNER_DEFAULT_TAGS.to_string()
    } else {
        kept.join(",")
    }
}

#[async_trait]
impl Tool for BuiltinTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    async fn execute(&self, args: Value) -> Result<ExecutionResult, ToolError> {
        let argv = self.build_args(&args)?;
        let command = self.executable.to_string_lossy();
        self.executor.execute(self.name(), &command, &argv).await
    }
}

/// Source registering each hand-built tool whose executable is present
#[derive(Debug, Clone)]
pub struct BuiltinSource {
    probe: Arc<dyn ExecutableProbe>,
    scanner_templates: Option<PathBuf>,
    executor: Arc<CommandExecutor>,
}

impl BuiltinSource {
    pub fn new(
        probe: Arc<dyn ExecutableProbe>,
        scanner_templates: Option<PathBuf>,
        executor: Arc<CommandExecutor>,
    ) -> Self {
        Self {
            probe,
            scanner_templates,
            executor,
        }
    }
}

impl ToolSource for BuiltinSource {
    fn label(&self) -> &'static str {
        "builtin"
    }

    fn discover(&self) -> Vec<Arc<dyn Tool>> {
        BuiltinKind::ALL
            .iter()
            .filter_map(|kind| {
                let executable = self.probe.resolve(kind.command())?;
                Some(Arc::new(BuiltinTool::new(
                    *kind,
                    executable,
                    self.scanner_templates.clone(),
                    self.executor.clone(),
                )) as Arc<dyn Tool>)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::tools::ToolErrorKind;
    use crate::tools::sources::testing::FixedProbe;

    fn executor(safe_mode: bool) -> Arc<CommandExecutor> {
        let config = SecurityConfig {
            safe_mode,
            ..SecurityConfig::default()
        };
        Arc::new(CommandExecutor::new(config, None))
    }

    fn tool(kind: BuiltinKind, templates: Option<&str>) -> BuiltinTool {
        BuiltinTool::new(
            kind,
            PathBuf::from(kind.command()),
            templates.map(PathBuf::from),
            executor(false),
        )
    }

    #[test]
    fn test_registered_only_when_present() {
        let probe = FixedProbe::default()
            .with("pdfinfo", "/usr/bin/pdfinfo")
            .with("nuclei", "/usr/local/bin/nuclei");
        let tools = BuiltinSource::new(Arc::new(probe), None, executor(true)).discover();
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["pdfinfo_read", "nuclei_safe"]);
        assert_eq!(tools[0].metadata().origin, ToolOrigin::Builtin);
    }

    #[test]
    fn test_argument_vectors() {
        let argv = tool(BuiltinKind::PdfText, None)
            .build_args(&json!({"path": "/data/a.pdf"}))
            .unwrap();
        assert_eq!(argv, vec!["/data/a.pdf", "-"]);

        let argv = tool(BuiltinKind::MediaProbe, None)
            .build_args(&json!({"path": "clip.mp4"}))
            .unwrap();
        assert_eq!(
            argv,
            vec!["-v", "error", "-show_format", "-show_streams", "-of", "json", "clip.mp4"]
        );

        let argv = tool(BuiltinKind::Ocr, None)
            .build_args(&json!({"imagePath": "/tmp/scan.png", "lang": "eng"}))
            .unwrap();
        assert_eq!(argv, vec!["/tmp/scan.png", "stdout", "-l", "eng"]);
    }

    #[test]
    fn test_path_checked_without_safe_mode() {
        let err = tool(BuiltinKind::PdfInfo, None)
            .build_args(&json!({"path": "/etc/shadow"}))
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::PathNotAllowed);
    }

    #[test]
    fn test_scanner_arguments() {
        let scanner = tool(BuiltinKind::SafeScan, Some("/opt/templates"));
        let argv = scanner
            .build_args(&json!({"url": "http://localhost:3000", "tags": ["cve", "misconfiguration"]}))
            .unwrap();
        assert_eq!(
            argv,
            vec![
                "-severity",
                "info,low",
                "-tags",
                "misconfiguration",
                "-target",
                "http://localhost:3000",
                "-t",
                "/opt/templates"
            ]
        );

        let argv = tool(BuiltinKind::SafeScan, None)
            .build_args(&json!({"url": "localhost"}))
            .unwrap();
        assert_eq!(argv[3], "info,misconfiguration");
        assert_eq!(argv.len(), 6);

        let err = scanner
            .build_args(&json!({"url": "https://example.org"}))
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::HostNotAllowed);
    }
}
