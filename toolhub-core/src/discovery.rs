//! Script discovery
//!
//! Walks the scripts root for executable `.sh` and `.py` files and turns each one
//! into a [`ScriptDescriptor`]. A script may carry an embedded metadata block
//! between `#==MCP==` and `#==/MCP==` lines; each line of the block is stripped
//! of its leading `#` and the remainder is parsed as JSON with optional
//! `description` and `schema` fields.

use crate::schema::CompiledSchema;
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::{DirEntry, WalkDir};

const METADATA_START: &str = "#==MCP==";
const METADATA_END: &str = "#==/MCP==";

static COMMENT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#\s?").expect("comment prefix regex"));
static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("name normalisation regex"));

/// A discovered script, ready to be exposed as a tool
#[derive(Debug, Clone)]
pub struct ScriptDescriptor {
    /// Tool name, e.g. `sh_audio_split`
    pub name: String,
    pub description: String,
    /// `python3` or `bash`
    pub interpreter: String,
    /// Arguments placed before any caller-provided ones (the script path)
    pub base_args: Vec<String>,
    pub script_path: PathBuf,
    pub schema: CompiledSchema,
}

/// Metadata embedded in a script
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptMetadata {
    pub description: Option<String>,
    pub schema: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptKind {
    Shell,
    Python,
}

impl ScriptKind {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("sh") => Some(ScriptKind::Shell),
            Some("py") => Some(ScriptKind::Python),
            _ => None,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            ScriptKind::Shell => "sh",
            ScriptKind::Python => "py",
        }
    }

    fn interpreter(self) -> &'static str {
        match self {
            ScriptKind::Shell => "bash",
            ScriptKind::Python => "python3",
        }
    }
}

/// Discover every executable script under `root`, sorted by path.
///
/// A missing root yields no scripts. Files that are not executable are
/// skipped silently; files that cannot be read are skipped with a warning.
pub fn discover_scripts(root: &Path) -> Vec<ScriptDescriptor> {
    if !root.is_dir() {
        tracing::debug!(root = %root.display(), "scripts root not found, no scripts discovered");
        return Vec::new();
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    let mut paths: Vec<PathBuf> = walker
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("skipping unreadable entry during discovery: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| ScriptKind::from_path(entry.path()).is_some())
        .map(DirEntry::into_path)
        .collect();
    paths.sort();

    let mut scripts = Vec::new();
    for path in paths {
        if !is_executable(&path) {
            continue;
        }

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(path = %path.display(), "skipping unreadable script: {}", e);
                continue;
            }
        };

        if let Some(script) = describe_script(&path, &contents) {
            tracing::debug!(tool = %script.name, path = %path.display(), "discovered script");
            scripts.push(script);
        }
    }

    scripts
}

/// Build a descriptor for one script from its path and source text
pub fn describe_script(path: &Path, contents: &str) -> Option<ScriptDescriptor> {
    let kind = ScriptKind::from_path(path)?;
    let file_name = path.file_name()?.to_string_lossy().into_owned();
    let metadata = parse_metadata(contents).unwrap_or_default();

    let description = metadata
        .description
        .unwrap_or_else(|| format!("Execute Toolhub script {}", file_name));
    let schema = match metadata.schema {
        Some(document) => CompiledSchema::compile_or_default(document),
        None => CompiledSchema::default_args(),
    };

    Some(ScriptDescriptor {
        name: script_tool_name(&file_name),
        description,
        interpreter: kind.interpreter().to_string(),
        base_args: vec![path.to_string_lossy().into_owned()],
        script_path: path.to_path_buf(),
        schema,
    })
}

/// Derive a tool name from a script's file name.
///
/// `My Script.sh` becomes `sh_my_script` and `my-script.py` becomes `py_my_script`.
pub fn script_tool_name(file_name: &str) -> String {
    let (stem, extension) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => (stem, ext),
        _ => (file_name, ""),
    };
    let prefix = if extension == "py" {
        ScriptKind::Python.prefix()
    } else {
        ScriptKind::Shell.prefix()
    };
    let normalised = NON_ALPHANUMERIC.replace_all(&stem.to_lowercase(), "_").into_owned();
    format!("{}_{}", prefix, normalised)
}

/// Extract the embedded metadata block, if there is a well-formed one
pub fn parse_metadata(contents: &str) -> Option<ScriptMetadata> {
    let start = contents.find(METADATA_START)?;
    let end = contents.find(METADATA_END)?;
    if end <= start {
        return None;
    }

    let block: String = contents[start + METADATA_START.len()..end]
        .lines()
        .map(|line| COMMENT_PREFIX.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    let value: Value = serde_json::from_str(&block).ok()?;
    let object = value.as_object()?;
    Some(ScriptMetadata {
        description: object
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        schema: object.get("schema").filter(|s| !s.is_null()).cloned(),
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(unix)]
pub(crate) fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub(crate) fn is_executable(path: &Path) -> bool {
    path.is_file()
}
