//! Security policy engine
//!
//! Stateless allowlist and denylist checks over `(tool name, command, arguments)`
//! plus the stateful [`RateLimiter`]. Every check fails closed: a failure aborts
//! the invocation before any process is spawned.

mod rate_limiter;

pub use rate_limiter::{Clock, RateLimiter, SystemClock};

use crate::config::SecurityConfig;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use url::Url;

/// Tool-name prefix that triggers the scanner guardrail
pub const SCANNER_PREFIX: &str = "nuclei";

const SCANNER_DENY_TAGS: &[&str] = &[
    "cve",
    "rce",
    "dos",
    "exploit",
    "malware",
    "bruteforce",
    "takeover",
];

const SCANNER_ALLOWED_SEVERITIES: &[&str] = &["info", "low"];

const SCANNER_BLOCKED_SEVERITIES: &[&str] = &["high", "critical"];

static DESTRUCTIVE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)rm\s+-rf",
        r"(?i)mkfs",
        r"(?i)shutdown",
        r"(?i)reboot",
        r":\(\)\s*\{\s*: \| : & \};\s*:",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("destructive pattern regex"))
    .collect()
});

/// A policy violation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecurityError {
    #[error("Tool \"{tool}\" is rate limited. Allowance resets in {retry_after_secs} seconds.")]
    RateLimited { tool: String, retry_after_secs: u64 },

    #[error("Path {path} is not inside the configured allowlist: {allowlist}")]
    PathNotAllowed { path: String, allowlist: String },

    #[error("Host {host} is not allowlisted. Allowed hosts: {allowlist}")]
    HostNotAllowed { host: String, allowlist: String },

    #[error("Command blocked by safe mode (matched pattern {pattern})")]
    UnsafeCommand { pattern: String },

    #[error("Scanner arguments reference denylisted tag '{tag}'")]
    ScannerDenylist { tag: String },

    #[error("{0}")]
    ScannerSeverity(String),
}

impl SecurityError {
    /// Stable error code reported to callers
    pub fn code(&self) -> &'static str {
        match self {
            SecurityError::RateLimited { .. } => "rate_limit",
            SecurityError::PathNotAllowed { .. } => "path_not_allowed",
            SecurityError::HostNotAllowed { .. } => "host_not_allowed",
            SecurityError::UnsafeCommand { .. } => "unsafe_command",
            SecurityError::ScannerDenylist { .. } => "scanner_denylist",
            SecurityError::ScannerSeverity(_) => "scanner_severity",
        }
    }
}

/// Argument screening rules derived from a [`SecurityConfig`]
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    safe_mode: bool,
    allowed_paths: Vec<PathBuf>,
    allowed_hosts: Vec<String>,
    exempt_root: Option<PathBuf>,
}

impl SecurityPolicy {
    /// Build a policy; arguments under `scripts_root` skip the path and host checks.
    pub fn new(config: &SecurityConfig, scripts_root: Option<&Path>) -> Self {
        Self {
            safe_mode: config.safe_mode,
            allowed_paths: config
                .allowlist_paths
                .iter()
                .map(|p| normalize_path(Path::new(p)))
                .collect(),
            allowed_hosts: config
                .allowlist_hosts
                .iter()
                .map(|h| h.trim().to_lowercase())
                .collect(),
            exempt_root: scripts_root.map(normalize_path),
        }
    }

    pub fn safe_mode(&self) -> bool {
        self.safe_mode
    }

    /// Run every safe-mode check. A no-op when safe mode is disabled.
    pub fn enforce(&self, tool_name: &str, command: &str, args: &[String]) -> Result<(), SecurityError> {
        if !self.safe_mode {
            return Ok(());
        }

        self.check_destructive(command, args)?;

        for arg in args {
            if self.is_exempt(arg) {
                continue;
            }
            self.screen_argument(arg)?;
        }

        if tool_name.starts_with(SCANNER_PREFIX) {
            check_scanner_arguments(args)?;
        }

        Ok(())
    }

    /// Apply the path check to absolute paths and the host check to URLs
    pub fn screen_argument(&self, arg: &str) -> Result<(), SecurityError> {
        if arg.starts_with('/') {
            self.ensure_path_allowed(arg)?;
        }
        if arg.contains("://") {
            self.ensure_host_allowed(arg)?;
        }
        Ok(())
    }

    /// Reject the command if it matches a destructive pattern
    pub fn check_destructive(&self, command: &str, args: &[String]) -> Result<(), SecurityError> {
        let joined = std::iter::once(command)
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        match DESTRUCTIVE_PATTERNS.iter().find(|p| p.is_match(&joined)) {
            Some(pattern) => Err(SecurityError::UnsafeCommand {
                pattern: pattern.as_str().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Require an absolute path to live under an allowlisted prefix.
    ///
    /// Relative paths pass unchecked.
    pub fn ensure_path_allowed(&self, input: &str) -> Result<(), SecurityError> {
        let candidate = Path::new(input);
        if input.is_empty() || !candidate.is_absolute() {
            return Ok(());
        }

        let resolved = normalize_path(candidate);
        if self.allowed_paths.iter().any(|prefix| resolved.starts_with(prefix)) {
            return Ok(());
        }

        Err(SecurityError::PathNotAllowed {
            path: resolved.display().to_string(),
            allowlist: self
                .allowed_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Require a URL's hostname to be allowlisted.
    ///
    /// A missing scheme defaults to `http`. Input that does not parse as a URL
    /// is not a network argument and passes.
    pub fn ensure_host_allowed(&self, input: &str) -> Result<(), SecurityError> {
        let candidate = if input.contains("://") {
            input.to_string()
        } else {
            format!("http://{}", input)
        };

        let Ok(url) = Url::parse(&candidate) else {
            return Ok(());
        };

        let host = url
            .host_str()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_lowercase())
            .unwrap_or_default();

        if self.allowed_hosts.iter().any(|allowed| *allowed == host) {
            return Ok(());
        }

        Err(SecurityError::HostNotAllowed {
            host,
            allowlist: self.allowed_hosts.join(", "),
        })
    }

    fn is_exempt(&self, arg: &str) -> bool {
        match &self.exempt_root {
            Some(root) if arg.starts_with('/') => normalize_path(Path::new(arg)).starts_with(root),
            _ => false,
        }
    }
}

/// Guardrail for vulnerability scanners: no risky template tags, and an
/// explicit severity restricted to info/low.
pub fn check_scanner_arguments(args: &[String]) -> Result<(), SecurityError> {
    for arg in args {
        let lower = arg.to_lowercase();
        if let Some(tag) = SCANNER_DENY_TAGS.iter().find(|tag| lower.contains(*tag)) {
            return Err(SecurityError::ScannerDenylist {
                tag: (*tag).to_string(),
            });
        }
    }

    let mut severities = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if !arg.starts_with('-') {
            continue;
        }
        let flag = arg.trim_start_matches('-');
        if flag == "severity" {
            severities.push(iter.next().cloned().unwrap_or_default());
        } else if let Some(value) = flag.strip_prefix("severity=") {
            severities.push(value.to_string());
        }
    }

    if severities.is_empty() {
        return Err(SecurityError::ScannerSeverity(
            "Scanner invocations must pass an explicit -severity of info or low".to_string(),
        ));
    }

    for severity in &severities {
        let levels: Vec<String> = severity
            .split(',')
            .map(|level| level.trim().to_lowercase())
            .filter(|level| !level.is_empty())
            .collect();

        if levels.is_empty() {
            return Err(SecurityError::ScannerSeverity(
                "Scanner -severity flag has no value".to_string(),
            ));
        }

        if let Some(level) = levels
            .iter()
            .find(|level| !SCANNER_ALLOWED_SEVERITIES.contains(&level.as_str()))
        {
            return Err(SecurityError::ScannerSeverity(format!(
                "Scanner severity '{}' is not permitted; use info or low",
                level
            )));
        }
    }

    // short flags such as `-s high` reach the scanner too
    if let Some(level) = args.iter().find_map(|arg| {
        let lower = arg.to_lowercase();
        SCANNER_BLOCKED_SEVERITIES
            .iter()
            .find(|level| lower.contains(*level))
    }) {
        return Err(SecurityError::ScannerSeverity(format!(
            "Scanner severity '{}' is disabled in safe mode",
            level
        )));
    }

    Ok(())
}

/// Lexically resolve `.` and `..` without touching the filesystem
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}
