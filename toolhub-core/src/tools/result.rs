//! Execution results and the tool error model
//!
//! A tool invocation either produces an [`ExecutionResult`] (the process ran,
//! whatever its exit code) or a [`ToolError`] (the invocation was refused or
//! could not complete). Non-zero exit codes are results, not errors.

use crate::security::SecurityError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Outcome of a subprocess that was allowed to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Process exit code; 0 is success, -1 when terminated by a signal
    pub exit_code: i32,

    /// Combined stdout and stderr
    pub output: String,

    /// Whether `output` was cut to the configured maximum
    pub truncated: bool,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Structured tool error with taxonomy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolError {
    /// Error kind
    pub kind: ToolErrorKind,

    /// Human-readable error message
    pub message: String,

    /// Additional context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Suggested retry delay (for retryable errors)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "option_duration_millis"
    )]
    pub retry_after: Option<Duration>,
}

impl ToolError {
    /// Create a new tool error
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
            retry_after: None,
        }
    }

    /// Add context
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Add retry delay
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    /// Stable code of this error's kind
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Create a validation error
    pub fn validation(errors: Vec<ValidationError>) -> Self {
        Self {
            kind: ToolErrorKind::SchemaValidation,
            message: format!(
                "Validation failed: {}",
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
            context: Some(serde_json::to_value(&errors).unwrap_or_default()),
            retry_after: None,
        }
    }

    /// Create a timeout error
    pub fn timeout(duration: Duration) -> Self {
        Self::new(
            ToolErrorKind::Timeout,
            format!(
                "Command timed out after {} ms and was terminated",
                duration.as_millis()
            ),
        )
    }

    /// Create an unknown script error
    pub fn unknown_script(name: &str) -> Self {
        Self::new(
            ToolErrorKind::UnknownScript,
            format!("Script {} is not registered.", name),
        )
    }

    /// Create a spawn failure error
    pub fn spawn(command: &str, error: &std::io::Error) -> Self {
        Self::new(
            ToolErrorKind::Spawn,
            format!("Failed to start {}: {}", command, error),
        )
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal, message)
    }
}

impl From<SecurityError> for ToolError {
    fn from(error: SecurityError) -> Self {
        let kind = match &error {
            SecurityError::RateLimited { .. } => ToolErrorKind::RateLimit,
            SecurityError::PathNotAllowed { .. } => ToolErrorKind::PathNotAllowed,
            SecurityError::HostNotAllowed { .. } => ToolErrorKind::HostNotAllowed,
            SecurityError::UnsafeCommand { .. } => ToolErrorKind::UnsafeCommand,
            SecurityError::ScannerDenylist { .. } => ToolErrorKind::ScannerDenylist,
            SecurityError::ScannerSeverity(_) => ToolErrorKind::ScannerSeverity,
        };
        let tool_error = ToolError::new(kind, error.to_string());
        match error {
            SecurityError::RateLimited {
                retry_after_secs, ..
            } => tool_error.with_retry_after(Duration::from_secs(retry_after_secs)),
            _ => tool_error,
        }
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for ToolError {}

/// Error kind taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Too many invocations in the current window (retryable after delay)
    RateLimit,

    /// Absolute path outside the allowlist
    PathNotAllowed,

    /// URL host outside the allowlist
    HostNotAllowed,

    /// Destructive command pattern in safe mode
    UnsafeCommand,

    /// Scanner invoked with a denylisted template tag
    ScannerDenylist,

    /// Scanner severity missing or too broad
    ScannerSeverity,

    /// Meta-tool asked for a script that was not discovered
    UnknownScript,

    /// Input failed the tool's schema
    SchemaValidation,

    /// Process exceeded its wall-clock limit and was killed (retryable)
    Timeout,

    /// Process could not be started
    Spawn,

    /// Anything unexpected
    Internal,
}

impl ToolErrorKind {
    /// Stable snake_case code
    pub fn code(&self) -> &'static str {
        match self {
            ToolErrorKind::RateLimit => "rate_limit",
            ToolErrorKind::PathNotAllowed => "path_not_allowed",
            ToolErrorKind::HostNotAllowed => "host_not_allowed",
            ToolErrorKind::UnsafeCommand => "unsafe_command",
            ToolErrorKind::ScannerDenylist => "scanner_denylist",
            ToolErrorKind::ScannerSeverity => "scanner_severity",
            ToolErrorKind::UnknownScript => "unknown_script",
            ToolErrorKind::SchemaValidation => "schema_validation",
            ToolErrorKind::Timeout => "timeout",
            ToolErrorKind::Spawn => "spawn",
            ToolErrorKind::Internal => "internal",
        }
    }

    /// Check if this error kind is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, ToolErrorKind::Timeout | ToolErrorKind::RateLimit)
    }

    /// Whether the security policy refused the invocation
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            ToolErrorKind::PathNotAllowed
                | ToolErrorKind::HostNotAllowed
                | ToolErrorKind::UnsafeCommand
                | ToolErrorKind::ScannerDenylist
                | ToolErrorKind::ScannerSeverity
        )
    }
}

/// Validation error for a specific field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Field path (e.g., "args[2]")
    pub field: String,

    /// Error message
    pub message: String,

    /// Error code
    pub code: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: None,
        }
    }

    /// Add an error code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

mod option_duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<u64> = Option::deserialize(deserializer)?;
        Ok(opt.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod result_tests {
    use super::*;

    #[test]
    fn test_security_error_conversion() {
        let error: ToolError = SecurityError::RateLimited {
            tool: "jq".to_string(),
            retry_after_secs: 3,
        }
        .into();

        assert_eq!(error.kind, ToolErrorKind::RateLimit);
        assert_eq!(error.retry_after, Some(Duration::from_secs(3)));
        assert_eq!(
            error.to_string(),
            "rate_limit: Tool \"jq\" is rate limited. Allowance resets in 3 seconds."
        );

        let error: ToolError = SecurityError::ScannerSeverity("missing".to_string()).into();
        assert_eq!(error.code(), "scanner_severity");
        assert!(error.kind.is_policy_violation());
    }

    #[test]
    fn test_error_kind_retryability() {
        assert!(ToolErrorKind::Timeout.is_retryable());
        assert!(ToolErrorKind::RateLimit.is_retryable());
        assert!(!ToolErrorKind::UnsafeCommand.is_retryable());
        assert!(!ToolErrorKind::SchemaValidation.is_retryable());
    }

    #[test]
    fn test_kind_serializes_as_code() {
        for kind in [
            ToolErrorKind::RateLimit,
            ToolErrorKind::ScannerDenylist,
            ToolErrorKind::SchemaValidation,
            ToolErrorKind::UnknownScript,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.code());
        }
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationError::new("path", "required field is missing"),
            ValidationError::new("args[0]", "expected string, received number"),
        ];
        let error = ToolError::validation(errors);

        assert_eq!(error.kind, ToolErrorKind::SchemaValidation);
        assert!(error.message.contains("path: required field is missing"));
        assert!(error.context.is_some());
    }
}
