//! Command executor
//!
//! Runs a resolved command under the security policy with a hard wall-clock
//! timeout. Standard output and standard error are merged in arrival order and
//! truncated to the configured maximum.

use crate::config::SecurityConfig;
use crate::security::SecurityPolicy;
use crate::tools::{ExecutionResult, ToolError};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

/// Marker appended to truncated output
pub const TRUNCATION_MARKER: &str = "\n[output truncated]";

const READ_CHUNK: usize = 8 * 1024;

/// Per-invocation overrides
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Working directory; inherited when unset
    pub cwd: Option<PathBuf>,
    /// Extra environment variables layered over the inherited environment
    pub env: Vec<(String, String)>,
    /// Timeout; falls back to the configured per-tool or default timeout
    pub timeout: Option<Duration>,
}

impl ExecOptions {
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Spawns tool processes inside the security envelope
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    config: SecurityConfig,
    policy: SecurityPolicy,
}

impl CommandExecutor {
    /// Create an executor; arguments under `scripts_root` are exempt from
    /// path and host screening.
    pub fn new(config: SecurityConfig, scripts_root: Option<&Path>) -> Self {
        let policy = SecurityPolicy::new(&config, scripts_root);
        Self { config, policy }
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Execute with inherited working directory and environment
    pub async fn execute(
        &self,
        tool_name: &str,
        command: &str,
        args: &[String],
    ) -> Result<ExecutionResult, ToolError> {
        self.execute_with(tool_name, command, args, ExecOptions::default())
            .await
    }

    /// Execute with explicit options.
    ///
    /// Policy violations are returned before anything is spawned. A non-zero
    /// exit code is a normal result; a timeout kills the process and returns a
    /// `timeout` error.
    pub async fn execute_with(
        &self,
        tool_name: &str,
        command: &str,
        args: &[String],
        options: ExecOptions,
    ) -> Result<ExecutionResult, ToolError> {
        self.policy.enforce(tool_name, command, args)?;

        let timeout = options
            .timeout
            .unwrap_or_else(|| self.config.timeout_for(tool_name));

        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &options.env {
            cmd.env(key, value);
        }

        tracing::debug!(tool = tool_name, command, ?args, ?timeout, "spawning command");
        let mut child = cmd.spawn().map_err(|e| ToolError::spawn(command, &e))?;

        // Enough bytes to hold `max_output_length` characters of any width
        let capture_limit = self
            .config
            .max_output_length
            .saturating_mul(4)
            .saturating_add(4);

        let outcome =
            tokio::time::timeout(timeout, collect_output(&mut child, capture_limit)).await;

        let (captured, status) = match outcome {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return Err(ToolError::internal(format!(
                    "Failed to collect output from {}: {}",
                    command, e
                )));
            }
            Err(_) => {
                tracing::warn!(tool = tool_name, command, ?timeout, "command timed out, killing");
                let _ = child.kill().await;
                return Err(ToolError::timeout(timeout));
            }
        };

        let text = String::from_utf8_lossy(&captured);
        let (output, truncated) = truncate_output(&text, self.config.max_output_length);
        let exit_code = status.code().unwrap_or(-1);

        tracing::debug!(tool = tool_name, exit_code, truncated, "command finished");

        if status.success() {
            return Ok(ExecutionResult {
                exit_code,
                output,
                truncated,
            });
        }

        let note = match status.code() {
            Some(code) => format!("Command exited with code {}.", code),
            None => format!("Command terminated by {}.", describe_signal(&status)),
        };
        Ok(ExecutionResult {
            exit_code,
            output: format!("{}\n{}", note, output).trim().to_string(),
            truncated,
        })
    }
}

/// Cut `text` to `max` characters, appending [`TRUNCATION_MARKER`] if anything was removed
pub fn truncate_output(text: &str, max: usize) -> (String, bool) {
    match text.char_indices().nth(max) {
        Some((cut, _)) => (format!("{}{}", &text[..cut], TRUNCATION_MARKER), true),
        None => (text.to_string(), false),
    }
}

/// Drain both pipes into one buffer, then reap the child.
///
/// Bytes beyond `limit` are read and discarded so the child never blocks on a
/// full pipe.
async fn collect_output(child: &mut Child, limit: usize) -> std::io::Result<(Vec<u8>, ExitStatus)> {
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut captured = Vec::new();
    let mut out_chunk = vec![0u8; READ_CHUNK];
    let mut err_chunk = vec![0u8; READ_CHUNK];

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            read = read_pipe(&mut stdout, &mut out_chunk), if stdout.is_some() => {
                match read? {
                    0 => stdout = None,
                    n => append_bounded(&mut captured, &out_chunk[..n], limit),
                }
            }
            read = read_pipe(&mut stderr, &mut err_chunk), if stderr.is_some() => {
                match read? {
                    0 => stderr = None,
                    n => append_bounded(&mut captured, &err_chunk[..n], limit),
                }
            }
        }
    }

    let status = child.wait().await?;
    Ok((captured, status))
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: &mut Option<R>, chunk: &mut [u8]) -> std::io::Result<usize> {
    match pipe {
        Some(reader) => reader.read(chunk).await,
        None => std::future::pending().await,
    }
}

fn append_bounded(buffer: &mut Vec<u8>, bytes: &[u8], limit: usize) {
    let room = limit.saturating_sub(buffer.len());
    buffer.extend_from_slice(&bytes[..bytes.len().min(room)]);
}

#[cfg(unix)]
fn describe_signal(status: &ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => format!("signal {}", signal),
        None => "an unknown signal".to_string(),
    }
}

#[cfg(not(unix))]
fn describe_signal(_status: &ExitStatus) -> String {
    "an unknown signal".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolErrorKind;
    use std::time::Instant;

    fn executor(config: SecurityConfig) -> CommandExecutor {
        CommandExecutor::new(config, None)
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_truncate_output() {
        let (out, truncated) = truncate_output("hello", 5);
        assert_eq!(out, "hello");
        assert!(!truncated);

        let (out, truncated) = truncate_output("hello world", 5);
        assert_eq!(out, format!("hello{}", TRUNCATION_MARKER));
        assert!(truncated);

        // counts characters, not bytes
        let (out, truncated) = truncate_output("ééééé", 3);
        assert_eq!(out, format!("ééé{}", TRUNCATION_MARKER));
        assert!(truncated);
    }

    #[tokio::test]
    async fn test_successful_command() {
        let exec = executor(SecurityConfig::default());
        let result = exec
            .execute("sh_echo", "sh", &args(&["-c", "printf hello"]))
            .await
            .unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output, "hello");
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_merges_stdout_and_stderr() {
        let exec = executor(SecurityConfig::default());
        let result = exec
            .execute("sh_mixed", "sh", &args(&["-c", "echo out; sleep 0.1; echo err 1>&2"]))
            .await
            .unwrap();
        assert_eq!(result.output, "out\nerr\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_a_result() {
        let exec = executor(SecurityConfig::default());
        let result = exec
            .execute("sh_fail", "sh", &args(&["-c", "echo broken; exit 3"]))
            .await
            .unwrap();
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.output, "Command exited with code 3.\nbroken");
    }

    #[tokio::test]
    async fn test_output_is_truncated() {
        let config = SecurityConfig {
            max_output_length: 10,
            ..SecurityConfig::default()
        };
        let exec = executor(config);
        let result = exec
            .execute("sh_loud", "sh", &args(&["-c", "head -c 200000 /dev/zero | tr '\\0' 'a'"]))
            .await
            .unwrap();
        assert!(result.truncated);
        assert_eq!(result.output, format!("aaaaaaaaaa{}", TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let exec = executor(SecurityConfig::default());
        let started = Instant::now();
        let err = exec
            .execute_with(
                "sh_sleep",
                "sh",
                &args(&["-c", "sleep 30"]),
                ExecOptions::default().with_timeout(Duration::from_millis(200)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_per_tool_timeout_override() {
        let mut config = SecurityConfig::default();
        config.tool_timeouts.insert("sh_sleep".to_string(), 100);
        let exec = executor(config);
        let err = exec
            .execute("sh_sleep", "sh", &args(&["-c", "sleep 30"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_policy_blocks_before_spawn() {
        let exec = executor(SecurityConfig::default());
        let err = exec
            .execute("sh_x", "sh", &args(&["-c", "touch /tmp/never; rm -rf /tmp/never"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::UnsafeCommand);

        let err = exec
            .execute("cat", "cat", &args(&["/etc/passwd"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::PathNotAllowed);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let exec = executor(SecurityConfig::default());
        let err = exec
            .execute("missing", "definitely-not-a-real-binary-4f2a", &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Spawn);
    }

    #[tokio::test]
    async fn test_options_cwd_and_env() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = SecurityConfig {
            safe_mode: false,
            ..SecurityConfig::default()
        };
        let exec = executor(config);
        let result = exec
            .execute_with(
                "sh_env",
                "sh",
                &args(&["-c", "printf \"$GREETING\"; ls"]),
                ExecOptions::default()
                    .with_cwd(dir.path())
                    .with_env("GREETING", "hi "),
            )
            .await
            .unwrap();
        assert_eq!(result.output, "hi ");
    }
}
