//! Configuration types for the Toolhub server
//!
//! Configuration is layered with figment: built-in defaults, then an optional
//! `toolhub.toml`, then an optional file named by `TOOLHUB_CONFIG_PATH`, then the
//! environment variables understood by the deployed container image.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variables and the configuration keys they populate
const ENV_KEYS: &[(&str, &str)] = &[
    ("SAFE_MODE", "security.safe_mode"),
    ("ALLOWLIST_PATHS", "security.allowlist_paths"),
    ("ALLOWLIST_HOSTS", "security.allowlist_hosts"),
    ("MCP_COMMAND_TIMEOUT_MS", "security.command_timeout_ms"),
    ("MCP_MAX_OUTPUT", "security.max_output_length"),
    ("MCP_RATE_LIMIT_COUNT", "security.rate_limit_count"),
    ("MCP_RATE_LIMIT_WINDOW_MS", "security.rate_limit_window_ms"),
    ("MCP_SCRIPTS_ROOT", "scripts_root"),
    ("MCP_TOOLS_DIR", "tools_dir"),
    ("NUCLEI_TEMPLATES", "scanner_templates"),
    ("MCP_SERVER_NAME", "server.name"),
    ("MCP_SERVER_VERSION", "server.version"),
];

/// Main configuration for the Toolhub server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolhubConfig {
    /// Identity advertised during protocol initialization
    #[serde(default)]
    pub server: ServerSettings,

    /// Security envelope shared by every invocation
    #[serde(default)]
    pub security: SecurityConfig,

    /// Root directory walked for `.sh` and `.py` scripts
    #[serde(default = "default_scripts_root")]
    pub scripts_root: PathBuf,

    /// Directory holding `manifest.json` tool declarations
    #[serde(default = "default_tools_dir")]
    pub tools_dir: PathBuf,

    /// Extra template directory handed to the restricted scanner tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanner_templates: Option<PathBuf>,
}

impl Default for ToolhubConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            security: SecurityConfig::default(),
            scripts_root: default_scripts_root(),
            tools_dir: default_tools_dir(),
            scanner_templates: None,
        }
    }
}

/// Server identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub name: String,
    pub version: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            name: "toolhub-mcp".to_string(),
            version: "0.1.1".to_string(),
        }
    }
}

/// Security envelope applied to every tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Enables destructive-pattern, path, host and scanner guards
    pub safe_mode: bool,

    /// Absolute path prefixes that absolute arguments must live under
    #[serde(deserialize_with = "csv_list::deserialize")]
    pub allowlist_paths: Vec<String>,

    /// Hostnames that URL-shaped arguments may target
    #[serde(deserialize_with = "csv_list::deserialize")]
    pub allowlist_hosts: Vec<String>,

    /// Default wall-clock limit per invocation, in milliseconds
    pub command_timeout_ms: u64,

    /// Per-tool timeout overrides, in milliseconds
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tool_timeouts: HashMap<String, u64>,

    /// Characters of output kept before truncation
    pub max_output_length: usize,

    /// Invocations allowed per tool per window; zero or less disables limiting
    pub rate_limit_count: i64,

    /// Sliding window length, in milliseconds
    pub rate_limit_window_ms: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            safe_mode: true,
            allowlist_paths: vec!["/data".to_string(), "/tmp".to_string()],
            allowlist_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
            command_timeout_ms: 120_000,
            tool_timeouts: HashMap::new(),
            max_output_length: 20_000,
            rate_limit_count: 5,
            rate_limit_window_ms: 10_000,
        }
    }
}

impl SecurityConfig {
    /// Timeout for a tool, honouring per-tool overrides
    pub fn timeout_for(&self, tool_name: &str) -> Duration {
        let millis = self
            .tool_timeouts
            .get(tool_name)
            .copied()
            .unwrap_or(self.command_timeout_ms);
        Duration::from_millis(millis)
    }

    /// Sliding window used by the rate limiter
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }
}

fn default_scripts_root() -> PathBuf {
    PathBuf::from("/app/scripts")
}

fn default_tools_dir() -> PathBuf {
    PathBuf::from("/app/mcp_tools")
}

impl ToolhubConfig {
    /// Load configuration from defaults, TOML files and the environment.
    ///
    /// Values that are present but fail to parse are reported as errors rather
    /// than replaced by their defaults.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_with(std::env::var("TOOLHUB_CONFIG_PATH").ok().map(PathBuf::from))
    }

    /// Load configuration, merging an explicit TOML file before the environment.
    pub fn load_with(config_path: Option<PathBuf>) -> crate::error::Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(ToolhubConfig::default()))
            .merge(Toml::file("toolhub.toml"));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::raw().filter_map(|key| {
            ENV_KEYS
                .iter()
                .find(|(env, _)| key.as_str().eq_ignore_ascii_case(env))
                .map(|(_, field)| (*field).into())
        }));

        let config: ToolhubConfig = figment.extract().map_err(|e| {
            crate::error::ToolhubError::Configuration(format!(
                "Failed to load configuration: {}",
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, ignoring the environment.
    pub fn from_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let config: ToolhubConfig = Figment::from(Serialized::defaults(ToolhubConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .extract()
            .map_err(|e| {
                crate::error::ToolhubError::Configuration(format!(
                    "Failed to load configuration file: {}",
                    e
                ))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> crate::error::Result<()> {
        let security = &self.security;

        if security.command_timeout_ms == 0 {
            return Err(crate::error::ToolhubError::Configuration(
                "command timeout must be greater than zero".to_string(),
            ));
        }

        if let Some((tool, _)) = security.tool_timeouts.iter().find(|(_, ms)| **ms == 0) {
            return Err(crate::error::ToolhubError::Configuration(format!(
                "timeout override for '{}' must be greater than zero",
                tool
            )));
        }

        if security.max_output_length == 0 {
            return Err(crate::error::ToolhubError::Configuration(
                "max output length must be greater than zero".to_string(),
            ));
        }

        if security.rate_limit_window_ms == 0 {
            return Err(crate::error::ToolhubError::Configuration(
                "rate limit window must be greater than zero".to_string(),
            ));
        }

        if let Some(path) = security
            .allowlist_paths
            .iter()
            .find(|p| !Path::new(p).is_absolute())
        {
            return Err(crate::error::ToolhubError::Configuration(format!(
                "allowlist path '{}' must be absolute",
                path
            )));
        }

        Ok(())
    }
}

// Accepts either a comma-separated string (environment) or a list (TOML)
mod csv_list {
    use serde::Deserializer;
    use serde::de::{self, SeqAccess, Visitor};
    use std::fmt;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(CsvVisitor)
    }

    struct CsvVisitor;

    impl<'de> Visitor<'de> for CsvVisitor {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a comma-separated string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(split(value))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(vec![value.to_string()])
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(vec![value.to_string()])
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut entries = Vec::new();
            while let Some(entry) = seq.next_element::<String>()? {
                entries.extend(split(&entry));
            }
            Ok(entries)
        }
    }

    fn split(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    }
}
