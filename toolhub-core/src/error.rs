//! Error types for Toolhub startup and transport operations
//!
//! Failures raised while a tool is being invoked use [`crate::tools::ToolError`]
//! instead; those are reported back to the caller rather than aborting the server.

/// Result type for Toolhub operations
pub type Result<T> = std::result::Result<T, ToolhubError>;

/// Error types for the Toolhub server
#[derive(Debug, thiserror::Error)]
pub enum ToolhubError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Script discovery failed
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Manifest could not be loaded
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Protocol transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for ToolhubError {
    fn from(s: String) -> Self {
        ToolhubError::Other(s)
    }
}

impl From<&str> for ToolhubError {
    fn from(s: &str) -> Self {
        ToolhubError::Other(s.to_string())
    }
}
