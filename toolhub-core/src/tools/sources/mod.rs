//! Tool sources
//!
//! Each source turns one kind of declaration into tools: discovered scripts,
//! the CLI whitelist, manifest files, the hand-built tools and the
//! `run_script` meta-tool. The catalog consults them in that order.

mod builtin;
mod cli;
mod manifest;
mod meta;
mod script;

pub use builtin::{BuiltinKind, BuiltinSource, BuiltinTool};
pub use cli::{CLI_WHITELIST, CliEntry, CliSource, CliTool};
pub use manifest::{
    ManifestArgType, ManifestArgument, ManifestSource, ManifestTool, ToolManifest, load_manifest,
};
pub use meta::{MetaSource, RUN_SCRIPT, RunScriptTool};
pub use script::{ScriptSource, ScriptTool};

use std::fmt;
use std::path::PathBuf;

/// Resolves command names to executables
pub trait ExecutableProbe: Send + Sync + fmt::Debug {
    /// Path of the first executable named `command`, if any
    fn resolve(&self, command: &str) -> Option<PathBuf>;

    /// First candidate that resolves, with its path
    fn resolve_any<'a>(&self, candidates: &[&'a str]) -> Option<(&'a str, PathBuf)> {
        candidates
            .iter()
            .find_map(|candidate| self.resolve(candidate).map(|path| (*candidate, path)))
    }
}

/// Looks commands up on `PATH`
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchPathProbe;

impl ExecutableProbe for SearchPathProbe {
    fn resolve(&self, command: &str) -> Option<PathBuf> {
        which::which(command).ok()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::ExecutableProbe;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// Probe answering from a fixed table
    #[derive(Debug, Default)]
    pub struct FixedProbe {
        known: HashMap<String, PathBuf>,
    }

    impl FixedProbe {
        pub fn with(mut self, command: &str, path: impl Into<PathBuf>) -> Self {
            self.known.insert(command.to_string(), path.into());
            self
        }
    }

    impl ExecutableProbe for FixedProbe {
        fn resolve(&self, command: &str) -> Option<PathBuf> {
            self.known.get(command).cloned()
        }
    }
}
