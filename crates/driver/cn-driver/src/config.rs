//! `cinder.toml` configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up next to the input
pub const CONFIG_FILE: &str = "cinder.toml";

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileConfig {
    /// A second, conflicting inferred type is an error instead of
    /// replacing the first one
    pub strict_inference: bool,

    /// Run the IR verifier over every finished function
    pub verify_ir: bool,

    /// Keep at most this many diagnostics
    pub max_errors: Option<usize>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            strict_inference: true,
            verify_ir: true,
            max_errors: None,
        }
    }
}

impl CompileConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Configuration for `input`: `cinder.toml` in its directory, if any
    pub fn discover(input: &Path) -> Result<Self> {
        let candidate = input
            .parent()
            .map_or_else(|| Path::new(CONFIG_FILE).to_path_buf(), |dir| dir.join(CONFIG_FILE));
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "using discovered config");
            Self::from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}
