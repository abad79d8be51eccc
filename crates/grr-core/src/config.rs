//! Configuration management for git-review-rebase.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration loaded from .git/review-rebase/config.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Side-by-side diff settings.
    #[serde(default)]
    pub diff: DiffConfig,

    /// Blame loading settings.
    #[serde(default)]
    pub blame: BlameConfig,
}

impl Config {
    /// Load config from a TOML file.
    ///
    /// # Errors
    /// Returns error if file can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to a TOML file.
    ///
    /// # Errors
    /// Returns error if serialization or write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::other(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Read and write patch ids from the ref cache.
    #[serde(default = "default_true")]
    pub cache: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { cache: true }
    }
}

/// Side-by-side diff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Total row width; the terminal width is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,

    /// Widen hunks to whole functions (`git show -W`).
    #[serde(default = "default_true")]
    pub function_context: bool,

    /// Prefix lines with the commit that last touched them.
    #[serde(default)]
    pub blame: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            width: None,
            function_context: true,
            blame: false,
        }
    }
}

/// Blame loading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlameConfig {
    /// Yield to the scheduler after this many parsed lines.
    #[serde(default = "default_yield_every")]
    pub yield_every: usize,
}

impl Default for BlameConfig {
    fn default() -> Self {
        Self {
            yield_every: default_yield_every(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_yield_every() -> usize {
    100
}
