//! State persistence for the .git/review-rebase/ directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use grr_git::Oid;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};

/// Manages the .git/review-rebase/ directory state.
#[derive(Debug)]
pub struct State {
    /// Path to the .git/review-rebase/ directory.
    state_dir: PathBuf,
}

impl State {
    /// File names within .git/review-rebase/
    const CONFIG_FILE: &'static str = "config.toml";
    const REVIEWED_FILE: &'static str = "reviewed.json";

    /// Create a new State instance for the given git directory.
    ///
    /// # Errors
    /// Returns error if the path is not an existing directory.
    pub fn new(git_dir: impl AsRef<Path>) -> Result<Self> {
        let git_dir = git_dir.as_ref();
        if !git_dir.is_dir() {
            return Err(Error::NotARepository);
        }

        Ok(Self {
            state_dir: git_dir.join("review-rebase"),
        })
    }

    /// Get the path to the state directory.
    #[must_use]
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.state_dir)?;
        Ok(())
    }

    // === Config operations ===

    /// Path of the config file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.state_dir.join(Self::CONFIG_FILE)
    }

    /// Load the config, falling back to defaults when none was written.
    ///
    /// # Errors
    /// Returns error if the file exists but can't be parsed.
    pub fn load_config(&self) -> Result<Config> {
        Config::load(self.config_path())
    }

    /// Save the config to disk.
    ///
    /// # Errors
    /// Returns error if serialization or write fails.
    pub fn save_config(&self, config: &Config) -> Result<()> {
        self.ensure_dir()?;
        config.save(self.config_path())
    }

    // === Review ledger operations ===

    fn reviewed_path(&self) -> PathBuf {
        self.state_dir.join(Self::REVIEWED_FILE)
    }

    /// Load the review ledger. A missing file is an empty ledger.
    ///
    /// # Errors
    /// Returns error if the file can't be read or parsed.
    pub fn load_ledger(&self) -> Result<ReviewLedger> {
        let path = self.reviewed_path();
        if !path.exists() {
            return Ok(ReviewLedger::default());
        }

        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| Error::StateParseError {
            file: path,
            message: e.to_string(),
        })
    }

    /// Save the review ledger to disk.
    ///
    /// # Errors
    /// Returns error if serialization or write fails.
    pub fn save_ledger(&self, ledger: &ReviewLedger) -> Result<()> {
        self.ensure_dir()?;
        let content = serde_json::to_string_pretty(ledger)?;
        fs::write(self.reviewed_path(), content)?;
        Ok(())
    }
}

/// Pairs a human marked as reviewed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewLedger {
    #[serde(default)]
    pub reviewed: BTreeMap<String, ReviewEntry>,
}

/// One reviewed pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEntry {
    /// When the pair was marked.
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewLedger {
    /// Key for a `(left, right)` pair; an absent side is written as `-`.
    #[must_use]
    pub fn key(left: Option<Oid>, right: Option<Oid>) -> String {
        let side = |oid: Option<Oid>| oid.map_or_else(|| "-".to_owned(), |o| o.to_string());
        format!("{}:{}", side(left), side(right))
    }

    /// Record a pair as reviewed. Returns false if it already was.
    pub fn mark(&mut self, left: Option<Oid>, right: Option<Oid>) -> bool {
        let key = Self::key(left, right);
        if self.reviewed.contains_key(&key) {
            return false;
        }
        self.reviewed.insert(
            key,
            ReviewEntry {
                reviewed_at: Utc::now(),
            },
        );
        true
    }

    /// Forget a pair. Returns false if it was not recorded.
    pub fn unmark(&mut self, left: Option<Oid>, right: Option<Oid>) -> bool {
        self.reviewed.remove(&Self::key(left, right)).is_some()
    }

    /// Check whether a pair was reviewed.
    #[must_use]
    pub fn is_reviewed(&self, left: Option<Oid>, right: Option<Oid>) -> bool {
        self.reviewed.contains_key(&Self::key(left, right))
    }
}
