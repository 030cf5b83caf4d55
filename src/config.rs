//! Alignment configuration and its discovery on disk

use crate::error::{Result, TabalignError};
use crate::score::ScoreMode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory and its ancestors
pub const CONFIG_FILE_NAME: &str = "tabalign.json";

/// Policy for one alignment run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    /// Column holding the primary key in both snapshots
    pub primary_key: String,
    /// Candidate-generating columns, most authoritative first
    pub indexed_columns: Vec<String>,
    /// Columns whose change warrants an `update`; `None` means all columns
    pub managed_columns: Option<Vec<String>>,
    /// Columns holding primary keys of other records (parent, accepted)
    pub reference_columns: Vec<String>,
    /// Maximum number of records kept per property bucket
    pub bucket_limit: usize,
    /// Minimum score for a mutual best match to be accepted
    pub threshold: u64,
    /// Weight of the least authoritative indexed column
    pub base_weight: u64,
    pub score_mode: ScoreMode,
    /// How many examples of each diagnostic condition to show
    pub sample_size: usize,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            primary_key: "taxonID".to_string(),
            indexed_columns: ["EOLid", "source", "scientificName", "canonicalName"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            managed_columns: None,
            reference_columns: vec![
                "parentNameUsageID".to_string(),
                "acceptedNameUsageID".to_string(),
            ],
            bucket_limit: crate::DEFAULT_BUCKET_LIMIT,
            threshold: crate::DEFAULT_THRESHOLD,
            base_weight: crate::DEFAULT_BASE_WEIGHT,
            score_mode: ScoreMode::Presence,
            sample_size: crate::DEFAULT_SAMPLE_SIZE,
        }
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub primary_key: Option<String>,
    pub indexed_columns: Option<Vec<String>>,
    pub managed_columns: Option<Vec<String>>,
    pub threshold: Option<u64>,
    pub bucket_limit: Option<usize>,
    pub score_mode: Option<ScoreMode>,
}

impl AlignConfig {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            TabalignError::config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            TabalignError::config(format!("Invalid configuration {}: {}", path.display(), e))
        })?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Find a configuration file by walking up from `start_dir`
    pub fn discover(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir;

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }

            // A repository root bounds the search
            if current.join(".git").exists() {
                return None;
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Explicit file, else discovered file, else defaults; then overrides
    pub fn resolve(
        explicit: Option<&Path>,
        start_dir: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => {
                let current_dir = std::env::current_dir()?;
                let start = start_dir.unwrap_or(&current_dir);
                match Self::discover(start) {
                    Some(path) => Self::load(&path)?,
                    None => Self::default(),
                }
            }
        };
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(pk) = &overrides.primary_key {
            self.primary_key = pk.clone();
        }
        if let Some(indexed) = &overrides.indexed_columns {
            self.indexed_columns = indexed.clone();
        }
        if let Some(managed) = &overrides.managed_columns {
            self.managed_columns = Some(managed.clone());
        }
        if let Some(threshold) = overrides.threshold {
            self.threshold = threshold;
        }
        if let Some(limit) = overrides.bucket_limit {
            self.bucket_limit = limit;
        }
        if let Some(mode) = overrides.score_mode {
            self.score_mode = mode;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.primary_key.is_empty() {
            return Err(TabalignError::config("primary_key must not be empty"));
        }
        if self.bucket_limit == 0 {
            return Err(TabalignError::config("bucket_limit must be greater than 0"));
        }
        if self.base_weight == 0 {
            return Err(TabalignError::config("base_weight must be greater than 0"));
        }

        let mut seen = HashSet::new();
        for column in &self.indexed_columns {
            if !seen.insert(column.as_str()) {
                return Err(TabalignError::config(format!(
                    "indexed column '{}' listed twice",
                    column
                )));
            }
        }

        // A hit on every indexed column, base * (2^ranks - 1), must be representable
        let ranks = self.indexed_columns.len() as u32;
        if ranks > 0 {
            let total = 1u64
                .checked_shl(ranks)
                .filter(|&factor| factor != 0)
                .and_then(|factor| (factor - 1).checked_mul(self.base_weight));
            if total.is_none() {
                return Err(TabalignError::config(format!(
                    "{} indexed columns overflow the weight schedule",
                    ranks
                )));
            }
        }
        Ok(())
    }

    /// Whether a change in `column` is significant enough for an update
    pub fn is_managed(&self, column: &str) -> bool {
        match &self.managed_columns {
            Some(columns) => columns.iter().any(|c| c == column),
            None => true,
        }
    }

    /// Write the default configuration into `dir`
    pub fn write_default(dir: &Path, force: bool) -> Result<PathBuf> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() && !force {
            return Err(TabalignError::config(format!(
                "{} already exists; use --force to overwrite",
                path.display()
            )));
        }
        fs::create_dir_all(dir)?;
        fs::write(&path, serde_json::to_string_pretty(&Self::default())?)?;
        log::info!("Wrote default configuration to {}", path.display());
        Ok(path)
    }
}
