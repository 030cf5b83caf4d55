//! Command-line interface for tabalign

use crate::config::ConfigOverrides;
use crate::score::ScoreMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tabalign")]
#[command(about = "Align two checklist snapshots and emit or apply an add/update/remove delta")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to tabalign.json in this or a parent directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors; no progress or summaries
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

/// Flags that take precedence over the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct OverrideArgs {
    /// Primary key column
    #[arg(long, global = true)]
    pub pk: Option<String>,

    /// Indexed columns, most authoritative first (comma separated)
    #[arg(long, global = true, value_delimiter = ',')]
    pub index: Option<Vec<String>>,

    /// Managed columns (comma separated); all columns when not given
    #[arg(long, global = true, value_delimiter = ',')]
    pub managed: Option<Vec<String>>,

    /// Minimum score for a mutual best match
    #[arg(long, global = true)]
    pub threshold: Option<u64>,

    /// Maximum number of records per property bucket (must be > 0)
    #[arg(long, global = true, value_parser = validate_bucket_limit)]
    pub bucket_limit: Option<usize>,

    /// Scoring rule: "presence" or "agreement"
    #[arg(long, global = true, value_parser = ScoreMode::parse)]
    pub score: Option<ScoreMode>,
}

impl OverrideArgs {
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            primary_key: self.pk.clone(),
            indexed_columns: self.index.clone(),
            managed_columns: self.managed.clone(),
            threshold: self.threshold,
            bucket_limit: self.bucket_limit,
            score_mode: self.score,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default tabalign.json in the current directory
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Align two snapshots and write the per-record classification
    Match {
        /// Old snapshot
        old: PathBuf,

        /// New snapshot
        new: PathBuf,

        /// Output file ("-" for stdout)
        #[arg(long, short, default_value = "-")]
        output: PathBuf,
    },

    /// Align two snapshots and write the delta between them
    Diff {
        /// Old snapshot
        old: PathBuf,

        /// New snapshot
        new: PathBuf,

        /// Delta file ("-" for stdout)
        #[arg(long, short, default_value = "-")]
        output: PathBuf,

        /// Write a JSON run report to this file (`-` for stderr)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Apply a delta to a key-sorted old state
    Apply {
        /// Old state, sorted by primary key
        old_state: PathBuf,

        /// Delta produced by `diff`
        #[arg(long)]
        delta: PathBuf,

        /// New state ("-" for stdout)
        #[arg(long, short, default_value = "-")]
        output: PathBuf,

        /// Write a JSON run report to this file (`-` for stderr)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Sort a table by primary key, numeric keys numerically
    Sort {
        /// Input table
        input: PathBuf,

        /// Sorted table ("-" for stdout)
        #[arg(long, short, default_value = "-")]
        output: PathBuf,
    },
}

/// Validate that the bucket limit is greater than 0
fn validate_bucket_limit(s: &str) -> Result<usize, String> {
    let limit: usize = s
        .parse()
        .map_err(|_| format!("Invalid bucket limit: '{}'. Must be a positive integer.", s))?;

    if limit == 0 {
        return Err("Bucket limit must be greater than 0".to_string());
    }

    Ok(limit)
}
