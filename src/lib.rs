//! # tabalign
//!
//! Aligns two snapshots of a keyed checklist that share no stable identifiers,
//! emits a sorted add/update/remove delta, and applies such a delta to the
//! old state with a streaming merge.

pub mod apply;
pub mod cli;
pub mod commands;
pub mod config;
pub mod correspondence;
pub mod delta;
pub mod error;
pub mod index;
pub mod keys;
pub mod matcher;
pub mod progress;
pub mod report;
pub mod score;
pub mod sort;
pub mod table;

pub use config::AlignConfig;
pub use error::{Result, TabalignError};
pub use matcher::{Alignment, Matcher, Status};

/// Default maximum number of records per property bucket
pub const DEFAULT_BUCKET_LIMIT: usize = 100;

/// Default minimum score for accepting a mutual best match
pub const DEFAULT_THRESHOLD: u64 = 100;

/// Default weight of the least authoritative indexed column
pub const DEFAULT_BASE_WEIGHT: u64 = 100;

/// Default number of sample keys shown per diagnostic condition
pub const DEFAULT_SAMPLE_SIZE: usize = 5;
