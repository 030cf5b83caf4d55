//! Run reports, digests and operator-facing summaries
//!
//! Everything printed here goes to stderr; data output never shares a stream
//! with diagnostics.

use crate::apply::ApplyCounts;
use crate::config::AlignConfig;
use crate::delta::{Delta, DeltaCounts, KeyRename};
use crate::error::Result;
use crate::index::{CappedProperty, PropertyIndex};
use crate::keys::RecordKey;
use crate::matcher::{Alignment, BestKey, Matcher, Status, StatusCounts};
use crate::table::{RowSink, Table, STDIO_PATH};
use anyhow::Context;
use blake3::Hasher;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A hash value represented as a hex string
pub type HashValue = String;

/// blake3 digest of a file's bytes; stdin/stdout have none
pub fn file_digest(path: &Path) -> Result<Option<HashValue>> {
    if path.as_os_str() == STDIO_PATH {
        return Ok(None);
    }
    let mut file =
        File::open(path).with_context(|| format!("Cannot fingerprint {}", path.display()))?;
    let mut hasher = Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(Some(hasher.finalize().to_hex().to_string()))
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub path: String,
    pub rows: u64,
    pub digest: Option<HashValue>,
}

impl FileSummary {
    pub fn of(path: &Path, rows: u64) -> Result<Self> {
        Ok(Self {
            path: path.display().to_string(),
            rows,
            digest: file_digest(path)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    pub properties: usize,
    pub entries: usize,
    pub capped: Vec<CappedProperty>,
}

impl IndexSummary {
    fn of(index: &PropertyIndex) -> Self {
        Self {
            properties: index.property_count(),
            entries: index.entry_count(),
            capped: index.capped(),
        }
    }
}

/// Classification counts and first-N samples for one side
#[derive(Debug, Clone, Serialize)]
pub struct SideSummary {
    pub statuses: StatusCounts,
    pub without_properties: usize,
    pub samples: IndexMap<Status, Vec<String>>,
}

/// Report of a `diff` run
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub created: DateTime<Utc>,
    pub version: String,
    pub config: AlignConfig,
    pub old: FileSummary,
    pub new: FileSummary,
    pub delta: FileSummary,
    pub counts: DeltaCounts,
    pub pairs_scored: u64,
    pub old_side: SideSummary,
    pub new_side: SideSummary,
    pub old_index: IndexSummary,
    pub new_index: IndexSummary,
    pub renames: Vec<KeyRename>,
}

impl DiffReport {
    /// Summarize a finished diff; `delta_path` must already be written
    pub fn build(
        config: &AlignConfig,
        old: &Table,
        new: &Table,
        matcher: &Matcher<'_>,
        alignment: &Alignment,
        delta: &Delta,
        delta_path: &Path,
    ) -> Result<Self> {
        let old_samples = samples(
            (0..old.len()).map(|i| (alignment.old_status(i), old.key(i))),
            config.sample_size,
        );
        let new_samples = samples(
            (0..new.len()).map(|j| (alignment.new_status(j), new.key(j))),
            config.sample_size,
        );

        Ok(Self {
            created: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config: config.clone(),
            old: FileSummary::of(&old.source, old.len() as u64)?,
            new: FileSummary::of(&new.source, new.len() as u64)?,
            delta: FileSummary::of(delta_path, delta.rows().len() as u64)?,
            counts: delta.counts().clone(),
            pairs_scored: alignment.pairs_scored(),
            old_side: SideSummary {
                statuses: alignment.old_counts(),
                without_properties: matcher.old_rows_without_properties(),
                samples: old_samples,
            },
            new_side: SideSummary {
                statuses: alignment.new_counts(),
                without_properties: matcher.new_rows_without_properties(),
                samples: new_samples,
            },
            old_index: IndexSummary::of(matcher.old_index()),
            new_index: IndexSummary::of(matcher.new_index()),
            renames: delta.renames().to_vec(),
        })
    }
}

/// Report of an `apply` run
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub created: DateTime<Utc>,
    pub version: String,
    pub old_state: FileSummary,
    pub delta: FileSummary,
    pub output: FileSummary,
    pub counts: ApplyCounts,
}

impl ApplyReport {
    pub fn build(
        old_state: &Path,
        delta: &Path,
        output: &Path,
        counts: &ApplyCounts,
    ) -> Result<Self> {
        let old_rows = counts.carried + counts.updated + counts.removed;
        let delta_rows = counts.added + counts.updated + counts.removed;
        Ok(Self {
            created: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            old_state: FileSummary::of(old_state, old_rows as u64)?,
            delta: FileSummary::of(delta, delta_rows as u64)?,
            output: FileSummary::of(output, counts.rows_out() as u64)?,
            counts: counts.clone(),
        })
    }
}

/// First `limit` keys per non-match status, in input order
fn samples<'a>(
    records: impl Iterator<Item = (Status, &'a str)>,
    limit: usize,
) -> IndexMap<Status, Vec<String>> {
    let mut out: IndexMap<Status, Vec<String>> = IndexMap::new();
    for (status, key) in records {
        if status == Status::Match {
            continue;
        }
        let bucket = out.entry(status).or_default();
        if bucket.len() < limit {
            bucket.push(key.to_string());
        }
    }
    out.sort_keys();
    out
}

/// One line of the alignment table written by `match`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentRow {
    pub old_key: String,
    pub new_key: String,
    pub score: Option<u64>,
    pub status: Status,
}

pub const ALIGNMENT_HEADER: [&str; 4] = ["old_key", "new_key", "score", "status"];

/// Every old record with its best candidate, then every unclaimed new record
pub fn alignment_rows(old: &Table, new: &Table, alignment: &Alignment) -> Vec<AlignmentRow> {
    let mut old_rows: Vec<AlignmentRow> = (0..old.len())
        .map(|i| {
            let best = alignment.best_new(i);
            AlignmentRow {
                old_key: old.key(i).to_string(),
                new_key: match best.map(|b| b.key) {
                    Some(BestKey::Key(j)) => new.key(j).to_string(),
                    _ => String::new(),
                },
                score: best.map(|b| b.score),
                status: alignment.old_status(i),
            }
        })
        .collect();
    old_rows.sort_by_cached_key(|row| RecordKey::new(row.old_key.as_str()));

    let mut new_rows: Vec<AlignmentRow> = (0..new.len())
        .filter(|&j| alignment.partner_of_new(j).is_none())
        .map(|j| {
            let best = alignment.best_old(j);
            AlignmentRow {
                old_key: match best.map(|b| b.key) {
                    Some(BestKey::Key(i)) => old.key(i).to_string(),
                    _ => String::new(),
                },
                new_key: new.key(j).to_string(),
                score: best.map(|b| b.score),
                status: alignment.new_status(j),
            }
        })
        .collect();
    new_rows.sort_by_cached_key(|row| RecordKey::new(row.new_key.as_str()));

    old_rows.extend(new_rows);
    old_rows
}

pub fn write_alignment(rows: &[AlignmentRow], path: &Path) -> Result<u64> {
    let mut sink = RowSink::create(path)?;
    sink.write_header(&ALIGNMENT_HEADER.map(String::from))?;
    for row in rows {
        let score = row.score.map(|s| s.to_string()).unwrap_or_default();
        sink.write_row([
            row.old_key.as_str(),
            row.new_key.as_str(),
            score.as_str(),
            row.status.as_str(),
        ])?;
    }
    sink.finish()
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Write a report as a JSON document
    pub fn write<T: Serialize + ?Sized>(data: &T, path: &Path) -> Result<()> {
        match ReportTarget::for_path(path) {
            ReportTarget::Stderr => Self::write_to(data, &mut io::stderr().lock()),
            ReportTarget::File(path) => {
                let mut file = File::create(&path)
                    .with_context(|| format!("Cannot write report {}", path.display()))?;
                Self::write_to(data, &mut file)?;
                log::debug!("Wrote report to {}", path.display());
                Ok(())
            }
        }
    }

    pub fn write_to<T: Serialize + ?Sized, W: Write>(data: &T, writer: &mut W) -> Result<()> {
        writeln!(writer, "{}", Self::format(data)?)?;
        writer.flush()?;
        Ok(())
    }
}

/// Where a `--report` document goes. `-` is the diagnostic stream, since
/// stdout may already carry the delta or the new state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportTarget {
    Stderr,
    File(PathBuf),
}

impl ReportTarget {
    pub fn for_path(path: &Path) -> Self {
        if path.as_os_str() == STDIO_PATH {
            ReportTarget::Stderr
        } else {
            ReportTarget::File(path.to_path_buf())
        }
    }
}

/// Human-readable summaries on stderr
pub struct PrettyPrinter;

impl PrettyPrinter {
    pub fn print_diff_report(report: &DiffReport) {
        eprintln!("📊 tabalign diff: {} → {}", report.old.path, report.new.path);
        eprintln!(
            "├─ Rows: {} old, {} new ({} pairs scored)",
            report.old.rows, report.new.rows, report.pairs_scored
        );
        eprintln!(
            "├─ Delta: {} added, {} updated, {} removed, {} carried",
            report.counts.added, report.counts.updated, report.counts.removed, report.counts.carried
        );
        Self::print_side("Old records", &report.old_side);
        Self::print_side("New records", &report.new_side);

        let capped = report.old_index.capped.len() + report.new_index.capped.len();
        if capped > 0 {
            eprintln!("├─ Capped properties: {}", capped);
            for property in report
                .old_index
                .capped
                .iter()
                .chain(&report.new_index.capped)
                .take(report.config.sample_size)
            {
                eprintln!(
                    "│  └─ ({}, {:?}): {} records left out",
                    property.column, property.value, property.dropped
                );
            }
        }

        if report.renames.is_empty() {
            eprintln!("└─ Key collisions: none");
        } else {
            eprintln!("└─ Key collisions: {} renamed", report.renames.len());
            for rename in &report.renames {
                eprintln!("   └─ {} → {}", rename.original, rename.renamed);
            }
        }
    }

    fn print_side(label: &str, side: &SideSummary) {
        let unmatched: Vec<String> = Status::ALL
            .iter()
            .filter(|status| **status != Status::Match)
            .filter_map(|status| {
                let count = side.statuses.get(*status);
                (count > 0).then(|| format!("{} {}", count, status))
            })
            .collect();

        eprintln!("├─ {}: {} matched", label, side.statuses.matched);
        if !unmatched.is_empty() {
            eprintln!("│  ├─ Unmatched: {}", unmatched.join(", "));
        }
        if side.without_properties > 0 {
            eprintln!(
                "│  ├─ {} records have no indexed values and cannot match",
                side.without_properties
            );
        }
        for (status, keys) in &side.samples {
            eprintln!("│  └─ {} (sample): {}", status, keys.join(", "));
        }
    }

    pub fn print_apply_report(report: &ApplyReport) {
        eprintln!("📦 tabalign apply: {} + {}", report.old_state.path, report.delta.path);
        eprintln!(
            "├─ Carried: {}, added: {}, updated: {}, removed: {}",
            report.counts.carried, report.counts.added, report.counts.updated, report.counts.removed
        );
        match &report.output.digest {
            Some(digest) => eprintln!("└─ Output: {} rows, blake3 {}", report.output.rows, digest),
            None => eprintln!("└─ Output: {} rows", report.output.rows),
        }
    }
}
