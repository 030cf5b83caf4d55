//! Streaming application of a delta to a key-sorted old state
//!
//! Only one row of each input is held at a time. Both inputs must be
//! strictly ascending by key; the first violation aborts the run.

use crate::correspondence::Correspondence;
use crate::delta::{DeltaMode, MODE_COLUMN, NEW_PK_COLUMN};
use crate::error::{Result, TabalignError};
use crate::keys::RecordKey;
use crate::progress::ProgressReporter;
use crate::table::{column_position, RowSink, RowSource};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyCounts {
    pub carried: usize,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl ApplyCounts {
    pub fn rows_out(&self) -> usize {
        self.carried + self.added + self.updated
    }
}

/// Output header and primary key column derived from a delta header
pub fn state_header(delta_header: &[String]) -> Result<(Vec<String>, String)> {
    if delta_header.len() < 3 || delta_header[0] != MODE_COLUMN {
        return Err(TabalignError::invalid_input(format!(
            "Not a delta header (expected '{}', key column, fields...): {:?}",
            MODE_COLUMN, delta_header
        )));
    }
    let primary_key = delta_header[1].clone();
    if column_position(&delta_header[2..], NEW_PK_COLUMN).is_none() {
        return Err(TabalignError::invalid_input(format!(
            "Delta header has no '{}' column",
            NEW_PK_COLUMN
        )));
    }
    let header = delta_header[2..]
        .iter()
        .map(|column| {
            if column == NEW_PK_COLUMN {
                primary_key.clone()
            } else {
                column.clone()
            }
        })
        .collect();
    Ok((header, primary_key))
}

/// One input of the merge with its current row
struct SortedStream {
    source: RowSource,
    key_pos: usize,
    current: Option<(RecordKey, Vec<String>)>,
}

impl SortedStream {
    fn new(source: RowSource, key_pos: usize) -> Result<Self> {
        let mut stream = Self {
            source,
            key_pos,
            current: None,
        };
        stream.advance()?;
        Ok(stream)
    }

    /// Read the next row and hand back the previous one
    fn advance(&mut self) -> Result<Option<(RecordKey, Vec<String>)>> {
        let next = match self.source.next_row()? {
            Some(row) => {
                let key = RecordKey::new(row[self.key_pos].as_str());
                if let Some((previous, _)) = &self.current {
                    if key <= *previous {
                        return Err(TabalignError::merge_order(format!(
                            "key '{}' at line {} of {} does not follow '{}'",
                            key,
                            self.source.line(),
                            self.source.path().display(),
                            previous
                        )));
                    }
                }
                Some((key, row))
            }
            None => None,
        };
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn key(&self) -> Option<&RecordKey> {
        self.current.as_ref().map(|(key, _)| key)
    }
}

/// Merge `old` and `delta` into `sink`
pub fn apply_streams(
    old: RowSource,
    delta: RowSource,
    sink: &mut RowSink,
    progress: &mut ProgressReporter,
) -> Result<ApplyCounts> {
    let (out_header, primary_key) = state_header(delta.header())?;
    let old_key_pos = column_position(old.header(), &primary_key)
        .ok_or_else(|| TabalignError::missing_column(old.path(), primary_key.as_str()))?;
    let carry = Correspondence::between(old.header(), &out_header);
    if carry.shared_count() < out_header.len() {
        log::debug!(
            "{} output columns absent from the old state; carried rows leave them empty",
            out_header.len() - carry.shared_count()
        );
    }

    sink.write_header(&out_header)?;
    let mut old = SortedStream::new(old, old_key_pos)?;
    let mut delta = SortedStream::new(delta, 1)?;
    let mut counts = ApplyCounts::default();

    progress.start_stage("Applying delta", None);
    loop {
        let order = match (old.key(), delta.key()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(old_key), Some(delta_key)) => old_key.cmp(delta_key),
        };

        if order == Ordering::Less {
            if let Some((_, row)) = old.advance()? {
                sink.write_row(carry.project(&row))?;
                counts.carried += 1;
                progress.inc(1);
            }
            continue;
        }

        let Some((key, row)) = delta.advance()? else {
            break;
        };
        let mode = DeltaMode::parse(&row[0], key.as_str())?;
        match (mode, order) {
            (DeltaMode::Add, Ordering::Greater) => {
                sink.write_row(&row[2..])?;
                counts.added += 1;
            }
            (DeltaMode::Update, Ordering::Equal) => {
                old.advance()?;
                sink.write_row(&row[2..])?;
                counts.updated += 1;
                progress.inc(1);
            }
            (DeltaMode::Remove, Ordering::Equal) => {
                old.advance()?;
                counts.removed += 1;
                progress.inc(1);
            }
            (DeltaMode::Add, _) => {
                return Err(TabalignError::merge_order(format!(
                    "add for key '{}' which is already in the old state",
                    key
                )));
            }
            (mode, _) => {
                return Err(TabalignError::merge_order(format!(
                    "{} for key '{}' which is not in the old state (or the old state is unsorted)",
                    mode, key
                )));
            }
        }
    }
    progress.finish_stage("Applied delta");

    log::info!(
        "Applied delta: {} carried, {} added, {} updated, {} removed",
        counts.carried,
        counts.added,
        counts.updated,
        counts.removed
    );
    Ok(counts)
}

/// Apply the delta at `delta_path` to the old state at `old_path`
pub fn apply_files(
    old_path: &Path,
    delta_path: &Path,
    output: &Path,
    progress: &mut ProgressReporter,
) -> Result<ApplyCounts> {
    let old = RowSource::open(old_path)?;
    let delta = RowSource::open(delta_path)?;
    let mut sink = RowSink::create(output)?;
    let counts = apply_streams(old, delta, &mut sink, progress)?;
    sink.finish()?;
    Ok(counts)
}
