//! Delta emission: add/update/remove rows from a finished alignment
//!
//! Layout of a delta file:
//!
//! ```text
//! mode, <pk>, <new column 1>, ..., new_pk, ..., <new column n>
//! ```
//!
//! The second column is the anchor the applier joins on: the old key for
//! `update` and `remove`, the final output key for `add`. Rows are sorted by
//! anchor in numeric-aware order.

use crate::config::AlignConfig;
use crate::correspondence::Correspondence;
use crate::error::{Result, TabalignError};
use crate::keys::{compare_keys, RecordKey};
use crate::matcher::Alignment;
use crate::table::{RowSink, Table};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

pub const MODE_COLUMN: &str = "mode";
pub const NEW_PK_COLUMN: &str = "new_pk";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaMode {
    Add,
    Update,
    Remove,
}

impl DeltaMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeltaMode::Add => "add",
            DeltaMode::Update => "update",
            DeltaMode::Remove => "remove",
        }
    }

    /// Parse a mode cell; anything unrecognized is fatal
    pub fn parse(mode: &str, key: &str) -> Result<Self> {
        match mode {
            "add" => Ok(DeltaMode::Add),
            "update" => Ok(DeltaMode::Update),
            "remove" => Ok(DeltaMode::Remove),
            _ => Err(TabalignError::InvalidMode {
                mode: mode.to_string(),
                key: key.to_string(),
            }),
        }
    }
}

impl fmt::Display for DeltaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instruction of the delta
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaRow {
    pub mode: DeltaMode,
    /// Join key against the old state
    pub anchor: String,
    /// Row laid out in the new schema; the primary key cell holds the output key
    pub values: Vec<String>,
}

/// A new-side key replaced to keep output keys unique
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyRename {
    pub original: String,
    pub renamed: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeltaCounts {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub carried: usize,
}

/// A sorted delta ready to be written
#[derive(Debug, Clone)]
pub struct Delta {
    header: Vec<String>,
    rows: Vec<DeltaRow>,
    counts: DeltaCounts,
    renames: Vec<KeyRename>,
}

impl Delta {
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[DeltaRow] {
        &self.rows
    }

    pub fn counts(&self) -> &DeltaCounts {
        &self.counts
    }

    pub fn renames(&self) -> &[KeyRename] {
        &self.renames
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn write(&self, path: &Path) -> Result<u64> {
        let mut sink = RowSink::create(path)?;
        sink.write_header(&self.header)?;
        for row in &self.rows {
            sink.write_row(
                [row.mode.as_str(), row.anchor.as_str()]
                    .into_iter()
                    .chain(row.values.iter().map(String::as_str)),
            )?;
        }
        let written = sink.finish()?;
        log::info!("Wrote {} delta rows to {}", written, path.display());
        Ok(written)
    }
}

/// Delta header for a new schema whose key column is `primary_key`
pub fn delta_header(primary_key: &str, new_header: &[String]) -> Vec<String> {
    let mut header = vec![MODE_COLUMN.to_string(), primary_key.to_string()];
    header.extend(new_header.iter().map(|column| {
        if column == primary_key {
            NEW_PK_COLUMN.to_string()
        } else {
            column.clone()
        }
    }));
    header
}

/// Turns an alignment into delta rows
pub struct Emitter<'a> {
    old: &'a Table,
    new: &'a Table,
    alignment: &'a Alignment,
    config: &'a AlignConfig,
    correspondence: Correspondence,
}

impl<'a> Emitter<'a> {
    pub fn new(
        old: &'a Table,
        new: &'a Table,
        alignment: &'a Alignment,
        config: &'a AlignConfig,
    ) -> Self {
        Self {
            old,
            new,
            alignment,
            config,
            correspondence: Correspondence::between(&old.header, &new.header),
        }
    }

    /// Output key for every new row, plus the renames that produced them.
    ///
    /// Only add rows can collide: an add is anchored on its own key, so a
    /// key still held by an unrelated old record would repeat that record's
    /// anchor. Such an add is renamed to `<key>-<n>`. Matched rows keep the
    /// new key, since their anchor is the old key.
    fn resolve_output_keys(&self) -> (Vec<String>, Vec<KeyRename>) {
        let mut out_keys: Vec<String> = (0..self.new.len())
            .map(|j| self.new.key(j).to_string())
            .collect();

        let mut colliding: Vec<usize> = (0..self.new.len())
            .filter(|&j| {
                self.alignment.partner_of_new(j).is_none()
                    && self.old.contains_key(self.new.key(j))
            })
            .collect();
        colliding.sort_by(|&a, &b| compare_keys(self.new.key(a), self.new.key(b)));

        let mut assigned: HashSet<String> = HashSet::new();
        let mut renames = Vec::with_capacity(colliding.len());
        for j in colliding {
            let original = self.new.key(j);
            let mut n = 1u64;
            let renamed = loop {
                let candidate = format!("{}-{}", original, n);
                if !self.old.contains_key(&candidate)
                    && !self.new.contains_key(&candidate)
                    && !assigned.contains(&candidate)
                {
                    break candidate;
                }
                n += 1;
            };
            log::warn!(
                "Key collision: new record '{}' renamed to '{}' (old record '{}' keeps its key)",
                original,
                renamed,
                original
            );
            assigned.insert(renamed.clone());
            out_keys[j] = renamed.clone();
            renames.push(KeyRename {
                original: original.to_string(),
                renamed,
            });
        }

        (out_keys, renames)
    }

    /// New row `j` as it should appear in the output, and whether a
    /// reference cell was rewritten
    fn output_row(
        &self,
        j: usize,
        out_key: &str,
        reference_positions: &[usize],
        renamed: &HashMap<&str, &str>,
    ) -> (Vec<String>, bool) {
        let mut values = self.new.rows[j].clone();
        values[self.new.primary_key_position()] = out_key.to_string();

        let mut remapped = false;
        for &c in reference_positions {
            if let Some(&target) = renamed.get(values[c].as_str()) {
                values[c] = target.to_string();
                remapped = true;
            }
        }
        (values, remapped)
    }

    pub fn emit(&self) -> Delta {
        let pk_pos = self.new.primary_key_position();
        let (out_keys, renames) = self.resolve_output_keys();
        let renamed: HashMap<&str, &str> = renames
            .iter()
            .map(|r| (r.original.as_str(), r.renamed.as_str()))
            .collect();

        let managed: Vec<bool> = self
            .new
            .header
            .iter()
            .map(|column| self.config.is_managed(column))
            .collect();
        let reference_positions: Vec<usize> = self
            .config
            .reference_columns
            .iter()
            .filter_map(|column| self.new.column_position(column))
            .filter(|&c| c != pk_pos)
            .collect();

        let mut rows = Vec::new();
        let mut counts = DeltaCounts::default();

        for i in 0..self.old.len() {
            let old_row = &self.old.rows[i];
            let old_key = self.old.key(i);
            match self.alignment.partner_of_old(i) {
                Some(j) => {
                    let (values, remapped) =
                        self.output_row(j, &out_keys[j], &reference_positions, &renamed);
                    let changed = out_keys[j] != old_key
                        || remapped
                        || (0..values.len()).any(|c| {
                            c != pk_pos
                                && managed[c]
                                && values[c] != self.correspondence.lookup(old_row, c)
                        });
                    if changed {
                        counts.updated += 1;
                        rows.push(DeltaRow {
                            mode: DeltaMode::Update,
                            anchor: old_key.to_string(),
                            values,
                        });
                    } else {
                        counts.carried += 1;
                    }
                }
                None => {
                    counts.removed += 1;
                    rows.push(DeltaRow {
                        mode: DeltaMode::Remove,
                        anchor: old_key.to_string(),
                        values: self.correspondence.project(old_row),
                    });
                }
            }
        }

        for j in 0..self.new.len() {
            if self.alignment.partner_of_new(j).is_some() {
                continue;
            }
            let (values, _) = self.output_row(j, &out_keys[j], &reference_positions, &renamed);
            counts.added += 1;
            rows.push(DeltaRow {
                mode: DeltaMode::Add,
                anchor: out_keys[j].clone(),
                values,
            });
        }

        rows.sort_by_cached_key(|row| RecordKey::new(row.anchor.as_str()));

        log::info!(
            "Delta: {} added, {} updated, {} removed, {} carried",
            counts.added,
            counts.updated,
            counts.removed,
            counts.carried
        );
        if !renames.is_empty() {
            log::warn!("{} new keys renamed to avoid collisions", renames.len());
        }

        Delta {
            header: delta_header(self.old.primary_key_column(), &self.new.header),
            rows,
            counts,
            renames,
        }
    }
}
