//! Mutual-best-match alignment of two snapshots
//!
//! The quadratic formulation: score every (old, new) pair and accept a pair
//! when it beats every other pair sharing either of its records. Here only
//! pairs sharing at least one indexed property are ever scored, and each
//! record keeps a running best, so the cost follows the number of
//! (record, property, candidate) triples instead of the cross product.
//!
//! This is a stable-pairing criterion, not a maximum-weight bipartite
//! matching: a record whose best candidate is tied or prefers someone else
//! stays unmatched and becomes an add/remove.

use crate::config::AlignConfig;
use crate::correspondence::Correspondence;
use crate::index::{indexed_positions, row_properties, PropertyIndex};
use crate::progress::ProgressReporter;
use crate::score::{Scorer, Weights};
use crate::table::Table;
use serde::Serialize;
use std::fmt;

/// Partner recorded in a best-match entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BestKey {
    /// Row position on the opposite side, uniquely best so far
    Key(usize),
    /// Two or more opposite rows share the best score
    Ambiguous,
}

/// Highest score seen for one record, and who achieved it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestMatch {
    pub score: u64,
    pub key: BestKey,
}

/// Fold one scored candidate into a running best.
/// Strictly greater replaces; equal with another key degrades to ambiguous.
fn offer(slot: &mut Option<BestMatch>, score: u64, candidate: usize) {
    match slot {
        None => {
            *slot = Some(BestMatch {
                score,
                key: BestKey::Key(candidate),
            })
        }
        Some(best) if score > best.score => {
            *best = BestMatch {
                score,
                key: BestKey::Key(candidate),
            }
        }
        Some(best) if score == best.score && best.key != BestKey::Key(candidate) => {
            best.key = BestKey::Ambiguous;
        }
        Some(_) => {}
    }
}

/// Outcome of alignment for a single record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Confirmed mutual best match
    Match,
    /// The old record's best score is shared by several new records
    Ambiguous,
    /// The new record's best score is shared by several old records
    Contentious,
    /// Mutual best, but below the acceptance threshold
    Weak,
    /// The preferred partner prefers someone else
    Defeated,
    /// No candidate shared a property with this record
    Unconsidered,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Match,
        Status::Ambiguous,
        Status::Contentious,
        Status::Weak,
        Status::Defeated,
        Status::Unconsidered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Match => "match",
            Status::Ambiguous => "ambiguous",
            Status::Contentious => "contentious",
            Status::Weak => "weak",
            Status::Defeated => "defeated",
            Status::Unconsidered => "unconsidered",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-status record counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub matched: usize,
    pub ambiguous: usize,
    pub contentious: usize,
    pub weak: usize,
    pub defeated: usize,
    pub unconsidered: usize,
}

impl StatusCounts {
    fn tally(statuses: &[Status]) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            match status {
                Status::Match => counts.matched += 1,
                Status::Ambiguous => counts.ambiguous += 1,
                Status::Contentious => counts.contentious += 1,
                Status::Weak => counts.weak += 1,
                Status::Defeated => counts.defeated += 1,
                Status::Unconsidered => counts.unconsidered += 1,
            }
        }
        counts
    }

    pub fn get(&self, status: Status) -> usize {
        match status {
            Status::Match => self.matched,
            Status::Ambiguous => self.ambiguous,
            Status::Contentious => self.contentious,
            Status::Weak => self.weak,
            Status::Defeated => self.defeated,
            Status::Unconsidered => self.unconsidered,
        }
    }
}

/// Result of aligning an old and a new snapshot
#[derive(Debug, Clone)]
pub struct Alignment {
    best_new: Vec<Option<BestMatch>>,
    best_old: Vec<Option<BestMatch>>,
    old_status: Vec<Status>,
    new_status: Vec<Status>,
    old_partner: Vec<Option<usize>>,
    new_partner: Vec<Option<usize>>,
    pairs_scored: u64,
}

impl Alignment {
    /// Classify every record from the finished best-match tables
    fn confirm(
        best_new: Vec<Option<BestMatch>>,
        best_old: Vec<Option<BestMatch>>,
        threshold: u64,
        pairs_scored: u64,
    ) -> Self {
        let mut old_partner = vec![None; best_new.len()];
        let mut new_partner = vec![None; best_old.len()];

        let old_status: Vec<Status> = best_new
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let Some(best) = entry else {
                    return Status::Unconsidered;
                };
                let BestKey::Key(j) = best.key else {
                    return Status::Ambiguous;
                };
                let Some(back) = best_old[j] else {
                    return Status::Unconsidered;
                };
                if back.score > best.score {
                    return Status::Defeated;
                }
                match back.key {
                    BestKey::Key(k) if k == i => {
                        if best.score < threshold {
                            Status::Weak
                        } else {
                            old_partner[i] = Some(j);
                            new_partner[j] = Some(i);
                            Status::Match
                        }
                    }
                    _ => Status::Contentious,
                }
            })
            .collect();

        let new_status: Vec<Status> = best_old
            .iter()
            .enumerate()
            .map(|(j, entry)| {
                if new_partner[j].is_some() {
                    return Status::Match;
                }
                let Some(best) = entry else {
                    return Status::Unconsidered;
                };
                let BestKey::Key(i) = best.key else {
                    return Status::Contentious;
                };
                let Some(forward) = best_new[i] else {
                    return Status::Unconsidered;
                };
                if forward.score > best.score {
                    return Status::Defeated;
                }
                match forward.key {
                    BestKey::Key(k) if k == j => Status::Weak,
                    _ => Status::Ambiguous,
                }
            })
            .collect();

        Self {
            best_new,
            best_old,
            old_status,
            new_status,
            old_partner,
            new_partner,
            pairs_scored,
        }
    }

    /// Best new-side entry for old row `i`
    pub fn best_new(&self, i: usize) -> Option<BestMatch> {
        self.best_new[i]
    }

    /// Best old-side entry for new row `j`
    pub fn best_old(&self, j: usize) -> Option<BestMatch> {
        self.best_old[j]
    }

    pub fn old_status(&self, i: usize) -> Status {
        self.old_status[i]
    }

    pub fn new_status(&self, j: usize) -> Status {
        self.new_status[j]
    }

    /// Confirmed new partner of old row `i`
    pub fn partner_of_old(&self, i: usize) -> Option<usize> {
        self.old_partner[i]
    }

    /// Confirmed old partner of new row `j`
    pub fn partner_of_new(&self, j: usize) -> Option<usize> {
        self.new_partner[j]
    }

    /// Confirmed pairs `(old row, new row, score)` in old-row order
    pub fn matches(&self) -> impl Iterator<Item = (usize, usize, u64)> + '_ {
        self.old_partner.iter().enumerate().filter_map(|(i, partner)| {
            partner.map(|j| (i, j, self.best_new[i].map(|b| b.score).unwrap_or(0)))
        })
    }

    pub fn match_count(&self) -> usize {
        self.old_partner.iter().filter(|p| p.is_some()).count()
    }

    pub fn old_counts(&self) -> StatusCounts {
        StatusCounts::tally(&self.old_status)
    }

    pub fn new_counts(&self) -> StatusCounts {
        StatusCounts::tally(&self.new_status)
    }

    pub fn pairs_scored(&self) -> u64 {
        self.pairs_scored
    }
}

/// Candidate generation and scoring over a pair of snapshots
pub struct Matcher<'a> {
    old: &'a Table,
    new: &'a Table,
    scorer: Scorer,
    old_index: PropertyIndex,
    new_index: PropertyIndex,
    old_indexed: Vec<(String, usize)>,
    new_indexed: Vec<(String, usize)>,
    threshold: u64,
}

impl<'a> Matcher<'a> {
    /// Build both property indexes and the scoring schedule
    pub fn new(old: &'a Table, new: &'a Table, config: &AlignConfig) -> Self {
        let correspondence = Correspondence::between(&old.header, &new.header);
        let weights = Weights::build(
            &new.header,
            &correspondence,
            &config.indexed_columns,
            config.base_weight,
        );
        log::debug!("Weights: {:?}", weights.as_slice());
        if !weights.top_column_dominates() {
            log::warn!(
                "Top indexed column weight does not exceed the {} ordinary columns combined",
                weights.ordinary_total()
            );
        }

        let scorer = Scorer::new(correspondence, weights, config.score_mode);
        let old_index = PropertyIndex::build(old, &config.indexed_columns, config.bucket_limit);
        let new_index = PropertyIndex::build(new, &config.indexed_columns, config.bucket_limit);

        Self {
            old,
            new,
            scorer,
            old_index,
            new_index,
            old_indexed: indexed_positions(old, &config.indexed_columns),
            new_indexed: indexed_positions(new, &config.indexed_columns),
            threshold: config.threshold,
        }
    }

    pub fn old_index(&self) -> &PropertyIndex {
        &self.old_index
    }

    pub fn new_index(&self) -> &PropertyIndex {
        &self.new_index
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Old rows with no indexed value at all; these can never match.
    pub fn old_rows_without_properties(&self) -> usize {
        (0..self.old.len())
            .filter(|&i| row_properties(self.old, i, &self.old_indexed).next().is_none())
            .count()
    }

    pub fn new_rows_without_properties(&self) -> usize {
        (0..self.new.len())
            .filter(|&j| row_properties(self.new, j, &self.new_indexed).next().is_none())
            .count()
    }

    /// Score all candidate pairs and classify every record
    pub fn run(&self, progress: &mut ProgressReporter) -> Alignment {
        let mut best_new: Vec<Option<BestMatch>> = vec![None; self.old.len()];
        let mut best_old: Vec<Option<BestMatch>> = vec![None; self.new.len()];
        let mut pairs_scored = 0u64;

        progress.start_stage("Matching old records", Some(self.old.len() as u64));
        for i in 0..self.old.len() {
            for (column, value) in row_properties(self.old, i, &self.old_indexed) {
                for &j in self.new_index.candidates(column, value) {
                    self.consider(i, j, &mut best_new, &mut best_old);
                    pairs_scored += 1;
                }
            }
            progress.inc(1);
        }
        progress.finish_stage("Matched old records");

        // Pairs whose new record fell outside a capped new-side bucket can
        // still be reached through the old-side bucket of the same property.
        let mut recovered = 0u64;
        for j in 0..self.new.len() {
            for (column, value) in row_properties(self.new, j, &self.new_indexed) {
                if !self.new_index.is_capped(column, value) {
                    continue;
                }
                for &i in self.old_index.candidates(column, value) {
                    self.consider(i, j, &mut best_new, &mut best_old);
                    recovered += 1;
                }
            }
        }
        if recovered > 0 {
            log::debug!("Scored {} pairs through capped properties", recovered);
        }
        pairs_scored += recovered;

        let alignment = Alignment::confirm(best_new, best_old, self.threshold, pairs_scored);
        log::info!(
            "Scored {} candidate pairs; {} confirmed matches",
            alignment.pairs_scored(),
            alignment.match_count()
        );
        alignment
    }

    fn consider(
        &self,
        i: usize,
        j: usize,
        best_new: &mut [Option<BestMatch>],
        best_old: &mut [Option<BestMatch>],
    ) {
        let score = self.scorer.score(&self.old.rows[i], &self.new.rows[j]);
        offer(&mut best_new[i], score, j);
        offer(&mut best_old[j], score, i);
    }
}
