//! Pair scoring with an authority-weighted column schedule

use crate::correspondence::Correspondence;
use crate::table::{column_position, is_missing};
use serde::{Deserialize, Serialize};

/// Which column pairs earn their weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    /// Both sides carry a value
    #[default]
    Presence,
    /// Both sides carry the same value
    Agreement,
}

impl ScoreMode {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "presence" => Ok(Self::Presence),
            "agreement" => Ok(Self::Agreement),
            _ => Err(format!(
                "Invalid score mode: {}. Use 'presence' or 'agreement'",
                s
            )),
        }
    }
}

/// Per-column weights laid out on the new schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weights {
    per_column: Vec<u64>,
    indexed: Vec<usize>,
}

impl Weights {
    /// Shared columns weigh 1, absent ones 0. Indexed columns are then
    /// overwritten from least to most authoritative with `base_weight`,
    /// doubling at every rank.
    pub fn build(
        new_header: &[String],
        correspondence: &Correspondence,
        indexed_columns: &[String],
        base_weight: u64,
    ) -> Self {
        let mut per_column: Vec<u64> = (0..new_header.len())
            .map(|j| u64::from(correspondence.source_of(j).is_some()))
            .collect();

        let mut indexed = Vec::new();
        let mut weight = base_weight;
        for column in indexed_columns.iter().rev() {
            if let Some(j) = column_position(new_header, column) {
                if correspondence.source_of(j).is_some() {
                    per_column[j] = weight;
                    indexed.push(j);
                }
            }
            weight = weight.saturating_mul(2);
        }

        Self {
            per_column,
            indexed,
        }
    }

    pub fn get(&self, column: usize) -> u64 {
        self.per_column.get(column).copied().unwrap_or(0)
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.per_column
    }

    /// Sum of the weights of shared, non-indexed columns
    pub fn ordinary_total(&self) -> u64 {
        self.per_column
            .iter()
            .enumerate()
            .filter(|(j, _)| !self.indexed.contains(j))
            .map(|(_, w)| *w)
            .sum()
    }

    /// Weight of the most authoritative indexed column present in both schemas
    pub fn top_indexed(&self) -> Option<u64> {
        self.indexed.iter().map(|j| self.per_column[*j]).max()
    }

    /// Whether a hit on the top indexed column outweighs every ordinary column combined
    pub fn top_column_dominates(&self) -> bool {
        match self.top_indexed() {
            Some(top) => top > self.ordinary_total(),
            None => false,
        }
    }
}

/// Scores (old, new) row pairs through a fixed correspondence
#[derive(Debug, Clone)]
pub struct Scorer {
    correspondence: Correspondence,
    weights: Weights,
    mode: ScoreMode,
}

impl Scorer {
    /// `correspondence` maps old-schema columns onto new-schema columns.
    pub fn new(correspondence: Correspondence, weights: Weights, mode: ScoreMode) -> Self {
        Self {
            correspondence,
            weights,
            mode,
        }
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn score(&self, old_row: &[String], new_row: &[String]) -> u64 {
        let mut total = 0u64;
        for (j, new_value) in new_row.iter().enumerate() {
            let weight = self.weights.get(j);
            if weight == 0 || is_missing(new_value) {
                continue;
            }
            let Some(i) = self.correspondence.source_of(j) else {
                continue;
            };
            let old_value = &old_row[i];
            if is_missing(old_value) {
                continue;
            }
            if self.mode == ScoreMode::Agreement && old_value != new_value {
                continue;
            }
            total = total.saturating_add(weight);
        }
        total
    }
}
