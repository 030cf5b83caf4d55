//! Inverted index from (column, value) properties to record positions

use crate::table::Table;
use indexmap::IndexMap;
use serde::Serialize;

/// A property bucket that reached the per-bucket limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CappedProperty {
    pub column: String,
    pub value: String,
    /// Records left out of the bucket
    pub dropped: usize,
}

/// Non-missing values of the indexed columns of one row, in authority order
pub fn row_properties<'a>(
    table: &'a Table,
    row: usize,
    indexed: &'a [(String, usize)],
) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    indexed.iter().filter_map(move |(column, position)| {
        table
            .value(row, *position)
            .map(|value| (column.as_str(), value))
    })
}

/// Indexed columns of `table` with their positions, most authoritative first
pub fn indexed_positions(table: &Table, indexed_columns: &[String]) -> Vec<(String, usize)> {
    indexed_columns
        .iter()
        .filter_map(|column| {
            table
                .column_position(column)
                .map(|position| (column.clone(), position))
        })
        .collect()
}

/// Property -> bounded list of row positions for one snapshot
#[derive(Debug, Clone)]
pub struct PropertyIndex {
    buckets: IndexMap<String, IndexMap<String, Vec<usize>>>,
    limit: usize,
    entries: usize,
    capped: IndexMap<(String, String), usize>,
}

impl PropertyIndex {
    /// Index every row of `table` under its indexed properties.
    ///
    /// A bucket stops growing at `limit`; earlier entries are kept. A value
    /// shared by very many records carries little information and would
    /// otherwise make candidate generation quadratic.
    pub fn build(table: &Table, indexed_columns: &[String], limit: usize) -> Self {
        let positions = indexed_positions(table, indexed_columns);
        let mut buckets: IndexMap<String, IndexMap<String, Vec<usize>>> = positions
            .iter()
            .map(|(column, _)| (column.clone(), IndexMap::new()))
            .collect();
        let mut entries = 0;
        let mut capped: IndexMap<(String, String), usize> = IndexMap::new();

        for row in 0..table.len() {
            for (column, value) in row_properties(table, row, &positions) {
                let Some(by_value) = buckets.get_mut(column) else {
                    continue;
                };
                let bucket = by_value.entry(value.to_string()).or_default();
                if bucket.len() < limit {
                    bucket.push(row);
                    entries += 1;
                } else {
                    let dropped = capped
                        .entry((column.to_string(), value.to_string()))
                        .or_insert(0);
                    if *dropped == 0 {
                        log::warn!(
                            "{} records with property ({}, {:?}) in {}; ignoring the rest",
                            limit,
                            column,
                            value,
                            table.source.display()
                        );
                    }
                    *dropped += 1;
                }
            }
        }

        let index = Self {
            buckets,
            limit,
            entries,
            capped,
        };
        log::info!(
            "Indexed {} rows of {}: {} properties, {} entries, {} capped",
            table.len(),
            table.source.display(),
            index.property_count(),
            index.entry_count(),
            index.capped_count()
        );
        index
    }

    /// Rows sharing `(column, value)`; empty when the property is unknown
    pub fn candidates(&self, column: &str, value: &str) -> &[usize] {
        self.buckets
            .get(column)
            .and_then(|by_value| by_value.get(value))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether some records sharing `(column, value)` were left out
    pub fn is_capped(&self, column: &str, value: &str) -> bool {
        self.candidates(column, value).len() >= self.limit
            && self
                .capped
                .contains_key(&(column.to_string(), value.to_string()))
    }

    pub fn property_count(&self) -> usize {
        self.buckets.values().map(IndexMap::len).sum()
    }

    pub fn entry_count(&self) -> usize {
        self.entries
    }

    pub fn capped_count(&self) -> usize {
        self.capped.len()
    }

    /// Capped properties in the order they overflowed
    pub fn capped(&self) -> Vec<CappedProperty> {
        self.capped
            .iter()
            .map(|((column, value), dropped)| CappedProperty {
                column: column.clone(),
                value: value.clone(),
                dropped: *dropped,
            })
            .collect()
    }
}
