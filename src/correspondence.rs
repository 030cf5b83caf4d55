//! Name-based column correspondence between two schemas
//!
//! Computed once per run; row access afterwards is positional.

use crate::table::column_position;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correspondence {
    /// Source position -> target position
    forward: Vec<Option<usize>>,
    /// Target position -> source position
    backward: Vec<Option<usize>>,
}

impl Correspondence {
    pub fn between(source: &[String], target: &[String]) -> Self {
        let forward = source
            .iter()
            .map(|name| column_position(target, name))
            .collect();
        let backward = target
            .iter()
            .map(|name| column_position(source, name))
            .collect();
        Self { forward, backward }
    }

    pub fn target_of(&self, source_column: usize) -> Option<usize> {
        self.forward.get(source_column).copied().flatten()
    }

    pub fn source_of(&self, target_column: usize) -> Option<usize> {
        self.backward.get(target_column).copied().flatten()
    }

    /// Number of target columns that also exist in the source
    pub fn shared_count(&self) -> usize {
        self.backward.iter().filter(|p| p.is_some()).count()
    }

    /// Target columns absent from the source schema
    pub fn unmapped_targets(&self) -> impl Iterator<Item = usize> + '_ {
        self.backward
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_none())
            .map(|(j, _)| j)
    }

    /// Value of target column `j` read from a source row; absent columns read as missing.
    pub fn lookup<'a>(&self, source_row: &'a [String], target_column: usize) -> &'a str {
        match self.source_of(target_column) {
            Some(i) => source_row[i].as_str(),
            None => "",
        }
    }

    /// Re-lay a source row in the target schema
    pub fn project(&self, source_row: &[String]) -> Vec<String> {
        (0..self.backward.len())
            .map(|j| self.lookup(source_row, j).to_string())
            .collect()
    }
}
