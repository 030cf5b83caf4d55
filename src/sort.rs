//! Numeric-aware sorting of keyed tables

use crate::error::Result;
use crate::keys::RecordKey;
use crate::table::{RowSink, Table};
use std::path::Path;

/// Row positions of `table` in ascending key order
pub fn sorted_order(table: &Table) -> Vec<usize> {
    let mut order: Vec<usize> = (0..table.len()).collect();
    order.sort_by_cached_key(|&i| RecordKey::new(table.key(i)));
    order
}

/// Position of the first row whose key does not follow its predecessor
pub fn first_unsorted(table: &Table) -> Option<usize> {
    (1..table.len()).find(|&i| RecordKey::new(table.key(i)) <= RecordKey::new(table.key(i - 1)))
}

/// Write `table` sorted by primary key
pub fn write_sorted(table: &Table, output: &Path) -> Result<u64> {
    let mut sink = RowSink::create(output)?;
    sink.write_header(&table.header)?;
    for i in sorted_order(table) {
        sink.write_row(&table.rows[i])?;
    }
    sink.finish()
}

/// Read, validate and sort a table file
pub fn sort_file(input: &Path, output: &Path, primary_key: &str) -> Result<u64> {
    let table = Table::load(input, primary_key)?;
    if first_unsorted(&table).is_none() {
        log::debug!("{} is already sorted", input.display());
    }
    let written = write_sorted(&table, output)?;
    log::info!("Wrote {} sorted rows to {}", written, output.display());
    Ok(written)
}
