//! Keyed tables read from and written to character-separated files

use crate::error::{Result, TabalignError};
use anyhow::Context;
use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use indexmap::IndexMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Placeholder path meaning stdin or stdout
pub const STDIO_PATH: &str = "-";

/// A missing value is an empty field; anything else is present data.
pub fn is_missing(value: &str) -> bool {
    value.is_empty()
}

/// Field separator and quoting convention, chosen by file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Comma separated, minimal quoting
    Csv,
    /// Tab separated, no quoting at all
    Tsv,
}

impl Dialect {
    pub fn for_path(path: &Path) -> Self {
        if path.as_os_str() == STDIO_PATH {
            return Self::Csv;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if name.contains(".csv") {
            Self::Csv
        } else {
            Self::Tsv
        }
    }

    fn reader_builder(self) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        // Width is checked by RowSource so the error can name the line.
        builder.has_headers(true).flexible(true);
        if self == Self::Tsv {
            builder.delimiter(b'\t').quoting(false);
        }
        builder
    }

    fn writer_builder(self) -> WriterBuilder {
        let mut builder = WriterBuilder::new();
        match self {
            Self::Csv => {
                builder.quote_style(QuoteStyle::Necessary);
            }
            Self::Tsv => {
                builder.delimiter(b'\t').quote_style(QuoteStyle::Never);
            }
        }
        builder
    }
}

/// Streaming row reader that enforces the header width on every row
pub struct RowSource {
    path: PathBuf,
    reader: csv::Reader<Box<dyn Read>>,
    header: Vec<String>,
    record: StringRecord,
    rows_read: u64,
}

impl RowSource {
    pub fn open(path: &Path) -> Result<Self> {
        let input: Box<dyn Read> = if path.as_os_str() == STDIO_PATH {
            Box::new(io::stdin())
        } else {
            let file = File::open(path).map_err(|e| {
                TabalignError::invalid_input(format!("Cannot open {}: {}", path.display(), e))
            })?;
            Box::new(BufReader::new(file))
        };
        Self::from_reader(path, Dialect::for_path(path), input)
    }

    pub fn from_reader(path: &Path, dialect: Dialect, input: Box<dyn Read>) -> Result<Self> {
        let mut reader = dialect.reader_builder().from_reader(input);
        let header: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        if header.is_empty() || (header.len() == 1 && header[0].is_empty()) {
            return Err(TabalignError::invalid_input(format!(
                "{} has no header row",
                path.display()
            )));
        }
        if header.len() == 1 && (header[0].contains(',') || header[0].contains('\t')) {
            log::warn!(
                "Suspicious header in {} (wrong separator?): {:?}",
                path.display(),
                header[0]
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            header,
            record: StringRecord::new(),
            rows_read: 0,
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Line number of the row most recently returned
    pub fn line(&self) -> u64 {
        self.record
            .position()
            .map(|p| p.line())
            .unwrap_or(self.rows_read + 1)
    }

    /// Read the next row; a row whose width differs from the header is fatal.
    pub fn next_row(&mut self) -> Result<Option<Vec<String>>> {
        if !self.reader.read_record(&mut self.record)? {
            return Ok(None);
        }
        self.rows_read += 1;
        if self.record.len() != self.header.len() {
            return Err(TabalignError::RaggedRow {
                path: self.path.clone(),
                line: self.line(),
                expected: self.header.len(),
                found: self.record.len(),
            });
        }
        Ok(Some(self.record.iter().map(str::to_string).collect()))
    }
}

/// Row writer for files or stdout
pub struct RowSink {
    writer: csv::Writer<Box<dyn Write>>,
    rows_written: u64,
}

impl RowSink {
    pub fn create(path: &Path) -> Result<Self> {
        let output: Box<dyn Write> = if path.as_os_str() == STDIO_PATH {
            Box::new(io::stdout())
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Cannot create directory {}", parent.display()))?;
                }
            }
            let file = File::create(path)
                .with_context(|| format!("Cannot create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        };
        Ok(Self::from_writer(Dialect::for_path(path), output))
    }

    pub fn from_writer(dialect: Dialect, output: Box<dyn Write>) -> Self {
        Self {
            writer: dialect.writer_builder().from_writer(output),
            rows_written: 0,
        }
    }

    pub fn write_header(&mut self, header: &[String]) -> Result<()> {
        self.writer.write_record(header)?;
        Ok(())
    }

    pub fn write_row<I, T>(&mut self, row: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer.write_record(row)?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        Ok(self.rows_written)
    }
}

/// A fully materialized snapshot with a unique, non-missing primary key
#[derive(Debug, Clone)]
pub struct Table {
    pub source: PathBuf,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pk_pos: usize,
    by_key: IndexMap<String, usize>,
}

impl Table {
    /// Load and validate a table from a file (or `-` for stdin)
    pub fn load(path: &Path, primary_key: &str) -> Result<Self> {
        let mut source = RowSource::open(path)?;
        let header = source.header().to_vec();
        let pk_pos = column_position(&header, primary_key)
            .ok_or_else(|| TabalignError::missing_column(path, primary_key))?;

        let mut rows = Vec::new();
        let mut by_key = IndexMap::new();
        while let Some(row) = source.next_row()? {
            let line = source.line();
            Self::admit(path, &mut by_key, &row, pk_pos, rows.len(), line)?;
            rows.push(row);
        }

        log::info!(
            "Read {} rows, {} columns from {}",
            rows.len(),
            header.len(),
            path.display()
        );

        Ok(Self {
            source: path.to_path_buf(),
            header,
            rows,
            pk_pos,
            by_key,
        })
    }

    /// Build a table from in-memory rows with the same validation as `load`
    pub fn from_rows(
        name: &str,
        header: Vec<String>,
        rows: Vec<Vec<String>>,
        primary_key: &str,
    ) -> Result<Self> {
        let path = PathBuf::from(name);
        let pk_pos = column_position(&header, primary_key)
            .ok_or_else(|| TabalignError::missing_column(&path, primary_key))?;

        let mut by_key = IndexMap::new();
        for (index, row) in rows.iter().enumerate() {
            let line = index as u64 + 2;
            if row.len() != header.len() {
                return Err(TabalignError::RaggedRow {
                    path,
                    line,
                    expected: header.len(),
                    found: row.len(),
                });
            }
            Self::admit(&path, &mut by_key, row, pk_pos, index, line)?;
        }

        Ok(Self {
            source: path,
            header,
            rows,
            pk_pos,
            by_key,
        })
    }

    fn admit(
        path: &Path,
        by_key: &mut IndexMap<String, usize>,
        row: &[String],
        pk_pos: usize,
        index: usize,
        line: u64,
    ) -> Result<()> {
        let key = &row[pk_pos];
        if is_missing(key) {
            return Err(TabalignError::MissingKey {
                path: path.to_path_buf(),
                line,
            });
        }
        if by_key.insert(key.clone(), index).is_some() {
            return Err(TabalignError::DuplicateKey {
                path: path.to_path_buf(),
                key: key.clone(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn primary_key_position(&self) -> usize {
        self.pk_pos
    }

    pub fn primary_key_column(&self) -> &str {
        &self.header[self.pk_pos]
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        column_position(&self.header, name)
    }

    /// Primary key of the row at `index`
    pub fn key(&self, index: usize) -> &str {
        &self.rows[index][self.pk_pos]
    }

    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Present value of a cell, `None` when missing
    pub fn value(&self, index: usize, column: usize) -> Option<&str> {
        let value = self.rows[index][column].as_str();
        if is_missing(value) {
            None
        } else {
            Some(value)
        }
    }

    /// Write the table with its header
    pub fn write(&self, path: &Path) -> Result<u64> {
        let mut sink = RowSink::create(path)?;
        sink.write_header(&self.header)?;
        for row in &self.rows {
            sink.write_row(row)?;
        }
        sink.finish()
    }
}

/// Find a column by exact name
pub fn column_position(header: &[String], name: &str) -> Option<usize> {
    header.iter().position(|h| h == name)
}
