//! Common test utilities and helpers

use std::fs;
use std::path::{Path, PathBuf};
use tabalign::table::RowSource;
use tabalign::Result;
use tempfile::TempDir;

/// Test fixture manager for creating temporary test environments
pub struct TestFixture {
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    /// Get the root path of the test fixture
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root().join(name)
    }

    /// Create a table file; the separator follows the file name
    pub fn create_table(&self, name: &str, data: &[Vec<&str>]) -> Result<PathBuf> {
        let separator = if name.contains(".csv") { "," } else { "\t" };
        let mut content = String::new();
        for row in data {
            content.push_str(&row.join(separator));
            content.push('\n');
        }
        self.create_raw(name, &content)
    }

    /// Create a file with raw string content
    pub fn create_raw(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).expect("Should be able to read output")
    }

    /// Header and rows of a table file
    pub fn read_table(&self, name: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
        read_table(&self.path(name))
    }
}

pub fn read_table(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut source = RowSource::open(path)?;
    let header = source.header().to_vec();
    let mut rows = Vec::new();
    while let Some(row) = source.next_row()? {
        rows.push(row);
    }
    Ok((header, rows))
}

/// Rows re-laid in `header` order and sorted, for order-insensitive comparison
pub fn normalized(
    table: &(Vec<String>, Vec<Vec<String>>),
    header: &[String],
) -> Vec<Vec<String>> {
    let positions: Vec<usize> = header
        .iter()
        .map(|name| {
            table
                .0
                .iter()
                .position(|h| h == name)
                .unwrap_or_else(|| panic!("Column '{}' missing", name))
        })
        .collect();
    let mut rows: Vec<Vec<String>> = table
        .1
        .iter()
        .map(|row| positions.iter().map(|&p| row[p].clone()).collect())
        .collect();
    rows.sort();
    rows
}

/// Helper for running CLI commands in tests
pub struct CliTestRunner {
    fixture: TestFixture,
}

impl CliTestRunner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fixture: TestFixture::new()?,
        })
    }

    pub fn fixture(&self) -> &TestFixture {
        &self.fixture
    }

    /// Run a tabalign command with the fixture root as working directory
    pub fn run_command(&self, args: &[&str]) -> Result<()> {
        use clap::Parser;
        use tabalign::cli::Cli;
        use tabalign::commands::{execute_command, RunOptions};

        let mut cmd_args = vec!["tabalign"];
        cmd_args.extend(args);

        let cli = Cli::try_parse_from(cmd_args)
            .map_err(|e| tabalign::TabalignError::invalid_input(e.to_string()))?;

        let mut options = RunOptions::from_cli(&cli);
        options.working_dir = Some(self.fixture.root().to_path_buf());
        execute_command(cli.command, &options)
    }

    /// Run a command and expect it to succeed
    pub fn expect_success(&self, args: &[&str]) {
        self.run_command(args).expect("Command should succeed");
    }

    /// Run a command and expect it to fail
    pub fn expect_failure(&self, args: &[&str]) -> tabalign::TabalignError {
        self.run_command(args).expect_err("Command should fail")
    }

    /// Absolute path of a fixture file as an argument
    pub fn arg(&self, name: &str) -> String {
        self.fixture.path(name).display().to_string()
    }
}

/// Sample checklists for testing
pub mod sample_data {
    pub const HEADER: [&str; 6] = [
        "taxonID",
        "EOLid",
        "scientificName",
        "canonicalName",
        "parentNameUsageID",
        "taxonRank",
    ];

    pub fn old_checklist() -> Vec<Vec<&'static str>> {
        vec![
            HEADER.to_vec(),
            vec!["1", "100", "Felidae Fischer 1817", "Felidae", "", "family"],
            vec!["2", "101", "Felis catus Linnaeus 1758", "Felis catus", "1", "species"],
            vec!["3", "", "Panthera leo (Linnaeus 1758)", "Panthera leo", "1", "species"],
            vec!["4", "103", "Lynx lynx (Linnaeus 1758)", "Lynx lynx", "1", "species"],
        ]
    }

    /// Record 1 unchanged, 2 re-ranked, 3 re-keyed as 30, 4 gone, 5 new
    pub fn new_checklist() -> Vec<Vec<&'static str>> {
        vec![
            HEADER.to_vec(),
            vec!["1", "100", "Felidae Fischer 1817", "Felidae", "", "family"],
            vec!["2", "101", "Felis catus Linnaeus 1758", "Felis catus", "1", "subspecies"],
            vec!["30", "", "Panthera leo (Linnaeus 1758)", "Panthera leo", "1", "species"],
            vec!["5", "", "Puma concolor (Linnaeus 1771)", "Puma concolor", "1", "species"],
        ]
    }

    pub const EXPECTED_DELTA: &str = "\
mode,taxonID,new_pk,EOLid,scientificName,canonicalName,parentNameUsageID,taxonRank
update,2,2,101,Felis catus Linnaeus 1758,Felis catus,1,subspecies
update,3,30,,Panthera leo (Linnaeus 1758),Panthera leo,1,species
remove,4,4,103,Lynx lynx (Linnaeus 1758),Lynx lynx,1,species
add,5,5,,Puma concolor (Linnaeus 1771),Puma concolor,1,species
";
}

/// Assertion helpers for test validation
pub mod assertions {
    use std::path::Path;
    use tabalign::Result;

    /// Assert that a file exists and is not empty
    pub fn assert_file_exists_and_not_empty(path: &Path) {
        assert!(path.exists(), "File should exist: {}", path.display());
        let metadata = std::fs::metadata(path).expect("Should be able to read file metadata");
        assert!(metadata.len() > 0, "File should not be empty: {}", path.display());
    }

    /// Assert that a JSON file contains expected keys
    pub fn assert_json_contains_keys(path: &Path, keys: &[&str]) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let json: serde_json::Value = serde_json::from_str(&content)?;

        for key in keys {
            assert!(
                json.get(key).is_some(),
                "JSON should contain key '{}': {}",
                key,
                path.display()
            );
        }

        Ok(())
    }
}
