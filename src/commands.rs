//! Command implementations for tabalign CLI

use crate::apply::apply_files;
use crate::cli::{Cli, Commands};
use crate::config::{AlignConfig, ConfigOverrides};
use crate::delta::Emitter;
use crate::error::Result;
use crate::matcher::Matcher;
use crate::progress::ProgressReporter;
use crate::report::{
    alignment_rows, write_alignment, ApplyReport, DiffReport, JsonFormatter, PrettyPrinter,
};
use crate::sort::{first_unsorted, sort_file};
use crate::table::Table;
use std::path::{Path, PathBuf};

/// Settings shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit configuration file
    pub config: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    pub quiet: bool,
    /// Directory used for configuration discovery and `init`; the process
    /// working directory when unset
    pub working_dir: Option<PathBuf>,
}

impl RunOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            config: cli.config.clone(),
            overrides: cli.overrides.to_overrides(),
            quiet: cli.quiet,
            working_dir: None,
        }
    }

    fn resolve_config(&self) -> Result<AlignConfig> {
        AlignConfig::resolve(
            self.config.as_deref(),
            self.working_dir.as_deref(),
            &self.overrides,
        )
    }

    fn progress(&self) -> ProgressReporter {
        if self.quiet {
            ProgressReporter::new_minimal()
        } else {
            ProgressReporter::new()
        }
    }
}

/// Execute a command
pub fn execute_command(command: Commands, options: &RunOptions) -> Result<()> {
    match command {
        Commands::Init { force } => init_command(options, force),
        Commands::Match { old, new, output } => match_command(options, &old, &new, &output),
        Commands::Diff {
            old,
            new,
            output,
            report,
        } => diff_command(options, &old, &new, &output, report.as_deref()),
        Commands::Apply {
            old_state,
            delta,
            output,
            report,
        } => apply_command(options, &old_state, &delta, &output, report.as_deref()),
        Commands::Sort { input, output } => sort_command(options, &input, &output),
    }
}

/// Write a default configuration file
fn init_command(options: &RunOptions, force: bool) -> Result<()> {
    let current_dir = std::env::current_dir()?;
    let dir = options.working_dir.as_deref().unwrap_or(&current_dir);
    let path = AlignConfig::write_default(dir, force)?;
    if !options.quiet {
        eprintln!("✅ Wrote default configuration to: {}", path.display());
    }
    Ok(())
}

fn load_pair(config: &AlignConfig, old: &Path, new: &Path) -> Result<(Table, Table)> {
    let old = Table::load(old, &config.primary_key)?;
    let new = Table::load(new, &config.primary_key)?;
    Ok((old, new))
}

/// Write the per-record classification of an alignment
fn match_command(options: &RunOptions, old: &Path, new: &Path, output: &Path) -> Result<()> {
    let config = options.resolve_config()?;
    let (old, new) = load_pair(&config, old, new)?;
    let mut progress = options.progress();

    let matcher = Matcher::new(&old, &new, &config);
    let alignment = matcher.run(&mut progress);
    let rows = alignment_rows(&old, &new, &alignment);
    let written = write_alignment(&rows, output)?;

    log::info!(
        "Wrote {} alignment rows ({} matches) to {}",
        written,
        alignment.match_count(),
        output.display()
    );
    Ok(())
}

/// Align two snapshots and write the delta
fn diff_command(
    options: &RunOptions,
    old: &Path,
    new: &Path,
    output: &Path,
    report_path: Option<&Path>,
) -> Result<()> {
    let config = options.resolve_config()?;
    let (old, new) = load_pair(&config, old, new)?;
    if let Some(position) = first_unsorted(&old) {
        log::warn!(
            "{} is not sorted by {} (row {}); sort it before applying the delta",
            old.source.display(),
            config.primary_key,
            position + 1
        );
    }

    let mut progress = options.progress();
    let matcher = Matcher::new(&old, &new, &config);
    let alignment = matcher.run(&mut progress);
    let delta = Emitter::new(&old, &new, &alignment, &config).emit();
    delta.write(output)?;

    if report_path.is_none() && options.quiet {
        return Ok(());
    }
    let report = DiffReport::build(&config, &old, &new, &matcher, &alignment, &delta, output)?;
    if let Some(path) = report_path {
        JsonFormatter::write(&report, path)?;
    }
    if !options.quiet {
        PrettyPrinter::print_diff_report(&report);
    }
    Ok(())
}

/// Apply a delta to a sorted old state
fn apply_command(
    options: &RunOptions,
    old_state: &Path,
    delta: &Path,
    output: &Path,
    report_path: Option<&Path>,
) -> Result<()> {
    let mut progress = options.progress();
    let counts = apply_files(old_state, delta, output, &mut progress)?;

    if report_path.is_none() && options.quiet {
        return Ok(());
    }
    let report = ApplyReport::build(old_state, delta, output, &counts)?;
    if let Some(path) = report_path {
        JsonFormatter::write(&report, path)?;
    }
    if !options.quiet {
        PrettyPrinter::print_apply_report(&report);
    }
    Ok(())
}

/// Sort a table by primary key
fn sort_command(options: &RunOptions, input: &Path, output: &Path) -> Result<()> {
    let config = options.resolve_config()?;
    sort_file(input, output, &config.primary_key)?;
    Ok(())
}
