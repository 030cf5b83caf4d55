//! Unit tests for CLI argument parsing and validation

use clap::Parser;
use std::path::PathBuf;
use tabalign::cli::{Cli, Commands};
use tabalign::commands::RunOptions;
use tabalign::score::ScoreMode;

#[test]
fn test_cli_init_command() {
    let cli = Cli::try_parse_from(["tabalign", "init"]).unwrap();
    match cli.command {
        Commands::Init { force } => assert!(!force),
        _ => panic!("Expected Init command"),
    }
}

#[test]
fn test_cli_init_command_with_force() {
    let cli = Cli::try_parse_from(["tabalign", "init", "--force"]).unwrap();
    match cli.command {
        Commands::Init { force } => assert!(force),
        _ => panic!("Expected Init command"),
    }
}

#[test]
fn test_cli_diff_defaults_to_stdout() {
    let cli = Cli::try_parse_from(["tabalign", "diff", "old.csv", "new.csv"]).unwrap();
    match cli.command {
        Commands::Diff {
            old,
            new,
            output,
            report,
        } => {
            assert_eq!(old, PathBuf::from("old.csv"));
            assert_eq!(new, PathBuf::from("new.csv"));
            assert_eq!(output, PathBuf::from("-"));
            assert!(report.is_none());
        }
        _ => panic!("Expected Diff command"),
    }
}

#[test]
fn test_cli_diff_with_options() {
    let cli = Cli::try_parse_from([
        "tabalign",
        "diff",
        "old.tsv",
        "new.tsv",
        "--output",
        "delta.tsv",
        "--report",
        "report.json",
        "--threshold",
        "250",
        "--bucket-limit",
        "20",
    ])
    .unwrap();

    assert_eq!(cli.overrides.threshold, Some(250));
    assert_eq!(cli.overrides.bucket_limit, Some(20));
    match cli.command {
        Commands::Diff { output, report, .. } => {
            assert_eq!(output, PathBuf::from("delta.tsv"));
            assert_eq!(report, Some(PathBuf::from("report.json")));
        }
        _ => panic!("Expected Diff command"),
    }
}

#[test]
fn test_cli_apply_requires_delta() {
    assert!(Cli::try_parse_from(["tabalign", "apply", "old.csv"]).is_err());

    let cli = Cli::try_parse_from(["tabalign", "apply", "old.csv", "--delta", "d.csv", "-o", "new.csv"])
        .unwrap();
    match cli.command {
        Commands::Apply {
            old_state,
            delta,
            output,
            report,
        } => {
            assert_eq!(old_state, PathBuf::from("old.csv"));
            assert_eq!(delta, PathBuf::from("d.csv"));
            assert_eq!(output, PathBuf::from("new.csv"));
            assert!(report.is_none());
        }
        _ => panic!("Expected Apply command"),
    }
}

#[test]
fn test_cli_match_and_sort() {
    let cli = Cli::try_parse_from(["tabalign", "match", "a.csv", "b.csv"]).unwrap();
    assert!(matches!(cli.command, Commands::Match { .. }));

    let cli = Cli::try_parse_from(["tabalign", "sort", "a.csv", "--output", "sorted.csv"]).unwrap();
    match cli.command {
        Commands::Sort { input, output } => {
            assert_eq!(input, PathBuf::from("a.csv"));
            assert_eq!(output, PathBuf::from("sorted.csv"));
        }
        _ => panic!("Expected Sort command"),
    }
}

#[test]
fn test_cli_global_flags() {
    let cli = Cli::try_parse_from([
        "tabalign",
        "sort",
        "a.csv",
        "--verbose",
        "--config",
        "custom.json",
        "--pk",
        "id",
    ])
    .unwrap();
    assert!(cli.verbose);
    assert!(!cli.quiet);
    assert_eq!(cli.config, Some(PathBuf::from("custom.json")));
    assert_eq!(cli.overrides.pk.as_deref(), Some("id"));
}

#[test]
fn test_cli_quiet_conflicts_with_verbose() {
    assert!(Cli::try_parse_from(["tabalign", "init", "--quiet", "--verbose"]).is_err());
}

#[test]
fn test_cli_invalid_bucket_limit() {
    let result = Cli::try_parse_from(["tabalign", "diff", "a.csv", "b.csv", "--bucket-limit", "0"]);
    assert!(result.is_err());

    let result = Cli::try_parse_from(["tabalign", "diff", "a.csv", "b.csv", "--bucket-limit", "x"]);
    assert!(result.is_err());
}

#[test]
fn test_cli_score_mode() {
    let cli = Cli::try_parse_from(["tabalign", "diff", "a.csv", "b.csv", "--score", "agreement"]).unwrap();
    assert_eq!(cli.overrides.score, Some(ScoreMode::Agreement));

    assert!(Cli::try_parse_from(["tabalign", "diff", "a.csv", "b.csv", "--score", "fuzzy"]).is_err());
}

#[test]
fn test_cli_column_lists() {
    let cli = Cli::try_parse_from([
        "tabalign",
        "diff",
        "a.csv",
        "b.csv",
        "--index",
        "EOLid,scientificName",
        "--managed",
        "scientificName,taxonRank",
    ])
    .unwrap();

    let options = RunOptions::from_cli(&cli);
    assert_eq!(
        options.overrides.indexed_columns,
        Some(vec!["EOLid".to_string(), "scientificName".to_string()])
    );
    assert_eq!(
        options.overrides.managed_columns,
        Some(vec!["scientificName".to_string(), "taxonRank".to_string()])
    );
}

#[test]
fn test_cli_missing_arguments() {
    assert!(Cli::try_parse_from(["tabalign", "diff", "old.csv"]).is_err());
    assert!(Cli::try_parse_from(["tabalign", "sort"]).is_err());
    assert!(Cli::try_parse_from(["tabalign", "unknown"]).is_err());
}
