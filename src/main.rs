//! Main entry point for tabalign CLI

use clap::Parser;
use tabalign::cli::Cli;
use tabalign::commands::{execute_command, RunOptions};

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else if cli.quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let options = RunOptions::from_cli(&cli);
    if let Err(e) = execute_command(cli.command, &options) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
