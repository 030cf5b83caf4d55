//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Row counters for long-running stages, drawn on stderr
#[derive(Debug)]
pub struct ProgressReporter {
    stage_pb: Option<ProgressBar>,
    show_progress: bool,
    start_time: std::time::Instant,
}

impl ProgressReporter {
    /// Create a reporter; nothing is drawn unless stderr is a terminal
    pub fn new() -> Self {
        Self {
            stage_pb: None,
            show_progress: !ProgressDrawTarget::stderr().is_hidden(),
            start_time: std::time::Instant::now(),
        }
    }

    /// Create minimal progress reporter (no progress bars)
    pub fn new_minimal() -> Self {
        Self {
            stage_pb: None,
            show_progress: false,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.show_progress
    }

    /// Begin a stage; a known total gets a bar, otherwise a spinner
    pub fn start_stage(&mut self, message: &str, total: Option<u64>) {
        self.clear_stage();
        if !self.show_progress {
            return;
        }
        let pb = match total {
            Some(total) => create_progress_bar(total, message),
            None => create_spinner(message),
        };
        self.stage_pb = Some(pb);
    }

    /// Advance the current stage
    pub fn inc(&self, delta: u64) {
        if let Some(pb) = &self.stage_pb {
            pb.inc(delta);
        }
    }

    /// Finish the current stage, leaving its message on screen
    pub fn finish_stage(&mut self, message: &str) {
        if let Some(pb) = self.stage_pb.take() {
            pb.finish_with_message(message.to_string());
        }
        log::debug!("{} ({:.2?} elapsed)", message, self.start_time.elapsed());
    }

    fn clear_stage(&mut self) {
        if let Some(pb) = self.stage_pb.take() {
            pb.finish_and_clear();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.clear_stage();
    }
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.green} {msg} {pos} rows")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Create a progress bar with known total
fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} ({per_sec}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}
