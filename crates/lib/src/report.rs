//! Run accounting and summary.
//!
//! [`RunState`] is the only mutable state of a run. The pipeline updates it as
//! combinations complete; [`RunState::finish`] freezes it into a
//! [`RunSummary`] for the final report.

use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};

use serde::Serialize;

use crate::combination::BuildMode;
use crate::config::RunConfig;
use crate::plan::Plan;

#[derive(Debug)]
pub struct RunState {
  started: Instant,
  started_at: SystemTime,
  enumerated: usize,
  total: usize,
  skipped_dependency: usize,
  skipped_filter: usize,
  attempted: usize,
  succeeded: usize,
  tests_skipped: usize,
  cleanup_warnings: usize,
  mode: BuildMode,
  list_only: bool,
  dry_run: bool,
  source_dir: PathBuf,
  build_root: PathBuf,
  output_dir: PathBuf,
}

impl RunState {
  pub fn new(config: &RunConfig, plan: &Plan) -> Self {
    Self {
      started: Instant::now(),
      started_at: SystemTime::now(),
      enumerated: plan.enumerated,
      total: plan.len(),
      skipped_dependency: plan.skipped_dependency,
      skipped_filter: plan.skipped_filter,
      attempted: 0,
      succeeded: 0,
      tests_skipped: 0,
      cleanup_warnings: 0,
      mode: config.mode,
      list_only: config.list_only,
      dry_run: config.dry_run,
      source_dir: config.source_dir.clone(),
      build_root: config.build_root.clone(),
      output_dir: config.output_dir.clone(),
    }
  }

  pub fn started_at(&self) -> SystemTime {
    self.started_at
  }

  pub fn elapsed(&self) -> Duration {
    self.started.elapsed()
  }

  pub fn total(&self) -> usize {
    self.total
  }

  pub fn attempted(&self) -> usize {
    self.attempted
  }

  pub fn succeeded(&self) -> usize {
    self.succeeded
  }

  /// Count a new attempt and return its 1-based ordinal.
  pub fn record_attempt(&mut self) -> usize {
    self.attempted += 1;
    self.attempted
  }

  pub fn record_success(&mut self) {
    self.succeeded += 1;
  }

  pub fn record_tests_skipped(&mut self) {
    self.tests_skipped += 1;
  }

  pub fn record_cleanup_warning(&mut self) {
    self.cleanup_warnings += 1;
  }

  /// Freeze the state. `failure` is the cause of a fail-stop abort, if any.
  pub fn finish(self, failure: Option<String>) -> RunSummary {
    let elapsed = self.started.elapsed();
    RunSummary {
      enumerated: self.enumerated,
      total: self.total,
      skipped_dependency: self.skipped_dependency,
      skipped_filter: self.skipped_filter,
      attempted: self.attempted,
      succeeded: self.succeeded,
      tests_skipped: self.tests_skipped,
      cleanup_warnings: self.cleanup_warnings,
      mode: self.mode,
      list_only: self.list_only,
      dry_run: self.dry_run,
      source_dir: self.source_dir,
      build_root: self.build_root,
      output_dir: self.output_dir,
      elapsed_secs: elapsed.as_secs_f64(),
      elapsed: format_duration(elapsed),
      failure,
    }
  }
}

/// Immutable result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
  pub enumerated: usize,
  pub total: usize,
  pub skipped_dependency: usize,
  pub skipped_filter: usize,
  pub attempted: usize,
  pub succeeded: usize,
  pub tests_skipped: usize,
  pub cleanup_warnings: usize,
  pub mode: BuildMode,
  pub list_only: bool,
  pub dry_run: bool,
  pub source_dir: PathBuf,
  pub build_root: PathBuf,
  pub output_dir: PathBuf,
  pub elapsed_secs: f64,
  pub elapsed: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub failure: Option<String>,
}

impl RunSummary {
  pub fn is_success(&self) -> bool {
    self.failure.is_none()
  }

  /// The closing line of a run. The failure cause is not repeated here.
  pub fn headline(&self) -> String {
    if self.list_only {
      format!("A total of {} combinations.", self.total)
    } else if self.failure.is_some() {
      format!("Stopped after {} of {} combinations.", self.attempted, self.total)
    } else {
      format!(
        "All {} combinations have been successfully assembled and tested.",
        self.succeeded
      )
    }
  }
}

/// Render a duration using the coarsest units that apply.
///
/// `1d 02h 03m`, `1h 02m 03s`, `1m 2.5s`, `0.25s`. The value is rounded to
/// hundredths of a second first; seconds are dropped at day scale.
pub fn format_duration(duration: Duration) -> String {
  let centis = (duration.as_secs_f64() * 100.0).round() as u64;

  let days = centis / (24 * 60 * 60 * 100);
  let hours = centis / (60 * 60 * 100) % 24;
  let minutes = centis / (60 * 100) % 60;
  let secs_centis = centis % (60 * 100);

  if days > 0 {
    format!("{}d {:02}h {:02}m", days, hours, minutes)
  } else if hours > 0 {
    format!("{}h {:02}m {:02}s", hours, minutes, secs_centis / 100)
  } else if minutes > 0 {
    format!("{}m {:.1}s", minutes, secs_centis as f64 / 100.0)
  } else {
    format!("{}.{:02}s", secs_centis / 100, secs_centis % 100)
  }
}
