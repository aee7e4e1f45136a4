//! Types for combination execution.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::plan::PlannedCombination;
use crate::toolchain::{ToolError, Toolchain};
use crate::workspace::WorkspaceError;

/// Lifecycle of one combination.
///
/// `Pending → Configuring → Building → Testing → Cleaning → Done`, with
/// `Failed` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
  Pending,
  Configuring,
  Building,
  Testing,
  Cleaning,
  Done,
  Failed,
}

impl Phase {
  pub fn is_terminal(self) -> bool {
    matches!(self, Phase::Done | Phase::Failed)
  }

  /// Human name used in progress output.
  pub fn title(self) -> &'static str {
    match self {
      Phase::Pending => "Pending",
      Phase::Configuring => "Configuration",
      Phase::Building => "Build",
      Phase::Testing => "Test",
      Phase::Cleaning => "Cleanup",
      Phase::Done => "Done",
      Phase::Failed => "Failed",
    }
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Phase::Pending => "pending",
      Phase::Configuring => "configure",
      Phase::Building => "build",
      Phase::Testing => "test",
      Phase::Cleaning => "cleanup",
      Phase::Done => "done",
      Phase::Failed => "failed",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Error)]
pub enum PipelineError {
  /// An external operation failed; the run stops here.
  #[error("{phase} failed for combination '{suffix}': {source}")]
  Phase {
    suffix: String,
    phase: Phase,
    #[source]
    source: ToolError,
  },

  #[error(transparent)]
  Workspace(#[from] WorkspaceError),
}

/// Where a combination is in its progress, for progress output.
#[derive(Debug, Clone, Copy)]
pub struct Position<'a> {
  /// 1-based.
  pub ordinal: usize,
  pub total: usize,
  pub combination: &'a PlannedCombination,
}

/// Observer of pipeline progress.
///
/// All methods default to doing nothing.
pub trait Progress {
  fn run_started(&mut self, _total: usize) {}

  fn combination_listed(&mut self, _position: Position<'_>) {}

  fn combination_started(&mut self, _position: Position<'_>) {}

  fn phase_started(&mut self, _position: Position<'_>, _phase: Phase) {}

  fn phase_finished(&mut self, _position: Position<'_>, _phase: Phase, _elapsed: Duration) {}

  /// `phase` returned an error after running for `elapsed`.
  fn phase_failed(&mut self, _position: Position<'_>, _phase: Phase, _elapsed: Duration) {}

  fn tests_skipped(&mut self, _position: Position<'_>, _toolchain: &Toolchain) {}

  fn cleanup_failed(&mut self, _position: Position<'_>, _error: &WorkspaceError) {}

  /// `elapsed` covers this combination, `run_elapsed` the whole run so far.
  fn combination_finished(&mut self, _position: Position<'_>, _outcome: Phase, _elapsed: Duration, _run_elapsed: Duration) {}
}

impl Progress for () {}
