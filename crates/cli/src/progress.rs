//! Console rendering of pipeline progress.

use std::time::{Duration, SystemTime};

use featmatrix_lib::pipeline::{Phase, Position, Progress};
use featmatrix_lib::report::format_duration;
use featmatrix_lib::toolchain::Toolchain;
use featmatrix_lib::workspace::WorkspaceError;

use crate::output::{print_warning, rule};

/// Prints the `[START]`/`[FINISH]` frame around each combination.
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl Progress for ConsoleProgress {
  fn combination_listed(&mut self, position: Position<'_>) {
    println!("{}", position.combination.label);
  }

  fn combination_started(&mut self, position: Position<'_>) {
    println!("{}", rule());
    println!(
      "[START] {}/{} {}: {}",
      position.ordinal,
      position.total,
      position.combination.label,
      humantime::format_rfc3339_seconds(SystemTime::now())
    );
    println!();
  }

  fn phase_started(&mut self, position: Position<'_>, phase: Phase) {
    if phase != Phase::Cleaning {
      println!("{} {}/{}:", phase.title(), position.ordinal, position.total);
    }
  }

  fn phase_finished(&mut self, _position: Position<'_>, phase: Phase, elapsed: Duration) {
    if phase != Phase::Cleaning {
      println!("{} - done [{}]", phase.title(), format_duration(elapsed));
      println!();
    }
  }

  fn phase_failed(&mut self, _position: Position<'_>, phase: Phase, elapsed: Duration) {
    println!("{} - FAILED [{}]", phase.title(), format_duration(elapsed));
    println!();
  }

  fn tests_skipped(&mut self, _position: Position<'_>, toolchain: &Toolchain) {
    print_warning(&format!("Unknown compiler '{}', skipping tests.", toolchain));
    println!();
  }

  fn cleanup_failed(&mut self, position: Position<'_>, error: &WorkspaceError) {
    print_warning(&format!(
      "Could not remove the build directory of {}: {}",
      position.combination.label, error
    ));
  }

  fn combination_finished(&mut self, position: Position<'_>, outcome: Phase, elapsed: Duration, run_elapsed: Duration) {
    let tag = if outcome == Phase::Done { "FINISH" } else { "FAILED" };
    println!(
      "[{}] {}/{}: {} [Elapsed: {} (all: {})]",
      tag,
      position.ordinal,
      position.total,
      position.combination.label,
      format_duration(elapsed),
      format_duration(run_elapsed)
    );
    println!("{}", rule());
    println!();
  }
}
