//! Combination execution.
//!
//! Runs every planned combination through configure, compile and test, one
//! at a time. The first failing external operation stops the run (fail-stop).
//! Each combination's build directory is removed afterwards whether or not it
//! succeeded, so an aborted run leaves at most the output directory behind.

mod types;

use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::plan::{Plan, PlannedCombination};
use crate::report::RunState;
use crate::toolchain::{BuildTool, ConfigureRequest, TestPlan, ToolError, Toolchain};
use crate::workspace::{self, WorkspaceError, build_dir_path, fresh_build_dir, prepare_root};

pub use types::{Phase, PipelineError, Position, Progress};

/// Removes a combination's build directory.
pub type CleanupFn = fn(&Path) -> Result<(), WorkspaceError>;

pub struct Pipeline<'a, T, P> {
  tool: &'a T,
  config: &'a RunConfig,
  progress: P,
  cleanup: CleanupFn,
}

impl<'a, T: BuildTool, P: Progress> Pipeline<'a, T, P> {
  pub fn new(tool: &'a T, config: &'a RunConfig, progress: P) -> Self {
    Self {
      tool,
      config,
      progress,
      cleanup: workspace::cleanup,
    }
  }

  /// Replace the per-combination build directory removal.
  pub fn with_cleanup(mut self, cleanup: CleanupFn) -> Self {
    self.cleanup = cleanup;
    self
  }

  pub fn into_progress(self) -> P {
    self.progress
  }

  /// Execute `plan`, recording progress in `state`.
  ///
  /// In list-only mode the combinations are only reported. In dry-run mode
  /// the filesystem is left untouched and the tool is expected not to spawn
  /// anything.
  pub async fn run(&mut self, plan: &Plan, state: &mut RunState) -> Result<(), PipelineError> {
    let total = plan.len();
    self.progress.run_started(total);

    if self.config.list_only {
      for (idx, combination) in plan.combinations.iter().enumerate() {
        self.progress.combination_listed(Position {
          ordinal: idx + 1,
          total,
          combination,
        });
      }
      return Ok(());
    }

    if !self.config.dry_run {
      prepare_root(&self.config.build_root)?;
      prepare_root(&self.config.output_dir)?;
    }

    if plan.is_empty() {
      info!("no combinations selected");
      return Ok(());
    }

    let toolchain = self.resolve_toolchain().await;

    for combination in &plan.combinations {
      self.run_combination(combination, total, &toolchain, state).await?;
    }

    info!(succeeded = state.succeeded(), "all combinations built and tested");
    Ok(())
  }

  async fn resolve_toolchain(&self) -> Toolchain {
    let toolchain = match self.tool.toolchain_id().await {
      Ok(id) => Toolchain::from_compiler_id(&id),
      Err(e) => {
        warn!(error = %e, "could not identify toolchain");
        Toolchain::Unrecognized(String::new())
      }
    };

    match &toolchain {
      Toolchain::Unrecognized(id) => warn!(toolchain = %id, "unknown compiler, test phases will be skipped"),
      _ => info!(toolchain = %toolchain, "identified toolchain"),
    }
    toolchain
  }

  async fn run_combination(
    &mut self,
    combination: &PlannedCombination,
    total: usize,
    toolchain: &Toolchain,
    state: &mut RunState,
  ) -> Result<(), PipelineError> {
    let ordinal = state.record_attempt();
    let position = Position {
      ordinal,
      total,
      combination,
    };
    let suffix = combination.suffix.as_str();

    info!(suffix = %suffix, ordinal, total, "starting combination");
    self.progress.combination_started(position);

    let build_dir = if self.config.dry_run {
      build_dir_path(&self.config.build_root, suffix)
    } else {
      fresh_build_dir(&self.config.build_root, suffix)?
    };

    let mut elapsed = Duration::ZERO;
    let outcome = self
      .build_and_test(position, &build_dir, toolchain, state, &mut elapsed)
      .await;

    // Cleaning runs after failures too, before the error propagates.
    self.progress.phase_started(position, Phase::Cleaning);
    let started = Instant::now();
    let cleanup = if self.config.dry_run {
      Ok(())
    } else {
      (self.cleanup)(&build_dir)
    };
    let took = started.elapsed();
    elapsed += took;
    match &cleanup {
      Ok(()) => self.progress.phase_finished(position, Phase::Cleaning, took),
      Err(e) => {
        warn!(suffix = %suffix, path = %build_dir.display(), error = %e, "failed to remove build directory");
        state.record_cleanup_warning();
        self.progress.cleanup_failed(position, e);
      }
    }

    let final_phase = match &outcome {
      Ok(()) => {
        state.record_success();
        Phase::Done
      }
      Err(_) => Phase::Failed,
    };
    debug!(suffix = %suffix, phase = %final_phase, "combination finished");
    self
      .progress
      .combination_finished(position, final_phase, elapsed, state.elapsed());

    outcome
  }

  async fn build_and_test(
    &mut self,
    position: Position<'_>,
    build_dir: &Path,
    toolchain: &Toolchain,
    state: &mut RunState,
    elapsed: &mut Duration,
  ) -> Result<(), PipelineError> {
    let tool = self.tool;
    let config = self.config;

    let request = ConfigureRequest {
      source_dir: &config.source_dir,
      build_dir,
      output_dir: &config.output_dir,
      mode: config.mode,
      feature_args: &position.combination.arguments,
      extra_defines: &config.extra_defines,
    };
    self
      .phase(position, Phase::Configuring, elapsed, tool.configure(&request))
      .await?;

    self
      .phase(
        position,
        Phase::Building,
        elapsed,
        tool.compile(build_dir, config.mode, config.jobs),
      )
      .await?;

    match toolchain.test_plan(config.mode) {
      TestPlan::Run { config: test_config } => {
        self
          .phase(position, Phase::Testing, elapsed, tool.test(build_dir, test_config))
          .await?;
      }
      TestPlan::Skip => {
        warn!(suffix = %position.combination.suffix, toolchain = %toolchain, "unknown compiler, skipping tests");
        state.record_tests_skipped();
        self.progress.tests_skipped(position, toolchain);
      }
    }

    Ok(())
  }

  async fn phase<F>(
    &mut self,
    position: Position<'_>,
    phase: Phase,
    elapsed: &mut Duration,
    operation: F,
  ) -> Result<(), PipelineError>
  where
    F: Future<Output = Result<(), ToolError>>,
  {
    let suffix = &position.combination.suffix;
    debug!(suffix = %suffix, phase = %phase, "entering phase");
    self.progress.phase_started(position, phase);

    let started = Instant::now();
    let result = operation.await;
    let took = started.elapsed();
    *elapsed += took;

    match result {
      Ok(()) => {
        self.progress.phase_finished(position, phase, took);
        Ok(())
      }
      Err(source) => {
        error!(suffix = %suffix, phase = %phase, error = %source, "phase failed");
        self.progress.phase_failed(position, phase, took);
        Err(PipelineError::Phase {
          suffix: suffix.clone(),
          phase,
          source,
        })
      }
    }
  }
}
