//! Implementation of the build matrix run.
//!
//! Resolves the run configuration, plans the combinations, drives the
//! pipeline against CMake and prints the banner and summary around it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use featmatrix_lib::combination::BuildMode;
use featmatrix_lib::config::{RunConfig, RunInput};
use featmatrix_lib::pipeline::Pipeline;
use featmatrix_lib::plan::plan;
use featmatrix_lib::report::{RunState, RunSummary};
use featmatrix_lib::toolchain::CmakeTool;
use featmatrix_lib::util::display_path;

use crate::output::{print_error, print_info, print_stat, print_success};
use crate::progress::ConsoleProgress;

/// Parsed command line for one run.
#[derive(Debug)]
pub struct RunArgs {
  pub source: PathBuf,
  pub build: PathBuf,
  pub output: PathBuf,
  pub mode: BuildMode,
  pub filters: Vec<String>,
  pub defines: Vec<String>,
  pub registry_file: Option<PathBuf>,
  pub output_var: String,
  pub cmake: String,
  pub ctest: String,
  pub list_only: bool,
  pub dry_run: bool,
  pub summary_json: Option<PathBuf>,
}

pub fn cmd_run(args: RunArgs) -> Result<()> {
  let cwd = std::env::current_dir().context("Failed to determine the working directory")?;
  let cwd = dunce::canonicalize(&cwd).unwrap_or(cwd);

  let input = RunInput {
    source: args.source,
    build: args.build,
    output: args.output,
    mode: args.mode,
    filters: args.filters,
    extra_defines: args.defines,
    registry_file: args.registry_file,
    list_only: args.list_only,
    dry_run: args.dry_run,
  };
  let config = RunConfig::resolve(input, &cwd).context("Invalid input")?;

  let plan = plan(&config.registry, config.mode, &config.filters, &config.project_name());
  let mut state = RunState::new(&config, &plan);
  debug!(
    enumerated = plan.enumerated,
    selected = plan.len(),
    mode = %config.mode,
    jobs = config.jobs,
    "planned run"
  );

  print_banner(&config, &state, plan.len(), &cwd);

  let tool = CmakeTool::new(&cwd, config.dry_run)
    .with_programs(args.cmake, args.ctest)
    .with_output_var(args.output_var);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let mut pipeline = Pipeline::new(&tool, &config, ConsoleProgress);
  let result = rt.block_on(pipeline.run(&plan, &mut state));

  let summary = state.finish(result.as_ref().err().map(ToString::to_string));
  print_summary(&summary, &cwd);

  if let Some(path) = &args.summary_json {
    write_summary(&summary, path)?;
  }

  result.context("Build matrix stopped")?;
  Ok(())
}

fn print_banner(config: &RunConfig, state: &RunState, total: usize, cwd: &Path) {
  println!(
    "[START ALL] {} combinations: {}",
    total,
    humantime::format_rfc3339_seconds(state.started_at())
  );
  println!("Args: {:?}", std::env::args().skip(1).collect::<Vec<_>>());
  println!("CWD = '{}'", cwd.display());
  println!("Build configuration: {}", config.mode);
  println!("Source directory: '{}'", display_path(&config.source_dir, cwd).display());
  println!("Build directory: '{}'", display_path(&config.build_root, cwd).display());
  println!("Output directory: '{}'", display_path(&config.output_dir, cwd).display());
  if config.dry_run && !config.list_only {
    print_info("Dry run: commands are printed, not executed");
  }
  println!();
}

fn print_summary(summary: &RunSummary, cwd: &Path) {
  if summary.list_only {
    println!("{}", summary.headline());
  } else {
    println!();
    if summary.is_success() {
      print_success(&summary.headline());
    } else {
      print_error(&summary.headline());
    }

    print_stat("Enumerated", &summary.enumerated.to_string());
    print_stat("Skipped (dependency)", &summary.skipped_dependency.to_string());
    print_stat("Skipped (filter)", &summary.skipped_filter.to_string());
    print_stat("Succeeded", &format!("{}/{}", summary.succeeded, summary.total));
    if summary.tests_skipped > 0 {
      print_stat("Test phases skipped", &summary.tests_skipped.to_string());
    }
    if summary.cleanup_warnings > 0 {
      print_stat("Cleanup warnings", &summary.cleanup_warnings.to_string());
    }
  }

  println!();
  println!("Reminder:");
  println!("  Build configuration: {}", summary.mode);
  println!("  Source directory: '{}'", display_path(&summary.source_dir, cwd).display());
  println!("  Build directory: '{}'", display_path(&summary.build_root, cwd).display());
  println!("  Output directory: '{}'", display_path(&summary.output_dir, cwd).display());
  println!();
  println!("[FINISH ALL] [Elapsed: {}].", summary.elapsed);
}

fn write_summary(summary: &RunSummary, path: &Path) -> Result<()> {
  let json = serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?;
  fs::write(path, json).with_context(|| format!("Failed to write run summary: {}", path.display()))?;
  Ok(())
}
