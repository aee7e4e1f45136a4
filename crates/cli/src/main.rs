mod output;
mod progress;
mod run;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use featmatrix_lib::combination::BuildMode;
use featmatrix_lib::consts::DEFAULT_OUTPUT_VAR;

use crate::output::print_error;
use crate::run::RunArgs;

/// featmatrix - build and test every valid combination of a project's feature switches
#[derive(Parser)]
#[command(name = "featmatrix")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Example: featmatrix -S . -B _tests -C Debug rf __EMPTY__")]
struct Cli {
  /// Suffix filters such as 'rfm'; '__EMPTY__' or '""' selects the all-off combination
  filters: Vec<String>,

  /// Project source directory
  #[arg(short = 'S', long, value_name = "DIR", default_value = ".")]
  path_to_source: PathBuf,

  /// Root under which per-combination build directories are created (wiped first)
  #[arg(short = 'B', long, value_name = "DIR", default_value = "_tests")]
  path_to_build: PathBuf,

  /// Output directory for built artifacts, relative to the build root (wiped first)
  #[arg(short = 'T', long, value_name = "DIR", default_value = "bin")]
  path_to_result: PathBuf,

  /// Build configuration: Release or Debug
  #[arg(short = 'C', long, value_name = "CONFIG", default_value = "Release")]
  build_config: BuildMode,

  /// Extra cache definition passed to every configure step (repeatable)
  #[arg(short = 'D', value_name = "VAR[:TYPE]=VALUE")]
  define: Vec<String>,

  /// JSON file with the option registry (default: built-in registry)
  #[arg(long, value_name = "FILE")]
  options: Option<PathBuf>,

  /// Cache variable that receives the output directory
  #[arg(long, value_name = "NAME", default_value = DEFAULT_OUTPUT_VAR)]
  output_var: String,

  /// CMake executable
  #[arg(long, value_name = "PROGRAM", default_value = "cmake")]
  cmake: String,

  /// CTest executable
  #[arg(long, value_name = "PROGRAM", default_value = "ctest")]
  ctest: String,

  /// Print the selected combinations and stop
  #[arg(long)]
  list_only: bool,

  /// Print the commands without running them
  #[arg(long)]
  dry_run: bool,

  /// Write the run summary as JSON to this file
  #[arg(long, value_name = "FILE")]
  summary_json: Option<PathBuf>,

  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,
}

impl From<Cli> for RunArgs {
  fn from(cli: Cli) -> Self {
    RunArgs {
      source: cli.path_to_source,
      build: cli.path_to_build,
      output: cli.path_to_result,
      mode: cli.build_config,
      filters: cli.filters,
      defines: cli.define,
      registry_file: cli.options,
      output_var: cli.output_var,
      cmake: cli.cmake,
      ctest: cli.ctest,
      list_only: cli.list_only,
      dry_run: cli.dry_run,
      summary_json: cli.summary_json,
    }
  }
}

fn main() {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(e) = run::cmd_run(cli.into()) {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}
