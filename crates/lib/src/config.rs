//! Run configuration.
//!
//! Turns operator input into an immutable [`RunConfig`]: paths resolved and
//! validated, registry loaded, filters parsed. Every "invalid input" error of
//! a run surfaces here, before any filesystem or process activity.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::combination::BuildMode;
use crate::consts::{DEFAULT_JOBS, JOBS_ENV};
use crate::filter::{FilterError, FilterSet};
use crate::registry::{Registry, RegistryError};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("source directory '{0}' does not exist")]
  SourceMissing(PathBuf),

  #[error("source path '{0}' is not a directory")]
  SourceNotDir(PathBuf),

  #[error("{kind} directory '{root}' contains the source directory '{source_dir}' and would be wiped")]
  RootContainsSource {
    kind: &'static str,
    root: PathBuf,
    source_dir: PathBuf,
  },

  #[error(transparent)]
  Registry(#[from] RegistryError),

  #[error(transparent)]
  Filter(#[from] FilterError),
}

/// Operator input, as parsed from the command line.
#[derive(Debug, Clone)]
pub struct RunInput {
  pub source: PathBuf,
  pub build: PathBuf,
  /// Relative paths resolve against the build root.
  pub output: PathBuf,
  pub mode: BuildMode,
  pub filters: Vec<String>,
  pub extra_defines: Vec<String>,
  pub registry_file: Option<PathBuf>,
  pub list_only: bool,
  pub dry_run: bool,
}

impl Default for RunInput {
  fn default() -> Self {
    Self {
      source: PathBuf::from("."),
      build: PathBuf::from("_tests"),
      output: PathBuf::from("bin"),
      mode: BuildMode::Release,
      filters: Vec::new(),
      extra_defines: Vec::new(),
      registry_file: None,
      list_only: false,
      dry_run: false,
    }
  }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
  pub source_dir: PathBuf,
  pub build_root: PathBuf,
  pub output_dir: PathBuf,
  pub mode: BuildMode,
  pub registry: Registry,
  pub filters: FilterSet,
  pub extra_defines: Vec<String>,
  pub list_only: bool,
  /// Print invocations only. Always set when `list_only` is.
  pub dry_run: bool,
  pub jobs: usize,
}

impl RunConfig {
  /// Resolve `input` against `base` (normally the working directory).
  pub fn resolve(input: RunInput, base: &Path) -> Result<Self, ConfigError> {
    let source_dir = absolute(base, &input.source);
    if !source_dir.exists() {
      return Err(ConfigError::SourceMissing(source_dir));
    }
    if !source_dir.is_dir() {
      return Err(ConfigError::SourceNotDir(source_dir));
    }

    let build_root = absolute(base, &input.build);
    let output_dir = absolute(&build_root, &input.output);

    for (kind, root) in [("build", &build_root), ("output", &output_dir)] {
      if source_dir.starts_with(root) {
        return Err(ConfigError::RootContainsSource {
          kind,
          root: root.clone(),
          source_dir: source_dir.clone(),
        });
      }
    }

    let registry = match &input.registry_file {
      Some(path) => Registry::from_file(&absolute(base, path))?,
      None => Registry::builtin(),
    };
    let filters = FilterSet::parse(&registry, input.mode, &input.filters)?;

    Ok(Self {
      source_dir,
      build_root,
      output_dir,
      mode: input.mode,
      registry,
      filters,
      extra_defines: input.extra_defines,
      list_only: input.list_only,
      dry_run: input.dry_run || input.list_only,
      jobs: jobs(),
    })
  }

  /// Name used to label combinations: the source directory's name.
  pub fn project_name(&self) -> String {
    self
      .source_dir
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| "project".to_string())
  }
}

/// Join `path` onto `base` unless it is absolute, canonicalising when it exists.
fn absolute(base: &Path, path: &Path) -> PathBuf {
  let joined = base.join(path);
  dunce::canonicalize(&joined).unwrap_or(joined)
}

/// Parallelism hint for the compile step.
///
/// `FEATMATRIX_JOBS` wins when it holds a positive integer; otherwise the
/// host's available parallelism is used.
pub fn jobs() -> usize {
  if let Ok(value) = std::env::var(JOBS_ENV) {
    match value.trim().parse::<usize>() {
      Ok(n) if n > 0 => return n,
      _ => warn!(var = JOBS_ENV, value = %value, "ignoring invalid job count"),
    }
  }
  std::thread::available_parallelism()
    .map(|n| n.get())
    .unwrap_or(DEFAULT_JOBS)
}
