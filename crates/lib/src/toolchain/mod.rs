//! External build operations.
//!
//! The pipeline treats configure, compile and test as opaque operations that
//! either succeed or fail. [`BuildTool`] is the seam; [`CmakeTool`] drives the
//! real CMake/CTest pair and tests substitute recording fakes.

pub mod cmake;
pub mod cmd;
pub mod identity;

use std::path::Path;

use thiserror::Error;

use crate::combination::BuildMode;

pub use cmake::{CmakeTool, Generator, SystemInfo};
pub use cmd::Invocation;
pub use identity::{TestPlan, Toolchain};

#[derive(Debug, Error)]
pub enum ToolError {
  #[error("failed to start {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("command failed with exit code {code:?}: {cmd}")]
  Failed { cmd: String, code: Option<i32> },

  #[error("toolchain property {0} not reported")]
  MissingProperty(String),
}

/// Everything the configure operation needs for one combination.
#[derive(Debug, Clone, Copy)]
pub struct ConfigureRequest<'a> {
  pub source_dir: &'a Path,
  pub build_dir: &'a Path,
  pub output_dir: &'a Path,
  pub mode: BuildMode,
  /// `-D<NAME>=ON|OFF` flags of the combination.
  pub feature_args: &'a [String],
  /// Raw `<var>[:<type>]=<value>` entries supplied by the operator.
  pub extra_defines: &'a [String],
}

/// The external configure/compile/test operations of one toolchain.
#[allow(async_fn_in_trait)]
pub trait BuildTool {
  /// Identify the compiler family, e.g. `GNU` or `MSVC`.
  async fn toolchain_id(&self) -> Result<String, ToolError>;

  /// Create and populate `request.build_dir`.
  async fn configure(&self, request: &ConfigureRequest<'_>) -> Result<(), ToolError>;

  /// Build a configured tree using up to `jobs` parallel jobs.
  async fn compile(&self, build_dir: &Path, mode: BuildMode, jobs: usize) -> Result<(), ToolError>;

  /// Run the test suite. `config` is set for multi-configuration toolchains.
  async fn test(&self, build_dir: &Path, config: Option<BuildMode>) -> Result<(), ToolError>;
}
