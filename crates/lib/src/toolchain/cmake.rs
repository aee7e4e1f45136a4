//! CMake/CTest implementation of [`BuildTool`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::cmd::{self, Invocation};
use super::{BuildTool, ConfigureRequest, ToolError};
use crate::combination::BuildMode;
use crate::consts::DEFAULT_OUTPUT_VAR;
use crate::util::display_path;

const GENERATOR_KEY: &str = "CMAKE_GENERATOR";
const COMPILER_ID_KEY: &str = "CMAKE_CXX_COMPILER_ID";

/// Properties reported by `cmake --system-information`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInfo {
  properties: HashMap<String, String>,
}

impl SystemInfo {
  /// Parse `KEY "value"`, `KEY=value` and `KEY:value` lines.
  ///
  /// The first occurrence of a key wins.
  pub fn parse(text: &str) -> Self {
    let mut properties = HashMap::new();
    for line in text.lines() {
      let Some(split) = line.find([' ', '=', ':']) else {
        continue;
      };
      let (key, rest) = line.split_at(split);
      if key.is_empty() {
        continue;
      }
      let value = rest[1..].trim_matches([' ', '\'', '"']).trim();
      properties.entry(key.to_string()).or_insert_with(|| value.to_string());
    }
    Self { properties }
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.properties.get(key).map(String::as_str)
  }

  pub fn generator(&self) -> Generator {
    self.get(GENERATOR_KEY).map(Generator::from_name).unwrap_or(Generator::Other)
  }
}

/// Build-tool family behind a CMake generator, which decides the job-count syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generator {
  Ninja,
  Makefiles,
  MsBuild,
  Other,
}

impl Generator {
  pub fn from_name(name: &str) -> Self {
    if name.contains("Ninja") {
      Self::Ninja
    } else if name.contains("Makefiles") {
      Self::Makefiles
    } else if name.starts_with("Visual Studio") || name.contains("MSBuild") {
      Self::MsBuild
    } else {
      Self::Other
    }
  }

  /// Arguments appended last to `cmake --build`.
  pub fn parallel_args(self, jobs: usize) -> Vec<String> {
    match self {
      Self::Ninja => vec![format!("-j{}", jobs)],
      Self::Makefiles => vec!["--".to_string(), format!("-j{}", jobs)],
      Self::MsBuild => vec!["--".to_string(), format!("/m:{}", jobs)],
      Self::Other => Vec::new(),
    }
  }
}

#[derive(Debug)]
pub struct CmakeTool {
  cmake: String,
  ctest: String,
  output_var: String,
  /// Paths beneath this directory are printed relative to it.
  display_base: PathBuf,
  dry_run: bool,
  system_info: OnceCell<SystemInfo>,
}

impl CmakeTool {
  pub fn new(display_base: impl Into<PathBuf>, dry_run: bool) -> Self {
    Self {
      cmake: "cmake".to_string(),
      ctest: "ctest".to_string(),
      output_var: DEFAULT_OUTPUT_VAR.to_string(),
      display_base: display_base.into(),
      dry_run,
      system_info: OnceCell::new(),
    }
  }

  pub fn with_programs(mut self, cmake: impl Into<String>, ctest: impl Into<String>) -> Self {
    self.cmake = cmake.into();
    self.ctest = ctest.into();
    self
  }

  pub fn with_output_var(mut self, output_var: impl Into<String>) -> Self {
    self.output_var = output_var.into();
    self
  }

  fn show(&self, path: &Path) -> String {
    display_path(path, &self.display_base).display().to_string()
  }

  /// Query `cmake --system-information` once; failures degrade to no properties.
  pub async fn system_info(&self) -> &SystemInfo {
    self
      .system_info
      .get_or_init(|| async {
        let query = Invocation::new(&self.cmake).arg("--system-information");
        match cmd::capture(&query).await {
          Ok(text) => {
            let info = SystemInfo::parse(&text);
            debug!(
              generator = ?info.get(GENERATOR_KEY),
              compiler = ?info.get(COMPILER_ID_KEY),
              "queried toolchain"
            );
            info
          }
          Err(e) => {
            warn!(error = %e, "toolchain query failed");
            SystemInfo::default()
          }
        }
      })
      .await
  }

  pub fn configure_invocation(&self, request: &ConfigureRequest<'_>) -> Invocation {
    Invocation::new(&self.cmake)
      .arg("-S")
      .arg(self.show(request.source_dir))
      .arg("-B")
      .arg(self.show(request.build_dir))
      .arg(format!("-DCMAKE_BUILD_TYPE={}", request.mode))
      .arg(format!("-D{}={}", self.output_var, self.show(request.output_dir)))
      .args(request.feature_args.iter().cloned())
      .args(request.extra_defines.iter().map(|define| format!("-D{}", define)))
  }

  pub fn compile_invocation(&self, build_dir: &Path, mode: BuildMode, generator: Generator, jobs: usize) -> Invocation {
    Invocation::new(&self.cmake)
      .arg("--build")
      .arg(self.show(build_dir))
      .arg("--config")
      .arg(mode.as_str())
      .args(generator.parallel_args(jobs))
  }

  pub fn test_invocation(&self, build_dir: &Path, config: Option<BuildMode>) -> Invocation {
    let invocation = Invocation::new(&self.ctest)
      .arg("--test-dir")
      .arg(self.show(build_dir))
      .arg("--output-on-failure");
    match config {
      Some(mode) => invocation.arg("--build-config").arg(mode.as_str()),
      None => invocation,
    }
  }
}

impl BuildTool for CmakeTool {
  async fn toolchain_id(&self) -> Result<String, ToolError> {
    self
      .system_info()
      .await
      .get(COMPILER_ID_KEY)
      .map(str::to_string)
      .ok_or_else(|| ToolError::MissingProperty(COMPILER_ID_KEY.to_string()))
  }

  async fn configure(&self, request: &ConfigureRequest<'_>) -> Result<(), ToolError> {
    cmd::run(&self.configure_invocation(request), self.dry_run).await
  }

  async fn compile(&self, build_dir: &Path, mode: BuildMode, jobs: usize) -> Result<(), ToolError> {
    let generator = self.system_info().await.generator();
    cmd::run(&self.compile_invocation(build_dir, mode, generator, jobs), self.dry_run).await
  }

  async fn test(&self, build_dir: &Path, config: Option<BuildMode>) -> Result<(), ToolError> {
    cmd::run(&self.test_invocation(build_dir, config), self.dry_run).await
  }
}
