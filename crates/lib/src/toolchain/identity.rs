//! Toolchain identity.
//!
//! The compiler family decides how tests are invoked. It is resolved once per
//! run into a closed set of variants.

use std::fmt;

use crate::combination::BuildMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toolchain {
  /// One configuration per build tree (Makefiles, Ninja with GCC/Clang).
  SingleConfig(String),
  /// Several configurations per build tree; tests must name one (MSVC).
  MultiConfig(String),
  /// A compiler family we do not know how to drive tests for.
  Unrecognized(String),
}

/// How the test phase should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestPlan {
  Run { config: Option<BuildMode> },
  Skip,
}

impl Toolchain {
  pub fn from_compiler_id(id: &str) -> Self {
    let id = id.trim();
    match id {
      "GNU" | "Clang" | "AppleClang" => Self::SingleConfig(id.to_string()),
      "MSVC" => Self::MultiConfig(id.to_string()),
      _ => Self::Unrecognized(id.to_string()),
    }
  }

  pub fn id(&self) -> &str {
    match self {
      Self::SingleConfig(id) | Self::MultiConfig(id) | Self::Unrecognized(id) => id,
    }
  }

  pub fn test_plan(&self, mode: BuildMode) -> TestPlan {
    match self {
      Self::SingleConfig(_) => TestPlan::Run { config: None },
      Self::MultiConfig(_) => TestPlan::Run { config: Some(mode) },
      Self::Unrecognized(_) => TestPlan::Skip,
    }
  }
}

impl fmt::Display for Toolchain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.id().is_empty() {
      f.write_str("<unknown>")
    } else {
      f.write_str(self.id())
    }
  }
}
