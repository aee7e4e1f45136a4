//! Option registry types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One compile-time feature switch.
///
/// `tag` is the single character the switch contributes to a combination's
/// suffix. A switch with `enabled == false` is pinned off for the whole run and
/// never emits a configure flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDef {
  pub name: String,
  pub tag: char,
  #[serde(default = "default_enabled")]
  pub enabled: bool,
  /// Name of another switch that must be on whenever this one is.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub requires: Option<String>,
}

fn default_enabled() -> bool {
  true
}

impl OptionDef {
  pub fn new(name: impl Into<String>, tag: char) -> Self {
    Self {
      name: name.into(),
      tag,
      enabled: true,
      requires: None,
    }
  }

  pub fn requires(mut self, name: impl Into<String>) -> Self {
    self.requires = Some(name.into());
    self
  }

  pub fn disabled(mut self) -> Self {
    self.enabled = false;
    self
  }
}

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("option at position {0} has an empty name")]
  EmptyName(usize),

  #[error("option '{0}' is declared more than once")]
  DuplicateName(String),

  #[error("tag '{tag}' is used by both '{first}' and '{second}'")]
  DuplicateTag { tag: char, first: String, second: String },

  #[error("option '{name}' has tag '{tag}', tags must be ASCII letters or digits")]
  InvalidTag { name: String, tag: char },

  #[error("option '{name}' uses the reserved debug marker '{tag}' as its tag")]
  ReservedTag { name: String, tag: char },

  #[error("option '{name}' requires unknown option '{requires}'")]
  UnknownDependency { name: String, requires: String },

  #[error("option '{0}' requires itself")]
  SelfDependency(String),

  #[error("registry has {count} options, at most {max} are supported")]
  TooMany { count: usize, max: usize },

  #[error("failed to read registry file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse registry file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}
