//! Option registry.
//!
//! The registry is the ordered, immutable list of feature switches a run
//! enumerates over. Order matters: suffixes are built by scanning the registry
//! front to back, and bit `i` of an [`OptionSet`](crate::combination::OptionSet)
//! always refers to the `i`-th entry.

mod types;

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::consts::{DEBUG_MARKER, MAX_OPTIONS};

pub use types::{OptionDef, RegistryError};

/// Validated, ordered set of feature switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
  options: Vec<OptionDef>,
  /// Index of each option's prerequisite, parallel to `options`.
  prerequisites: Vec<Option<usize>>,
}

/// Switches of the timing library this tool was written for.
pub fn builtin_options() -> Vec<OptionDef> {
  vec![
    OptionDef::new("BUILD_SHARED_LIBS", 's'),
    OptionDef::new("VI_TM_STAT_USE_RMSE", 'a'),
    OptionDef::new("VI_TM_STAT_USE_FILTER", 'f').requires("VI_TM_STAT_USE_RMSE"),
    OptionDef::new("VI_TM_STAT_USE_MINMAX", 'm'),
    OptionDef::new("VI_TM_STAT_USE_RAW", 'r'),
    OptionDef::new("VI_TM_THREADSAFE", 't'),
  ]
}

impl Registry {
  /// Validate `options` and build a registry from them.
  pub fn new(options: Vec<OptionDef>) -> Result<Self, RegistryError> {
    if options.len() > MAX_OPTIONS {
      return Err(RegistryError::TooMany {
        count: options.len(),
        max: MAX_OPTIONS,
      });
    }

    let mut names: HashMap<&str, usize> = HashMap::new();
    let mut tags: HashMap<char, &str> = HashMap::new();

    for (idx, option) in options.iter().enumerate() {
      if option.name.trim().is_empty() {
        return Err(RegistryError::EmptyName(idx));
      }
      if names.insert(option.name.as_str(), idx).is_some() {
        return Err(RegistryError::DuplicateName(option.name.clone()));
      }
      if !option.tag.is_ascii_alphanumeric() {
        return Err(RegistryError::InvalidTag {
          name: option.name.clone(),
          tag: option.tag,
        });
      }
      if option.tag == DEBUG_MARKER {
        return Err(RegistryError::ReservedTag {
          name: option.name.clone(),
          tag: option.tag,
        });
      }
      if let Some(first) = tags.insert(option.tag, option.name.as_str()) {
        return Err(RegistryError::DuplicateTag {
          tag: option.tag,
          first: first.to_string(),
          second: option.name.clone(),
        });
      }
    }

    for option in &options {
      if let Some(requires) = &option.requires {
        if requires == &option.name {
          return Err(RegistryError::SelfDependency(option.name.clone()));
        }
        if !names.contains_key(requires.as_str()) {
          return Err(RegistryError::UnknownDependency {
            name: option.name.clone(),
            requires: requires.clone(),
          });
        }
      }
    }

    let prerequisites = resolve_prerequisites(&options);
    debug!(count = options.len(), "option registry validated");
    Ok(Self { options, prerequisites })
  }

  /// The built-in registry, see [`builtin_options`].
  pub fn builtin() -> Self {
    let options = builtin_options();
    let prerequisites = resolve_prerequisites(&options);
    Self { options, prerequisites }
  }

  /// Parse a JSON array of options and validate it.
  pub fn from_json(text: &str, origin: &Path) -> Result<Self, RegistryError> {
    let options: Vec<OptionDef> = serde_json::from_str(text).map_err(|source| RegistryError::Parse {
      path: origin.to_path_buf(),
      source,
    })?;
    Self::new(options)
  }

  /// Load a registry from a JSON file.
  pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
    let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json(&text, path)
  }

  pub fn len(&self) -> usize {
    self.options.len()
  }

  pub fn is_empty(&self) -> bool {
    self.options.is_empty()
  }

  pub fn options(&self) -> &[OptionDef] {
    &self.options
  }

  pub fn get(&self, idx: usize) -> Option<&OptionDef> {
    self.options.get(idx)
  }

  /// Index of the option carrying `tag`.
  pub fn index_of_tag(&self, tag: char) -> Option<usize> {
    self.options.iter().position(|o| o.tag == tag)
  }

  /// Index of the option that must be on whenever option `idx` is.
  pub fn prerequisite(&self, idx: usize) -> Option<usize> {
    self.prerequisites.get(idx).copied().flatten()
  }

  /// Indices of options that may be toggled in this run, in registry order.
  pub fn enabled_indices(&self) -> impl Iterator<Item = usize> + '_ {
    self.options.iter().enumerate().filter(|(_, o)| o.enabled).map(|(idx, _)| idx)
  }
}

impl Default for Registry {
  fn default() -> Self {
    Self::builtin()
  }
}

fn resolve_prerequisites(options: &[OptionDef]) -> Vec<Option<usize>> {
  options
    .iter()
    .map(|option| {
      option
        .requires
        .as_deref()
        .and_then(|name| options.iter().position(|o| o.name == name))
    })
    .collect()
}
