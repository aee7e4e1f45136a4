//! Combination enumeration.
//!
//! A combination is one on/off assignment across the registry, carried as an
//! [`OptionSet`] bitmask. The suffix string is only a derived display label;
//! filtering and dependency checks work on the bitmask.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::DEBUG_MARKER;
use crate::registry::Registry;

/// Set of registry indices, bit `i` standing for the `i`-th option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionSet(u32);

impl OptionSet {
  pub const fn empty() -> Self {
    Self(0)
  }

  pub const fn from_bits(bits: u32) -> Self {
    Self(bits)
  }

  pub const fn bits(self) -> u32 {
    self.0
  }

  pub const fn contains(self, idx: usize) -> bool {
    idx < 32 && self.0 & (1 << idx) != 0
  }

  pub fn insert(&mut self, idx: usize) {
    debug_assert!(idx < 32);
    self.0 |= 1 << idx;
  }

  pub fn with(mut self, idx: usize) -> Self {
    self.insert(idx);
    self
  }

  pub const fn is_empty(self) -> bool {
    self.0 == 0
  }

  pub const fn len(self) -> usize {
    self.0.count_ones() as usize
  }

  pub const fn is_subset(self, other: OptionSet) -> bool {
    self.0 & !other.0 == 0
  }

  /// Indices in ascending (registry) order.
  pub fn iter(self) -> impl Iterator<Item = usize> {
    (0..32).filter(move |idx| self.contains(*idx))
  }

  /// Map a string of tag characters back to the options carrying them.
  ///
  /// Returns the first character that names no option as the error.
  pub fn from_tags(registry: &Registry, tags: &str) -> Result<Self, char> {
    let mut set = Self::empty();
    for tag in tags.chars() {
      let idx = registry.index_of_tag(tag).ok_or(tag)?;
      set.insert(idx);
    }
    Ok(set)
  }
}

/// Optimisation/debug configuration of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildMode {
  #[default]
  Release,
  Debug,
}

impl BuildMode {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Release => "Release",
      Self::Debug => "Debug",
    }
  }

  pub fn is_debug(self) -> bool {
    matches!(self, Self::Debug)
  }
}

impl fmt::Display for BuildMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BuildMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "release" => Ok(Self::Release),
      "debug" => Ok(Self::Debug),
      _ => Err(format!("unknown build mode '{}', expected Release or Debug", s)),
    }
  }
}

/// One on/off assignment across every registry option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Combination {
  options: OptionSet,
}

impl Combination {
  pub fn new(options: OptionSet) -> Self {
    Self { options }
  }

  pub fn options(&self) -> OptionSet {
    self.options
  }

  /// Tags of the enabled options in registry order, plus the debug marker
  /// when `mode` is a debug build.
  pub fn suffix(&self, registry: &Registry, mode: BuildMode) -> String {
    let mut suffix: String = registry
      .options()
      .iter()
      .enumerate()
      .filter(|(idx, option)| option.enabled && self.options.contains(*idx))
      .map(|(_, option)| option.tag)
      .collect();

    if mode.is_debug() {
      suffix.push(DEBUG_MARKER);
    }
    suffix
  }

  /// Configure flags, one per option that may be toggled in this run.
  pub fn arguments(&self, registry: &Registry) -> Vec<String> {
    registry
      .options()
      .iter()
      .enumerate()
      .filter(|(_, option)| option.enabled)
      .map(|(idx, option)| {
        let state = if self.options.contains(idx) { "ON" } else { "OFF" };
        format!("-D{}={}", option.name, state)
      })
      .collect()
  }
}

/// Every combination of the registry's toggleable options.
///
/// Disabled options are pinned off, so a registry with `k` enabled options
/// yields `2^k` combinations. Order is binary counting with the first enabled
/// option as the least significant bit.
pub fn enumerate(registry: &Registry) -> Vec<Combination> {
  let enabled: Vec<usize> = registry.enabled_indices().collect();
  let count: u64 = 1 << enabled.len();

  (0..count)
    .map(|counter| {
      let options = enabled
        .iter()
        .enumerate()
        .filter(|(bit, _)| counter & (1 << bit) != 0)
        .fold(OptionSet::empty(), |set, (_, idx)| set.with(*idx));
      Combination::new(options)
    })
    .collect()
}
