//! Combination filtering.
//!
//! Decides whether a combination is built. Two independent reasons can
//! exclude a combination: it violates a `requires` edge of the registry, or it
//! matches none of the operator's filter tokens. Both are pure predicates over
//! the combination's [`OptionSet`].

use std::fmt;

use thiserror::Error;

use crate::combination::{BuildMode, OptionSet};
use crate::consts::{DEBUG_MARKER, EMPTY_FILTER_TOKENS};
use crate::registry::Registry;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
  #[error("filter '{token}' contains '{tag}', which is not the tag of any option")]
  UnknownTag { token: String, tag: char },
}

/// One operator-supplied filter token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterToken {
  raw: String,
  options: OptionSet,
  /// Carries the debug marker. Every Debug suffix ends in it, so it never
  /// narrows the match.
  marker: bool,
}

impl FilterToken {
  pub fn raw(&self) -> &str {
    &self.raw
  }

  pub fn options(&self) -> OptionSet {
    self.options
  }

  pub fn has_marker(&self) -> bool {
    self.marker
  }

  pub fn is_empty(&self) -> bool {
    self.options.is_empty() && !self.marker
  }

  /// Non-empty token whose characters all appear in the combination's suffix.
  fn matches(&self, options: OptionSet) -> bool {
    !self.is_empty() && self.options.is_subset(options)
  }
}

/// The filter tokens of a run. No tokens means "build everything valid".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
  tokens: Vec<FilterToken>,
}

impl FilterSet {
  pub fn none() -> Self {
    Self::default()
  }

  /// Parse raw tokens against the registry's tags.
  ///
  /// `__EMPTY__` and `""` are accepted as spellings of the empty token. In
  /// Debug mode the suffix marker `d` may appear in a token; in Release mode
  /// it is an unknown tag like any other.
  pub fn parse<I, S>(registry: &Registry, mode: BuildMode, tokens: I) -> Result<Self, FilterError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let tokens = tokens
      .into_iter()
      .map(|token| -> Result<FilterToken, FilterError> {
        let token = token.as_ref();
        let raw = if EMPTY_FILTER_TOKENS.contains(&token) { "" } else { token };
        let marker = mode.is_debug() && raw.contains(DEBUG_MARKER);
        let tags: String = if marker {
          raw.chars().filter(|c| *c != DEBUG_MARKER).collect()
        } else {
          raw.to_string()
        };
        let options = OptionSet::from_tags(registry, &tags).map_err(|tag| FilterError::UnknownTag {
          token: token.to_string(),
          tag,
        })?;
        Ok(FilterToken {
          raw: raw.to_string(),
          options,
          marker,
        })
      })
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self { tokens })
  }

  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  pub fn tokens(&self) -> &[FilterToken] {
    &self.tokens
  }

  /// Whether a dependency-valid combination survives the tokens.
  fn admits(&self, options: OptionSet) -> bool {
    if self.tokens.is_empty() {
      return true;
    }
    if options.is_empty() && self.tokens.iter().all(FilterToken::is_empty) {
      return true;
    }
    self.tokens.iter().any(|token| token.matches(options))
  }
}

/// Why a combination is not built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
  /// `option` is on while its prerequisite `requires` is off.
  Dependency { option: String, requires: String },
  /// No filter token matches.
  Filter,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SkipReason::Dependency { option, requires } => write!(f, "{} requires {}", option, requires),
      SkipReason::Filter => f.write_str("no filter matches"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
  Build,
  Skip(SkipReason),
}

impl Verdict {
  pub fn is_skip(&self) -> bool {
    matches!(self, Verdict::Skip(_))
  }
}

/// The first `requires` edge `options` violates, if any.
pub fn dependency_violation(options: OptionSet, registry: &Registry) -> Option<SkipReason> {
  for idx in options.iter() {
    let Some(required) = registry.prerequisite(idx) else {
      continue;
    };
    if !options.contains(required) {
      let name = |i: usize| registry.get(i).map(|o| o.name.clone()).unwrap_or_default();
      return Some(SkipReason::Dependency {
        option: name(idx),
        requires: name(required),
      });
    }
  }
  None
}

/// Decide whether the combination `options` is built.
///
/// Dependency violations win over everything; filters are consulted only for
/// dependency-valid combinations.
pub fn evaluate(options: OptionSet, registry: &Registry, filters: &FilterSet) -> Verdict {
  if let Some(reason) = dependency_violation(options, registry) {
    return Verdict::Skip(reason);
  }
  if filters.admits(options) {
    Verdict::Build
  } else {
    Verdict::Skip(SkipReason::Filter)
  }
}

pub fn skip(options: OptionSet, registry: &Registry, filters: &FilterSet) -> bool {
  evaluate(options, registry, filters).is_skip()
}
