//! Run planning.
//!
//! Enumerates the registry, runs every combination through the filter engine
//! and keeps the survivors in enumeration order.

use tracing::debug;

use crate::combination::{BuildMode, Combination, enumerate};
use crate::filter::{FilterSet, SkipReason, Verdict, evaluate};
use crate::registry::Registry;

/// A combination that survived filtering, with its derived artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCombination {
  pub combination: Combination,
  pub suffix: String,
  /// `<project>_<suffix>`, used in progress output.
  pub label: String,
  pub arguments: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
  pub combinations: Vec<PlannedCombination>,
  pub enumerated: usize,
  pub skipped_dependency: usize,
  pub skipped_filter: usize,
}

impl Plan {
  pub fn len(&self) -> usize {
    self.combinations.len()
  }

  pub fn is_empty(&self) -> bool {
    self.combinations.is_empty()
  }

  pub fn suffixes(&self) -> impl Iterator<Item = &str> {
    self.combinations.iter().map(|c| c.suffix.as_str())
  }
}

/// Build the list of combinations a run will attempt.
pub fn plan(registry: &Registry, mode: BuildMode, filters: &FilterSet, project: &str) -> Plan {
  let mut result = Plan::default();

  for combination in enumerate(registry) {
    result.enumerated += 1;
    let suffix = combination.suffix(registry, mode);

    match evaluate(combination.options(), registry, filters) {
      Verdict::Build => {
        result.combinations.push(PlannedCombination {
          combination,
          label: format!("{}_{}", project, suffix),
          arguments: combination.arguments(registry),
          suffix,
        });
      }
      Verdict::Skip(reason @ SkipReason::Dependency { .. }) => {
        debug!(suffix = %suffix, reason = "dependency", detail = %reason, "skipping combination");
        result.skipped_dependency += 1;
      }
      Verdict::Skip(SkipReason::Filter) => {
        debug!(suffix = %suffix, reason = "filter", "skipping combination");
        result.skipped_filter += 1;
      }
    }
  }

  debug!(
    enumerated = result.enumerated,
    selected = result.len(),
    skipped_dependency = result.skipped_dependency,
    skipped_filter = result.skipped_filter,
    "planned run"
  );
  result
}
