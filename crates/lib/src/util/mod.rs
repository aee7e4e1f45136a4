//! Shared utilities.

use std::path::{Path, PathBuf};

/// `target` relative to `base` when it lies beneath it, otherwise unchanged.
///
/// `base` itself is shown as `.`.
pub fn display_path(target: &Path, base: &Path) -> PathBuf {
  match target.strip_prefix(base) {
    Ok(relative) if relative.as_os_str().is_empty() => PathBuf::from("."),
    Ok(relative) => relative.to_path_buf(),
    Err(_) => target.to_path_buf(),
  }
}
