//! Clearing read-only attributes left behind by a toolchain.
//!
//! Some toolchains mark generated artifacts (or whole directories) read-only,
//! which makes a plain recursive delete fail part way through.
//!
//! ## Platform Behavior
//!
//! - **Unix**: adds owner write (and, for directories, owner execute) permission
//! - **Windows**: clears the read-only attribute

use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::WorkspaceError;

/// Upper bound on walks; each one opens up one more level of unreadable directories.
const MAX_PASSES: usize = 8;

/// Recursively restore write permission below `path`.
///
/// The walker lists a directory before yielding it, so the contents of a
/// directory without read permission are missed by the walk that unlocks it.
/// Such trees are walked again until a pass reads everything. Failures on
/// individual entries are logged and skipped; the caller's retry decides the
/// outcome.
pub fn make_writable(path: &Path) {
  if std::fs::symlink_metadata(path).is_err() {
    return;
  }

  debug!(path = ?path, "clearing read-only attributes");

  for pass in 1..=MAX_PASSES {
    if !writable_pass(path) {
      return;
    }
    debug!(path = ?path, pass, "unreadable directories found, walking again");
  }
  warn!(path = ?path, "some directories stayed unreadable");
}

/// One walk over `path`. Returns whether any directory could not be read.
fn writable_pass(path: &Path) -> bool {
  let mut unreadable = false;

  for entry in WalkDir::new(path) {
    let entry = match entry {
      Ok(entry) => entry,
      Err(e) => {
        debug!(path = ?e.path(), error = %e, "cannot read entry, continuing");
        unreadable = true;
        continue;
      }
    };

    if entry.path_is_symlink() {
      continue;
    }

    if let Err(e) = make_entry_writable(entry.path()) {
      warn!(path = ?entry.path(), error = %e, "failed to make writable, continuing");
    }
  }

  unreadable
}

#[cfg(unix)]
fn make_entry_writable(path: &Path) -> Result<(), WorkspaceError> {
  use std::os::unix::fs::PermissionsExt;

  let metadata = std::fs::metadata(path).map_err(|e| WorkspaceError::Permissions {
    path: path.to_path_buf(),
    source: e,
  })?;

  let current_mode = metadata.permissions().mode();
  let new_mode = if metadata.is_dir() {
    current_mode | 0o700
  } else {
    current_mode | 0o200
  };

  if new_mode == current_mode {
    return Ok(());
  }

  let mut perms = metadata.permissions();
  perms.set_mode(new_mode);
  std::fs::set_permissions(path, perms).map_err(|e| WorkspaceError::Permissions {
    path: path.to_path_buf(),
    source: e,
  })
}

#[cfg(not(unix))]
fn make_entry_writable(path: &Path) -> Result<(), WorkspaceError> {
  let metadata = std::fs::metadata(path).map_err(|e| WorkspaceError::Permissions {
    path: path.to_path_buf(),
    source: e,
  })?;

  let mut perms = metadata.permissions();
  if !perms.readonly() {
    return Ok(());
  }

  #[allow(clippy::permissions_set_readonly_false)]
  perms.set_readonly(false);
  std::fs::set_permissions(path, perms).map_err(|e| WorkspaceError::Permissions {
    path: path.to_path_buf(),
    source: e,
  })
}
