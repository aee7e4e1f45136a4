//! Build and output directory lifecycle.
//!
//! Every removal goes through [`remove_tree`], which retries once after
//! clearing read-only attributes, so artifacts a toolchain left write-protected
//! never abort a run on their own.

mod writable;

#[cfg(test)]
pub(crate) mod testutil;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::BUILD_DIR_PREFIX;

pub use writable::make_writable;

#[derive(Debug, Error)]
pub enum WorkspaceError {
  #[error("failed to remove {path}: {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to create {path}: {source}")]
  Create {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to update permissions on {path}: {source}")]
  Permissions {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Ensure `path` exists and is empty.
///
/// An existing directory is removed recursively and recreated.
pub fn prepare_root(path: &Path) -> Result<(), WorkspaceError> {
  remove_tree(path)?;
  std::fs::create_dir_all(path).map_err(|source| WorkspaceError::Create {
    path: path.to_path_buf(),
    source,
  })?;
  info!(path = %path.display(), "prepared directory");
  Ok(())
}

/// Build directory of the combination with the given suffix.
pub fn build_dir_path(root: &Path, suffix: &str) -> PathBuf {
  root.join(format!("{}{}", BUILD_DIR_PREFIX, suffix))
}

/// Compute the build directory for `suffix` and make sure nothing is there.
///
/// The directory is not created: the configure step creates it.
pub fn fresh_build_dir(root: &Path, suffix: &str) -> Result<PathBuf, WorkspaceError> {
  let path = build_dir_path(root, suffix);
  remove_tree(&path)?;
  Ok(path)
}

/// Remove a build directory after its combination has finished.
pub fn cleanup(path: &Path) -> Result<(), WorkspaceError> {
  remove_tree(path)?;
  debug!(path = %path.display(), "removed build directory");
  Ok(())
}

/// Remove a file or directory tree, tolerating read-only entries.
///
/// A missing path is not an error.
pub fn remove_tree(path: &Path) -> Result<(), WorkspaceError> {
  let metadata = match std::fs::symlink_metadata(path) {
    Ok(metadata) => metadata,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
    Err(source) => {
      return Err(WorkspaceError::Remove {
        path: path.to_path_buf(),
        source,
      });
    }
  };

  let remove = |path: &Path| {
    if metadata.is_dir() {
      std::fs::remove_dir_all(path)
    } else {
      std::fs::remove_file(path)
    }
  };

  match remove(path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => {
      debug!(path = %path.display(), error = %e, "removal failed, retrying after clearing read-only attributes");
      make_writable(path);
      match remove(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(WorkspaceError::Remove {
          path: path.to_path_buf(),
          source,
        }),
      }
    }
  }
}
