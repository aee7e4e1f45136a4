//! Shared test helpers for CLI integration tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Logs every call, answers the system query and creates build trees.
const FAKE_CMAKE: &str = r#"#!/bin/sh
echo "cmake $*" >> "$FAKE_LOG"
case "$1" in
  --system-information)
    echo 'CMAKE_GENERATOR "Unix Makefiles"'
    echo "CMAKE_CXX_COMPILER_ID \"${FAKE_COMPILER:-GNU}\""
    ;;
  -S)
    mkdir -p "$4"
    touch "$4/CMakeCache.txt"
    ;;
  --build)
    if [ -n "$FAKE_FAIL_BUILD" ] && [ "$2" = "$FAKE_FAIL_BUILD" ]; then
      exit 2
    fi
    ;;
esac
exit 0
"#;

const FAKE_CTEST: &str = r#"#!/bin/sh
echo "ctest $*" >> "$FAKE_LOG"
exit "${FAKE_CTEST_EXIT:-0}"
"#;

/// Two independent options: four combinations.
pub const TWO_OPTIONS: &str = r#"[{"name": "WITH_X", "tag": "x"}, {"name": "WITH_Y", "tag": "y"}]"#;

/// Isolated test environment.
///
/// Holds a `project/` source tree, an option registry and the fake tools.
pub struct TestEnv {
  pub temp: TempDir,
  pub log: PathBuf,
}

impl TestEnv {
  pub fn new(options_json: &str) -> Self {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir(temp.path().join("project")).unwrap();
    std::fs::write(temp.path().join("options.json"), options_json).unwrap();
    write_script(&temp.path().join("fake-cmake"), FAKE_CMAKE);
    write_script(&temp.path().join("fake-ctest"), FAKE_CTEST);
    let log = temp.path().join("calls.log");
    Self { temp, log }
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  /// The binary, pointed at the fake tools and this environment's registry.
  pub fn featmatrix_cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("featmatrix");
    cmd
      .current_dir(self.path())
      .env("FAKE_LOG", &self.log)
      .env("FEATMATRIX_JOBS", "3")
      .env_remove("RUST_LOG")
      .arg("-S")
      .arg("project")
      .arg("--options")
      .arg("options.json")
      .arg("--cmake")
      .arg(self.path().join("fake-cmake"))
      .arg("--ctest")
      .arg(self.path().join("fake-ctest"));
    cmd
  }

  /// Logged calls, without the toolchain query.
  pub fn calls(&self) -> Vec<String> {
    std::fs::read_to_string(&self.log)
      .unwrap_or_default()
      .lines()
      .filter(|line| !line.contains("--system-information"))
      .map(str::to_string)
      .collect()
  }

  pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
    self.calls().into_iter().filter(|line| line.starts_with(prefix)).collect()
  }
}

fn write_script(path: &Path, content: &str) {
  std::fs::write(path, content).unwrap();
  std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
