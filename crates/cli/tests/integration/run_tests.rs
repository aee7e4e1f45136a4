//! Full runs: ordering, fail-stop, cleanup and toolchain handling.

use predicates::prelude::*;

use super::common::{TWO_OPTIONS, TestEnv};

#[test]
fn builds_every_combination_in_order() {
  let env = TestEnv::new(TWO_OPTIONS);

  env
    .featmatrix_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("[START ALL] 4 combinations"))
    .stdout(predicate::str::contains("[START] 1/4 project_:"))
    .stdout(predicate::str::contains("[FINISH] 4/4: project_xy"))
    .stdout(predicate::str::contains(
      "All 4 combinations have been successfully assembled and tested.",
    ))
    .stdout(predicate::str::contains("[FINISH ALL]"));

  let configures: Vec<String> = env
    .calls_starting_with("cmake -S")
    .iter()
    .map(|line| line.split_whitespace().nth(4).unwrap_or_default().to_string())
    .collect();
  assert_eq!(
    configures,
    vec!["_tests/_build_", "_tests/_build_x", "_tests/_build_y", "_tests/_build_xy"]
  );
  assert_eq!(env.calls_starting_with("ctest").len(), 4);
}

#[test]
fn each_combination_runs_configure_build_test() {
  let env = TestEnv::new(TWO_OPTIONS);

  env.featmatrix_cmd().arg("xy").assert().success();

  assert_eq!(
    env.calls(),
    vec![
      "cmake -S project -B _tests/_build_xy -DCMAKE_BUILD_TYPE=Release -DVI_TM_OUTPUT_PATH=_tests/bin -DWITH_X=ON -DWITH_Y=ON",
      "cmake --build _tests/_build_xy --config Release -- -j3",
      "ctest --test-dir _tests/_build_xy --output-on-failure",
    ]
  );
}

#[test]
fn build_directories_are_removed_and_output_kept() {
  let env = TestEnv::new(TWO_OPTIONS);

  env.featmatrix_cmd().assert().success();

  let build_root = env.path().join("_tests");
  assert!(build_root.join("bin").is_dir());
  let leftovers: Vec<_> = std::fs::read_dir(&build_root)
    .unwrap()
    .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
    .filter(|name| name.starts_with("_build_"))
    .collect();
  assert!(leftovers.is_empty(), "stale build dirs: {:?}", leftovers);
}

#[test]
fn failing_tests_stop_the_run() {
  let env = TestEnv::new(TWO_OPTIONS);

  let assert = env
    .featmatrix_cmd()
    .env("FAKE_CTEST_EXIT", "1")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Stopped after 1 of 4 combinations."));

  let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
  assert_eq!(stderr.matches("test failed for combination ''").count(), 1, "{}", stderr);
  assert!(String::from_utf8_lossy(&assert.get_output().stdout).contains("Test - FAILED ["));

  assert_eq!(env.calls_starting_with("ctest").len(), 1);
  assert_eq!(env.calls_starting_with("cmake -S").len(), 1);
  assert!(!env.path().join("_tests").join("_build_").exists());
}

#[test]
fn failing_build_stops_before_later_combinations() {
  let env = TestEnv::new(TWO_OPTIONS);

  env
    .featmatrix_cmd()
    .env("FAKE_FAIL_BUILD", "_tests/_build_y")
    .assert()
    .failure()
    .stderr(predicate::str::contains("build failed for combination 'y'"));

  let configures = env.calls_starting_with("cmake -S");
  assert_eq!(configures.len(), 3);
  assert!(configures.iter().all(|line| !line.contains("_build_xy")));
  assert_eq!(env.calls_starting_with("ctest").len(), 2);
  assert!(!env.path().join("_tests").join("_build_y").exists());
}

#[test]
fn unknown_compiler_skips_tests() {
  let env = TestEnv::new(TWO_OPTIONS);

  env
    .featmatrix_cmd()
    .env("FAKE_COMPILER", "Intel")
    .assert()
    .success()
    .stderr(predicate::str::contains("Unknown compiler 'Intel'"))
    .stdout(predicate::str::contains("Test phases skipped: 4"));

  assert!(env.calls_starting_with("ctest").is_empty());
  assert_eq!(env.calls_starting_with("cmake --build").len(), 4);
}

#[test]
fn multi_config_toolchain_names_the_configuration() {
  let env = TestEnv::new(TWO_OPTIONS);

  env
    .featmatrix_cmd()
    .env("FAKE_COMPILER", "MSVC")
    .args(["-C", "Debug", "x"])
    .assert()
    .success();

  let tests = env.calls_starting_with("ctest");
  assert_eq!(tests.len(), 2);
  assert!(tests.iter().all(|line| line.ends_with("--build-config Debug")));
  assert!(
    env
      .calls_starting_with("cmake -S")
      .iter()
      .all(|line| line.contains("-DCMAKE_BUILD_TYPE=Debug"))
  );
}

#[test]
fn stale_build_root_is_wiped() {
  let env = TestEnv::new(TWO_OPTIONS);
  let stale = env.path().join("_tests").join("_build_old");
  std::fs::create_dir_all(&stale).unwrap();
  std::fs::write(stale.join("junk"), "x").unwrap();

  env.featmatrix_cmd().arg("__EMPTY__").assert().success();

  assert!(!stale.exists());
  assert!(env.path().join("project").exists());
}
