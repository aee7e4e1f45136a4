//! End-to-end pipeline scenarios against a recording fake toolchain.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use featmatrix_lib::combination::BuildMode;
use featmatrix_lib::config::RunConfig;
use featmatrix_lib::consts::BUILD_DIR_PREFIX;
use featmatrix_lib::filter::FilterSet;
use featmatrix_lib::pipeline::{CleanupFn, Phase, Pipeline, PipelineError, Position, Progress};
use featmatrix_lib::plan::plan;
use featmatrix_lib::registry::{OptionDef, Registry};
use featmatrix_lib::report::{RunState, RunSummary};
use featmatrix_lib::toolchain::{BuildTool, ConfigureRequest, ToolError, Toolchain};
use featmatrix_lib::workspace::{self, WorkspaceError};
use tempfile::TempDir;

/// Fake toolchain that records every call as `<op>:<suffix>`.
struct FakeTool {
  compiler_id: Option<String>,
  fail_on: Option<(&'static str, &'static str)>,
  readonly_artifacts: bool,
  calls: Mutex<Vec<String>>,
}

impl FakeTool {
  fn new() -> Self {
    Self {
      compiler_id: Some("GNU".to_string()),
      fail_on: None,
      readonly_artifacts: false,
      calls: Mutex::new(Vec::new()),
    }
  }

  fn compiler(mut self, id: Option<&str>) -> Self {
    self.compiler_id = id.map(str::to_string);
    self
  }

  fn failing(mut self, op: &'static str, suffix: &'static str) -> Self {
    self.fail_on = Some((op, suffix));
    self
  }

  fn readonly_artifacts(mut self) -> Self {
    self.readonly_artifacts = true;
    self
  }

  fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  fn record(&self, op: &str, build_dir: &Path) -> Result<(), ToolError> {
    let name = build_dir.file_name().unwrap().to_string_lossy().into_owned();
    let suffix = name.strip_prefix(BUILD_DIR_PREFIX).unwrap().to_string();
    self.calls.lock().unwrap().push(format!("{}:{}", op, suffix));

    match self.fail_on {
      Some((fail_op, fail_suffix)) if fail_op == op && fail_suffix == suffix => Err(ToolError::Failed {
        cmd: format!("{} {}", op, build_dir.display()),
        code: Some(1),
      }),
      _ => Ok(()),
    }
  }
}

impl BuildTool for FakeTool {
  async fn toolchain_id(&self) -> Result<String, ToolError> {
    self
      .compiler_id
      .clone()
      .ok_or_else(|| ToolError::MissingProperty("CMAKE_CXX_COMPILER_ID".to_string()))
  }

  async fn configure(&self, request: &ConfigureRequest<'_>) -> Result<(), ToolError> {
    // Like cmake, configure creates the build directory; in dry-run the root is absent.
    if request.build_dir.parent().is_some_and(Path::exists) {
      std::fs::create_dir_all(request.build_dir).unwrap();
      std::fs::write(request.build_dir.join("CMakeCache.txt"), request.feature_args.join("\n")).unwrap();
    }
    self.record("configure", request.build_dir)
  }

  async fn compile(&self, build_dir: &Path, _mode: BuildMode, jobs: usize) -> Result<(), ToolError> {
    assert!(jobs > 0);
    if self.readonly_artifacts && build_dir.exists() {
      let obj = build_dir.join("obj");
      std::fs::create_dir_all(&obj).unwrap();
      std::fs::write(obj.join("lib.a"), b"archive").unwrap();
      for path in [obj.join("lib.a"), obj] {
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(&path, perms).unwrap();
      }
    }
    self.record("compile", build_dir)
  }

  async fn test(&self, build_dir: &Path, config: Option<BuildMode>) -> Result<(), ToolError> {
    let op = match config {
      Some(mode) => format!("test[{}]", mode),
      None => "test".to_string(),
    };
    self.record(&op, build_dir)
  }
}

#[derive(Default)]
struct Events(Vec<String>);

impl Progress for Events {
  fn combination_listed(&mut self, position: Position<'_>) {
    self.0.push(format!("listed {}/{} {}", position.ordinal, position.total, position.combination.label));
  }

  fn phase_failed(&mut self, position: Position<'_>, phase: Phase, _elapsed: Duration) {
    self.0.push(format!("{} failed {}", phase, position.combination.suffix));
  }

  fn cleanup_failed(&mut self, position: Position<'_>, _error: &WorkspaceError) {
    self.0.push(format!("cleanup failed {}", position.combination.suffix));
  }

  fn tests_skipped(&mut self, position: Position<'_>, _toolchain: &Toolchain) {
    self.0.push(format!("tests skipped {}", position.combination.suffix));
  }

  fn combination_finished(&mut self, position: Position<'_>, outcome: Phase, _elapsed: Duration, _run: Duration) {
    self.0.push(format!("{} {}", outcome, position.combination.suffix));
  }
}

struct Fixture {
  _temp: TempDir,
  config: RunConfig,
}

impl Fixture {
  fn new(filters: &[&str]) -> Self {
    let registry = Registry::new(vec![
      OptionDef::new("A", 'a'),
      OptionDef::new("B", 'b'),
      OptionDef::new("C", 'c'),
    ])
    .unwrap();
    Self::with_registry(registry, filters)
  }

  fn with_registry(registry: Registry, filters: &[&str]) -> Self {
    let temp = TempDir::new().unwrap();
    let source_dir = temp.path().join("lib");
    std::fs::create_dir_all(&source_dir).unwrap();
    let build_root = temp.path().join("_tests");
    let config = RunConfig {
      source_dir,
      output_dir: build_root.join("bin"),
      build_root,
      mode: BuildMode::Release,
      filters: FilterSet::parse(&registry, BuildMode::Release, filters).unwrap(),
      registry,
      extra_defines: Vec::new(),
      list_only: false,
      dry_run: false,
      jobs: 2,
    };
    Self { _temp: temp, config }
  }

  fn build_dir(&self, suffix: &str) -> PathBuf {
    self.config.build_root.join(format!("{}{}", BUILD_DIR_PREFIX, suffix))
  }

  async fn run(&self, tool: &FakeTool) -> (Result<(), PipelineError>, RunSummary, Vec<String>) {
    self.run_with_cleanup(tool, workspace::cleanup).await
  }

  async fn run_with_cleanup(
    &self,
    tool: &FakeTool,
    cleanup: CleanupFn,
  ) -> (Result<(), PipelineError>, RunSummary, Vec<String>) {
    let config = &self.config;
    let plan = plan(&config.registry, config.mode, &config.filters, &config.project_name());
    let mut state = RunState::new(config, &plan);
    let mut pipeline = Pipeline::new(tool, config, Events::default()).with_cleanup(cleanup);
    let result = pipeline.run(&plan, &mut state).await;
    let failure = result.as_ref().err().map(ToString::to_string);
    (result, state.finish(failure), pipeline.into_progress().0)
  }
}

/// Removal that refuses to delete the `ab` build directory.
fn cleanup_sticking_on_ab(path: &Path) -> Result<(), WorkspaceError> {
  if path.ends_with(format!("{}ab", BUILD_DIR_PREFIX)) {
    return Err(WorkspaceError::Remove {
      path: path.to_path_buf(),
      source: io::Error::new(io::ErrorKind::PermissionDenied, "device busy"),
    });
  }
  workspace::cleanup(path)
}

fn phases_for(suffixes: &[&str]) -> Vec<String> {
  suffixes
    .iter()
    .flat_map(|s| [format!("configure:{}", s), format!("compile:{}", s), format!("test:{}", s)])
    .collect()
}

#[tokio::test]
async fn all_combinations_built_in_order() {
  let fixture = Fixture::new(&[]);
  let tool = FakeTool::new();

  let (result, summary, events) = fixture.run(&tool).await;

  result.unwrap();
  let suffixes = ["", "a", "b", "ab", "c", "ac", "bc", "abc"];
  assert_eq!(tool.calls(), phases_for(&suffixes));
  assert_eq!(summary.total, 8);
  assert_eq!(summary.attempted, 8);
  assert_eq!(summary.succeeded, 8);
  assert!(summary.is_success());
  assert_eq!(events.iter().filter(|e| e.starts_with("done ")).count(), 8);
}

#[tokio::test]
async fn filter_selects_superset_combinations() {
  let fixture = Fixture::new(&["a"]);
  let tool = FakeTool::new();

  let (result, summary, _) = fixture.run(&tool).await;

  result.unwrap();
  assert_eq!(tool.calls(), phases_for(&["a", "ab", "ac", "abc"]));
  assert_eq!(summary.skipped_filter, 4);
  assert_eq!(summary.attempted, 4);
}

#[tokio::test]
async fn configure_failure_stops_the_run() {
  let fixture = Fixture::new(&[]);
  let tool = FakeTool::new().failing("configure", "b");

  let (result, summary, events) = fixture.run(&tool).await;

  let err = result.unwrap_err();
  assert!(matches!(
    &err,
    PipelineError::Phase { phase: Phase::Configuring, suffix, .. } if suffix == "b"
  ));

  let mut expected = phases_for(&["", "a"]);
  expected.push("configure:b".to_string());
  assert_eq!(tool.calls(), expected);

  assert_eq!(summary.attempted, 3);
  assert_eq!(summary.succeeded, 2);
  assert!(!summary.is_success());
  assert_eq!(events.last().unwrap(), "failed b");
  assert!(events.contains(&"configure failed b".to_string()));
}

#[tokio::test]
async fn failed_combination_is_still_cleaned() {
  let fixture = Fixture::new(&[]);
  let tool = FakeTool::new().failing("test", "ab");

  let (result, _, _) = fixture.run(&tool).await;

  assert!(matches!(result, Err(PipelineError::Phase { phase: Phase::Testing, .. })));
  assert!(!fixture.build_dir("ab").exists());
  assert!(fixture.config.output_dir.is_dir());
}

#[tokio::test]
async fn build_directories_are_removed_after_success() {
  let fixture = Fixture::new(&["c"]);
  let tool = FakeTool::new().readonly_artifacts();

  let (result, summary, _) = fixture.run(&tool).await;

  result.unwrap();
  assert_eq!(summary.cleanup_warnings, 0);
  for suffix in ["c", "ac", "bc", "abc"] {
    assert!(!fixture.build_dir(suffix).exists(), "{} left behind", suffix);
  }
}

#[tokio::test]
async fn unrecognized_toolchain_skips_tests_but_counts_attempts() {
  let fixture = Fixture::new(&["ab"]);
  let tool = FakeTool::new().compiler(Some("Intel"));

  let (result, summary, events) = fixture.run(&tool).await;

  result.unwrap();
  assert_eq!(tool.calls(), vec!["configure:ab", "compile:ab", "configure:abc", "compile:abc"]);
  assert_eq!(summary.attempted, 2);
  assert_eq!(summary.succeeded, 2);
  assert_eq!(summary.tests_skipped, 2);
  assert!(events.contains(&"tests skipped ab".to_string()));
}

#[tokio::test]
async fn failed_toolchain_query_is_treated_as_unrecognized() {
  let fixture = Fixture::new(&["abc"]);
  let tool = FakeTool::new().compiler(None);

  let (result, summary, _) = fixture.run(&tool).await;

  result.unwrap();
  assert_eq!(summary.tests_skipped, 1);
}

#[tokio::test]
async fn multi_config_toolchain_names_build_mode() {
  let mut fixture = Fixture::new(&["abc"]);
  fixture.config.mode = BuildMode::Debug;
  let tool = FakeTool::new().compiler(Some("MSVC"));

  let (result, _, _) = fixture.run(&tool).await;

  result.unwrap();
  assert_eq!(
    tool.calls(),
    vec!["configure:abcd", "compile:abcd", "test[Debug]:abcd"]
  );
}

#[tokio::test]
async fn dependency_invalid_combinations_never_reach_the_tool() {
  let registry = Registry::new(vec![
    OptionDef::new("USE_RMSE", 'r'),
    OptionDef::new("USE_FILTER", 'f').requires("USE_RMSE"),
  ])
  .unwrap();
  let fixture = Fixture::with_registry(registry, &[]);
  let tool = FakeTool::new();

  let (result, summary, _) = fixture.run(&tool).await;

  result.unwrap();
  assert_eq!(tool.calls(), phases_for(&["", "r", "rf"]));
  assert_eq!(summary.skipped_dependency, 1);
}

#[tokio::test]
async fn run_start_wipes_stale_build_root() {
  let fixture = Fixture::new(&["abc"]);
  let stale = fixture.build_dir("stale");
  std::fs::create_dir_all(&stale).unwrap();

  let (result, _, _) = fixture.run(&FakeTool::new()).await;

  result.unwrap();
  assert!(!stale.exists());
}

#[tokio::test]
async fn dry_run_leaves_filesystem_untouched() {
  let mut fixture = Fixture::new(&[]);
  fixture.config.dry_run = true;
  let tool = FakeTool::new();

  let (result, summary, _) = fixture.run(&tool).await;

  result.unwrap();
  assert_eq!(tool.calls().len(), 8 * 3);
  assert_eq!(summary.attempted, 8);
  assert!(!fixture.config.build_root.exists());
}

#[tokio::test]
async fn list_only_never_calls_the_tool() {
  let mut fixture = Fixture::new(&["b"]);
  fixture.config.list_only = true;
  fixture.config.dry_run = true;
  let tool = FakeTool::new();

  let (result, summary, events) = fixture.run(&tool).await;

  result.unwrap();
  assert!(tool.calls().is_empty());
  assert_eq!(summary.attempted, 0);
  assert_eq!(summary.headline(), "A total of 4 combinations.");
  assert_eq!(
    events,
    vec!["listed 1/4 lib_b", "listed 2/4 lib_ab", "listed 3/4 lib_bc", "listed 4/4 lib_abc"]
  );
}

#[tokio::test]
async fn cleanup_failure_does_not_mask_test_failure() {
  let fixture = Fixture::new(&[]);
  let tool = FakeTool::new().failing("test", "ab");

  let (result, summary, events) = fixture.run_with_cleanup(&tool, cleanup_sticking_on_ab).await;

  assert!(matches!(
    result,
    Err(PipelineError::Phase { phase: Phase::Testing, ref suffix, .. }) if suffix == "ab"
  ));
  assert_eq!(summary.cleanup_warnings, 1);
  assert!(summary.failure.as_deref().unwrap().starts_with("test failed for combination 'ab'"));
  assert!(events.contains(&"cleanup failed ab".to_string()));
  assert_eq!(events.last().unwrap(), "failed ab");
}

#[tokio::test]
async fn cleanup_failure_after_success_only_warns() {
  let fixture = Fixture::new(&[]);
  let tool = FakeTool::new();

  let (result, summary, events) = fixture.run_with_cleanup(&tool, cleanup_sticking_on_ab).await;

  result.unwrap();
  assert_eq!(summary.succeeded, 8);
  assert_eq!(summary.cleanup_warnings, 1);
  assert!(summary.is_success());
  assert!(events.contains(&"cleanup failed ab".to_string()));
  assert!(events.contains(&"done ab".to_string()));
  assert!(fixture.build_dir("ab").exists());
  assert!(!fixture.build_dir("abc").exists());
  assert_eq!(tool.calls(), phases_for(&["", "a", "b", "ab", "c", "ac", "bc", "abc"]));
}

#[tokio::test]
async fn debug_marker_filter_selects_debug_suffixes() {
  let mut fixture = Fixture::new(&[]);
  fixture.config.mode = BuildMode::Debug;
  fixture.config.filters = FilterSet::parse(&fixture.config.registry, BuildMode::Debug, ["acd"]).unwrap();
  let tool = FakeTool::new();

  let (result, summary, _) = fixture.run(&tool).await;

  result.unwrap();
  assert_eq!(summary.attempted, 2);
  assert_eq!(tool.calls(), phases_for(&["acd", "abcd"]));
}
