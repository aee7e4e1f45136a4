pub const APP_NAME: &str = "featmatrix";

/// Environment variable overriding the parallelism hint passed to the compile step.
pub const JOBS_ENV: &str = "FEATMATRIX_JOBS";

/// Fallback job count when the host parallelism cannot be detected.
pub const DEFAULT_JOBS: usize = 4;

/// Character appended to a suffix when building in debug mode.
pub const DEBUG_MARKER: char = 'd';

/// Filter spellings that stand for the empty token.
///
/// Some shells (Windows CMD in particular) cannot pass an empty argument.
pub const EMPTY_FILTER_TOKENS: [&str; 2] = ["__EMPTY__", "\"\""];

/// Prefix of per-combination build directories under the build root.
pub const BUILD_DIR_PREFIX: &str = "_build_";

/// Configure variable receiving the output directory.
pub const DEFAULT_OUTPUT_VAR: &str = "VI_TM_OUTPUT_PATH";

/// Registries are carried as a bitmask, which bounds their size.
pub const MAX_OPTIONS: usize = 32;
