//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into
//! services. The intent is to avoid reading process-wide environment
//! variables during request handling, which can lead to inconsistent
//! behaviour in multi-threaded runtimes and test harnesses.

use std::path::{Path, PathBuf};

/// Name of the per-entity source directory under the data root.
pub const SOURCE_DIR_NAME: &str = "data-src";

/// Name of the compiled-documents directory under the data root.
pub const COMPILED_DIR_NAME: &str = "data";

/// Default data root when no override is provided.
pub const DEFAULT_DATA_DIR: &str = ".";

/// Core configuration resolved at startup.
///
/// The data root contains both trees the pipeline works with:
///
/// ```text
/// <data_dir>/
/// ├── data-src/        # authoritative, one JSON file per entity
/// │   ├── medications/
/// │   ├── medication-classes/
/// │   ├── physical-exam/
/// │   └── conditions/
/// └── data/            # derived, one compiled document per collection
/// ```
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig` rooted at `data_dir`.
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn source_dir(&self) -> PathBuf {
        self.data_dir.join(SOURCE_DIR_NAME)
    }

    pub fn compiled_dir(&self) -> PathBuf {
        self.data_dir.join(COMPILED_DIR_NAME)
    }
}

/// Resolve the data root from an optional environment value.
///
/// If `value` is `None` or empty/whitespace, returns the default data root.
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}
