//! Run parameters and environment settings.
//!
//! [`RunConfig`] carries the validated command-line parameters of one run.
//! [`Settings`] holds tunables read from `NUGRAPH_*` environment variables.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Default version selector.
pub const LATEST: &str = "latest";

/// Parameters of one resolution run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Root package id
    pub package: String,
    /// Service index URL, or fixture path in test mode
    pub repository: String,
    /// Root version selector ("latest" or an exact version)
    pub version: String,
    /// Maximum traversal depth; must be positive
    pub max_depth: i64,
    /// Package id substring filter; empty keeps everything
    pub filter: String,
    /// Print an ASCII tree instead of writing a diagram
    pub ascii_tree: bool,
    /// Diagram output path
    pub output: PathBuf,
    /// Read `repository` as a local fixture file
    pub test_mode: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            package: String::new(),
            repository: String::new(),
            version: LATEST.to_string(),
            max_depth: 10,
            filter: String::new(),
            ascii_tree: false,
            output: PathBuf::from("graph.png"),
            test_mode: false,
        }
    }
}

impl RunConfig {
    /// Checks every parameter and reports all problems at once.
    ///
    /// # Example
    ///
    /// ```rust
    /// use nugraph::config::RunConfig;
    ///
    /// let config = RunConfig { package: " ".into(), max_depth: 0, ..RunConfig::default() };
    /// let err = config.validate().unwrap_err();
    /// assert_eq!(err.problems.len(), 3);
    /// ```
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut problems = Vec::new();

        if self.package.trim().is_empty() {
            problems.push("package name must not be empty".to_string());
        }
        if self.repository.trim().is_empty() {
            problems.push("repository must not be empty".to_string());
        }
        if self.max_depth <= 0 {
            problems.push(format!(
                "max depth must be greater than 0 (got {})",
                self.max_depth
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { problems })
        }
    }

    /// The depth bound as an unsigned count; zero for invalid configs.
    pub fn depth_limit(&self) -> usize {
        usize::try_from(self.max_depth).unwrap_or(0)
    }

    /// Parameters as `(key, value)` pairs for display.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("package", self.package.clone()),
            ("repository", self.repository.clone()),
            ("test_mode", self.test_mode.to_string()),
            ("version", self.version.clone()),
            ("output", self.output.display().to_string()),
            ("ascii_tree", self.ascii_tree.to_string()),
            ("max_depth", self.max_depth.to_string()),
            ("filter", self.filter.clone()),
        ]
    }
}

/// Malformed command-line input. Lists every problem found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct ValidationError {
    /// One message per invalid parameter
    pub problems: Vec<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid parameters:")?;
        for problem in &self.problems {
            write!(f, "\n  - {}", problem)?;
        }
        Ok(())
    }
}

/// Tunables read from the environment.
///
/// | Variable                     | Default          |
/// |------------------------------|------------------|
/// | `NUGRAPH_HTTP_TIMEOUT_SECS`  | 30               |
/// | `NUGRAPH_PARALLELISM`        | 8                |
/// | `NUGRAPH_USER_AGENT`         | `nugraph/<ver>`  |
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Per-request timeout for registry calls, in seconds
    #[serde(default = "default_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Concurrent registry fetches per traversal level; 1 disables parallelism
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// User-Agent header sent to live registries
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_parallelism() -> usize {
    8
}

fn default_user_agent() -> String {
    concat!("nugraph/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_timeout_secs(),
            parallelism: default_parallelism(),
            user_agent: default_user_agent(),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Reads settings from `env` instead of the process environment when given.
    pub fn load_from(env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(
                Environment::with_prefix("NUGRAPH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }

    /// Registry request timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
