//! Configuration loading via `ortho-config`.

use std::time::Duration;

use camino::Utf8Path;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Default repository root, relative to the working directory.
pub const DEFAULT_REPO_DIR: &str = "evidences";

/// Collector configuration derived from environment variables,
/// configuration files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "COLLECTOR",
    discovery(
        app_name = "collector",
        env_var = "COLLECTOR_CONFIG_PATH",
        config_file_name = "collector.toml",
        dotfile_name = ".collector.toml",
        project_file_name = "collector.toml"
    )
)]
pub struct CollectorConfig {
    /// Directory holding one repository file per instance.
    #[ortho_config(default = DEFAULT_REPO_DIR.to_owned())]
    pub repo_dir: String,
    /// How long a connection waits on a locked repository before failing.
    #[ortho_config(default = 5000)]
    pub busy_timeout_ms: u64,
    /// `tracing` filter directive used by the status CLI.
    #[ortho_config(default = "warn".to_owned())]
    pub log_filter: String,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn guidance(&self) -> String {
        format!(
            "set {} or add {} to collector.toml",
            self.env_var, self.toml_key
        )
    }
}

const REPO_DIR: FieldMetadata =
    FieldMetadata::new("repository directory", "COLLECTOR_REPO_DIR", "repo_dir");
const BUSY_TIMEOUT: FieldMetadata = FieldMetadata::new(
    "repository busy timeout",
    "COLLECTOR_BUSY_TIMEOUT_MS",
    "busy_timeout_ms",
);
const LOG_FILTER: FieldMetadata =
    FieldMetadata::new("log filter", "COLLECTOR_LOG_FILTER", "log_filter");

impl CollectorConfig {
    /// Builds a configuration rooted at `repo_dir` with default settings.
    #[must_use]
    pub fn with_repo_dir(repo_dir: impl Into<String>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            busy_timeout_ms: 5000,
            log_filter: String::from("warn"),
        }
    }

    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: {}",
                metadata.description,
                metadata.guidance()
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("collector-status")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Returns the repository root as a path.
    #[must_use]
    pub fn repo_dir(&self) -> &Utf8Path {
        Utf8Path::new(&self.repo_dir)
    }

    /// Returns the busy timeout as a [`Duration`].
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Performs semantic validation. Error messages include guidance on how to
    /// provide values via environment variables or configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty and
    /// [`ConfigError::Invalid`] when a value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(&self.repo_dir, &REPO_DIR)?;
        Self::require_field(&self.log_filter, &LOG_FILTER)?;
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(format!(
                "{} must be greater than zero: {}",
                BUSY_TIMEOUT.description,
                BUSY_TIMEOUT.guidance()
            )));
        }
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configuration value is present but unusable.
    #[error("invalid configuration value: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
