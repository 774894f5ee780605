//! Configuration module for DocSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, environment overrides, validation, defaults, and a builder
//! pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable overriding `sync.folder_path`.
pub const ENV_FOLDER_PATH: &str = "DOCSYNC_FOLDER_PATH";
/// Environment variable overriding `remote.api_key`.
pub const ENV_API_KEY: &str = "DOCSYNC_API_KEY";
/// Environment variable overriding `remote.url`.
pub const ENV_URL: &str = "DOCSYNC_URL";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for DocSync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

/// Local side: what to watch, where to keep state, how much concurrency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Directory whose documents are mirrored. Required.
    pub folder_path: PathBuf,
    /// JSON file holding the checksums already synced.
    pub state_file: PathBuf,
    /// Size of the upload worker pool.
    pub max_workers: usize,
    /// Number of new checksums that triggers a state write.
    pub batch_threshold: usize,
    /// Upper bound for one upload task, retries included (seconds).
    pub task_timeout_secs: u64,
    /// Quiet period before a changed file is picked up (milliseconds).
    pub settle_delay_ms: u64,
}

/// Remote side: endpoint, credentials, retry policy and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the document service.
    pub url: String,
    /// API key sent with every request. Required.
    pub api_key: String,
    /// Total upload attempts for transient failures.
    pub retry_count: u32,
    /// Fixed delay between upload attempts (seconds).
    pub retry_delay_secs: u64,
    /// Timeout for the duplicate-check request (seconds).
    pub check_timeout_secs: u64,
    /// Timeout for the upload request (seconds).
    pub upload_timeout_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/docsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("docsync")
            .join("config.yaml")
    }

    /// Applies `DOCSYNC_*` environment variables on top of the loaded values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary lookup; empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(folder) = get(ENV_FOLDER_PATH) {
            self.sync.folder_path = PathBuf::from(folder);
        }
        if let Some(api_key) = get(ENV_API_KEY) {
            self.remote.api_key = api_key;
        }
        if let Some(url) = get(ENV_URL) {
            self.remote.url = url;
        }
    }

    /// Expands a leading `~/` in the folder and state file paths.
    pub fn expand_paths(&mut self) {
        self.sync.folder_path = expand_tilde(&self.sync.folder_path);
        self.sync.state_file = expand_tilde(&self.sync.state_file);
    }
}

impl RemoteConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

impl SyncConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Replaces a leading `~/` with the user's home directory.
///
/// Paths without the prefix, or a missing home directory, leave the path
/// unchanged.
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        let state_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("~"))
            .join(".docsync");
        Self {
            folder_path: PathBuf::new(),
            state_file: state_dir.join("sync_history.json"),
            max_workers: 5,
            batch_threshold: 10,
            task_timeout_secs: 70,
            settle_delay_ms: 1000,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: "https://docsync.example.com".to_string(),
            api_key: String::new(),
            retry_count: 3,
            retry_delay_secs: 5,
            check_timeout_secs: 10,
            upload_timeout_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.max_workers"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut must_be_positive = |field: &str, value: u64| {
            if value == 0 {
                errors.push(ValidationError {
                    field: field.into(),
                    message: "must be greater than 0".into(),
                });
            }
        };

        // --- sync ---
        must_be_positive("sync.max_workers", self.sync.max_workers as u64);
        must_be_positive("sync.batch_threshold", self.sync.batch_threshold as u64);
        must_be_positive("sync.task_timeout_secs", self.sync.task_timeout_secs);

        // --- remote ---
        must_be_positive("remote.retry_count", u64::from(self.remote.retry_count));
        must_be_positive("remote.check_timeout_secs", self.remote.check_timeout_secs);
        must_be_positive("remote.upload_timeout_secs", self.remote.upload_timeout_secs);

        if self.sync.folder_path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "sync.folder_path".into(),
                message: format!("is required (set in config file or {ENV_FOLDER_PATH})"),
            });
        } else if !self.sync.folder_path.is_dir() {
            errors.push(ValidationError {
                field: "sync.folder_path".into(),
                message: format!(
                    "directory does not exist: {}",
                    self.sync.folder_path.display()
                ),
            });
        }

        if self.sync.task_timeout_secs <= self.remote.upload_timeout_secs {
            errors.push(ValidationError {
                field: "sync.task_timeout_secs".into(),
                message: format!(
                    "must exceed remote.upload_timeout_secs ({})",
                    self.remote.upload_timeout_secs
                ),
            });
        }

        if self.remote.api_key.trim().is_empty() {
            errors.push(ValidationError {
                field: "remote.api_key".into(),
                message: format!("is required (set in config file or {ENV_API_KEY})"),
            });
        }

        if !(self.remote.url.starts_with("http://") || self.remote.url.starts_with("https://")) {
            errors.push(ValidationError {
                field: "remote.url".into(),
                message: format!("must be an http(s) URL, got '{}'", self.remote.url),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use docsync_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .folder_path(PathBuf::from("/home/user/CVs"))
///     .api_key("secret")
///     .max_workers(8)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn folder_path(mut self, path: PathBuf) -> Self {
        self.config.sync.folder_path = path;
        self
    }

    pub fn state_file(mut self, path: PathBuf) -> Self {
        self.config.sync.state_file = path;
        self
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.sync.max_workers = n;
        self
    }

    pub fn batch_threshold(mut self, n: usize) -> Self {
        self.config.sync.batch_threshold = n;
        self
    }

    pub fn task_timeout_secs(mut self, secs: u64) -> Self {
        self.config.sync.task_timeout_secs = secs;
        self
    }

    pub fn settle_delay_ms(mut self, ms: u64) -> Self {
        self.config.sync.settle_delay_ms = ms;
        self
    }

    // --- remote ---

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.remote.api_key = key.into();
        self
    }

    pub fn retry_count(mut self, n: u32) -> Self {
        self.config.remote.retry_count = n;
        self
    }

    pub fn retry_delay_secs(mut self, secs: u64) -> Self {
        self.config.remote.retry_delay_secs = secs;
        self
    }

    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.remote.upload_timeout_secs = secs;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
