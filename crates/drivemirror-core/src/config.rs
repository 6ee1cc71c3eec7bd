//! Configuration module for DriveMirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default Google Drive v3 REST endpoint.
pub const DEFAULT_DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Largest page size the Drive listing endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 1000;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for DriveMirror.
///
/// Every section is optional in the YAML file; missing sections and fields
/// fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub drive: DriveConfig,
    pub rate_limiting: RateLimitingConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
}

/// Remote service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Base URL of the Drive REST API.
    pub base_url: String,
    /// Items requested per listing page (1..=1000).
    pub page_size: u32,
    /// Whether trashed items take part in listings.
    pub include_trashed: bool,
}

/// Client-side rate limiting and retry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitingConfig {
    /// Steady-state request rate per endpoint category.
    pub requests_per_second: f64,
    /// Token bucket capacity per endpoint category.
    pub burst: u32,
    /// Retries of a transient failure before giving up.
    pub max_retries: u32,
    /// First backoff delay (in milliseconds); doubles on each retry.
    pub base_backoff_ms: u64,
    /// Upper bound for a single backoff delay (in milliseconds).
    pub max_backoff_ms: u64,
}

/// What to do when the target holds several folders with the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateFolderPolicy {
    /// Use the first match in listing order.
    #[default]
    FirstMatch,
    /// Refuse to pick one and fail the sync.
    Error,
}

/// Synchronization defaults (each can be overridden per command).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Descend into subfolders.
    pub recursive: bool,
    /// List only; never create or copy.
    pub dry_run: bool,
    /// Handling of duplicate-named target folders.
    pub duplicate_folders: DuplicateFolderPolicy,
    /// Abort a branch that revisits one of its own ancestors.
    pub detect_cycles: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

/// Credential lookup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// JSON file holding the OAuth access token.
    pub credentials_file: PathBuf,
    /// Environment variable that overrides the credentials file.
    pub access_token_env: String,
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
    /// Typically `$XDG_CONFIG_HOME/drivemirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        config_dir().join("config.yaml")
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("drivemirror")
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DRIVE_BASE_URL.to_string(),
            page_size: 100,
            include_trashed: false,
        }
    }
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10.0,
            burst: 100,
            max_retries: 5,
            base_backoff_ms: 1_000,
            max_backoff_ms: 32_000,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            dry_run: false,
            duplicate_folders: DuplicateFolderPolicy::FirstMatch,
            detect_cycles: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_file: config_dir().join("credentials.json"),
            access_token_env: "DRIVEMIRROR_ACCESS_TOKEN".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"drive.page_size"`.
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

        // --- drive ---
        if !self.drive.base_url.starts_with("http://") && !self.drive.base_url.starts_with("https://")
        {
            errors.push(ValidationError {
                field: "drive.base_url".into(),
                message: format!("must be an http(s) URL, got '{}'", self.drive.base_url),
            });
        }
        if self.drive.page_size == 0 || self.drive.page_size > MAX_PAGE_SIZE {
            errors.push(ValidationError {
                field: "drive.page_size".into(),
                message: format!("must be in range 1..={MAX_PAGE_SIZE}"),
            });
        }

        // --- rate_limiting ---
        let rate = self.rate_limiting.requests_per_second;
        if rate.is_nan() || rate <= 0.0 {
            errors.push(ValidationError {
                field: "rate_limiting.requests_per_second".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.rate_limiting.burst == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.burst".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.rate_limiting.base_backoff_ms > self.rate_limiting.max_backoff_ms {
            errors.push(ValidationError {
                field: "rate_limiting.base_backoff_ms".into(),
                message: format!(
                    "base_backoff_ms ({}) must not exceed max_backoff_ms ({})",
                    self.rate_limiting.base_backoff_ms, self.rate_limiting.max_backoff_ms
                ),
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

        // --- auth ---
        if self.auth.access_token_env.trim().is_empty() {
            errors.push(ValidationError {
                field: "auth.access_token_env".into(),
                message: "must not be empty".into(),
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
/// ```rust
/// use drivemirror_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .drive_page_size(500)
///     .sync_recursive(false)
///     .logging_level("debug")
///     .build();
/// assert_eq!(config.drive.page_size, 500);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self::default()
    }

    // --- drive ---

    pub fn drive_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.drive.base_url = url.into();
        self
    }

    pub fn drive_page_size(mut self, size: u32) -> Self {
        self.config.drive.page_size = size;
        self
    }

    pub fn drive_include_trashed(mut self, include: bool) -> Self {
        self.config.drive.include_trashed = include;
        self
    }

    // --- rate_limiting ---

    pub fn rate_limiting_requests_per_second(mut self, rate: f64) -> Self {
        self.config.rate_limiting.requests_per_second = rate;
        self
    }

    pub fn rate_limiting_burst(mut self, burst: u32) -> Self {
        self.config.rate_limiting.burst = burst;
        self
    }

    pub fn rate_limiting_max_retries(mut self, n: u32) -> Self {
        self.config.rate_limiting.max_retries = n;
        self
    }

    pub fn rate_limiting_backoff_ms(mut self, base: u64, max: u64) -> Self {
        self.config.rate_limiting.base_backoff_ms = base;
        self.config.rate_limiting.max_backoff_ms = max;
        self
    }

    // --- sync ---

    pub fn sync_recursive(mut self, recursive: bool) -> Self {
        self.config.sync.recursive = recursive;
        self
    }

    pub fn sync_dry_run(mut self, dry_run: bool) -> Self {
        self.config.sync.dry_run = dry_run;
        self
    }

    pub fn sync_duplicate_folders(mut self, policy: DuplicateFolderPolicy) -> Self {
        self.config.sync.duplicate_folders = policy;
        self
    }

    pub fn sync_detect_cycles(mut self, detect: bool) -> Self {
        self.config.sync.detect_cycles = detect;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- auth ---

    pub fn auth_credentials_file(mut self, path: PathBuf) -> Self {
        self.config.auth.credentials_file = path;
        self
    }

    pub fn auth_access_token_env(mut self, name: impl Into<String>) -> Self {
        self.config.auth.access_token_env = name.into();
        self
    }

    /// Consume the builder and return the final [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}
