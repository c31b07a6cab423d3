//! Configuration file loading with precedence handling.

use super::{EngineConfig, MediaQuery};
use crate::model::{Ordering, UrlParamNames};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file path contains invalid UTF-8 or cannot be resolved.
    #[error("Invalid config path: {0}")]
    InvalidPath(String),

    /// Failed to read config file (file may not exist or have permission issues).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML syntax.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },

    /// A value is syntactically fine but unusable.
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// All fields are optional - if not specified, hardcoded defaults are used.
/// Corresponds to `~/.config/infiniscroll/config.toml`.
///
/// ```toml
/// page_size = 12
/// max_items_per_row = 4
///
/// [[media_queries]]
/// max_width = 1024
/// items_per_row = 3
///
/// [[media_queries]]
/// max_width = 640
/// items_per_row = 1
///
/// [[orderings]]
/// index = "created_at"
/// direction = "desc"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Rows kept rendered at once.
    #[serde(default)]
    pub page_size: Option<usize>,

    /// Column count when no media query matches.
    #[serde(default)]
    pub max_items_per_row: Option<usize>,

    /// Responsive column rules.
    #[serde(default)]
    pub media_queries: Option<Vec<MediaQuery>>,

    /// Cap for the server's new-item count.
    #[serde(default)]
    pub count_new_limit: Option<usize>,

    /// Gap between grid rows in pixels.
    #[serde(default)]
    pub row_gap: Option<i64>,

    /// Pull-to-refresh threshold in pixels.
    #[serde(default)]
    pub pull_threshold: Option<i64>,

    /// Minimum milliseconds between URL replacements.
    #[serde(default)]
    pub url_throttle_ms: Option<u64>,

    /// Names of the persisted URL parameters.
    #[serde(default)]
    pub url_params: Option<UrlParamNames>,

    /// Ordering clauses passed to the server.
    #[serde(default)]
    pub orderings: Option<Vec<Ordering>>,

    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,
}

/// Resolved configuration after applying precedence rules.
///
/// Created by merging defaults, config file, env vars, and CLI args.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Rows kept rendered at once.
    pub page_size: usize,
    /// Column count when no media query matches.
    pub max_items_per_row: Option<usize>,
    /// Responsive column rules.
    pub media_queries: Vec<MediaQuery>,
    /// Cap for the server's new-item count.
    pub count_new_limit: usize,
    /// Gap between grid rows.
    pub row_gap: i64,
    /// Pull-to-refresh threshold.
    pub pull_threshold: i64,
    /// Minimum interval between URL replacements.
    pub url_throttle: Duration,
    /// URL parameter names.
    pub url_params: UrlParamNames,
    /// Ordering clauses.
    pub orderings: Vec<Ordering>,
    /// Path to log file for tracing output.
    pub log_file_path: PathBuf,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            page_size: engine.page_size,
            max_items_per_row: engine.max_items_per_row,
            media_queries: engine.media_queries,
            count_new_limit: engine.count_new_limit,
            row_gap: engine.row_gap,
            pull_threshold: engine.pull_threshold,
            url_throttle: engine.url_throttle,
            url_params: engine.url_params,
            orderings: engine.orderings,
            log_file_path: default_log_path(),
        }
    }
}

impl ResolvedConfig {
    /// Validate and convert into the engine's settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero page size or a zero column count.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "page_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_items_per_row == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_items_per_row",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(rule) = self.media_queries.iter().find(|q| q.items_per_row == 0) {
            return Err(ConfigError::Invalid {
                field: "media_queries",
                reason: format!("rule for max_width {} has zero columns", rule.max_width),
            });
        }
        if self.row_gap < 0 {
            return Err(ConfigError::Invalid {
                field: "row_gap",
                reason: format!("must not be negative (got {})", self.row_gap),
            });
        }

        Ok(EngineConfig {
            page_size: self.page_size,
            max_items_per_row: self.max_items_per_row,
            media_queries: self.media_queries.clone(),
            count_new_limit: self.count_new_limit,
            row_gap: self.row_gap,
            pull_threshold: self.pull_threshold,
            url_params: self.url_params.clone(),
            url_throttle: self.url_throttle,
            orderings: self.orderings.clone(),
        })
    }
}

/// Overrides taken from command-line flags.
///
/// `None` means the flag was not given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// `--page-size`
    pub page_size: Option<usize>,
    /// `--max-items-per-row`
    pub max_items_per_row: Option<usize>,
    /// `--log-file`
    pub log_file_path: Option<PathBuf>,
}

/// Resolve default log file path.
///
/// Returns `~/.local/state/infiniscroll/infiniscroll.log` on Unix-like systems,
/// or appropriate platform path on other systems.
///
/// If state directory cannot be determined, falls back to current directory.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        state_dir.join("infiniscroll").join("infiniscroll.log")
    } else {
        PathBuf::from("infiniscroll.log")
    }
}

/// Load configuration file from a specific path.
///
/// Returns `Ok(None)` if file doesn't exist (not an error - use defaults).
/// Returns `Err` if file exists but cannot be read or parsed.
///
/// # Errors
///
/// Returns error if file exists but has read or parse errors.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();

    // Missing file is not an error - use defaults
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    Ok(Some(config))
}

/// Resolve default config file path.
///
/// Returns `~/.config/infiniscroll/config.toml` on Unix, appropriate path on other platforms.
/// Returns `None` if home directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("infiniscroll").join("config.toml"))
}

/// Load configuration with precedence handling.
///
/// Precedence (highest to lowest):
/// 1. Explicit `config_path` argument (CLI `--config`)
/// 2. `INFINISCROLL_CONFIG` environment variable
/// 3. Default path `~/.config/infiniscroll/config.toml`
///
/// Missing config files are NOT errors - defaults are used.
///
/// # Errors
///
/// Returns error only if a config file exists but cannot be read or parsed.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }

    if let Ok(env_path) = std::env::var("INFINISCROLL_CONFIG") {
        if env_path.is_empty() {
            return Err(ConfigError::InvalidPath(
                "INFINISCROLL_CONFIG is set but empty".to_string(),
            ));
        }
        return load_config_file(PathBuf::from(env_path));
    }

    if let Some(default_path) = default_config_path() {
        return load_config_file(default_path);
    }

    Ok(None)
}

/// Apply environment variable overrides to resolved config.
///
/// Checks for:
/// - `INFINISCROLL_PAGE_SIZE`: Override page size (ignored with a warning if not a number)
/// - `INFINISCROLL_LOG`: Override log file path
pub fn apply_env_overrides(mut config: ResolvedConfig) -> ResolvedConfig {
    if let Ok(raw) = std::env::var("INFINISCROLL_PAGE_SIZE") {
        match raw.parse() {
            Ok(page_size) => config.page_size = page_size,
            Err(_) => warn!(value = %raw, "Ignoring non-numeric INFINISCROLL_PAGE_SIZE"),
        }
    }

    if let Ok(path) = std::env::var("INFINISCROLL_LOG") {
        if !path.is_empty() {
            config.log_file_path = PathBuf::from(path);
        }
    }

    config
}

/// Merge config file into defaults to create resolved config.
///
/// For each field in `ConfigFile`, if `Some(value)`, use it; otherwise use default.
pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    let Some(config) = config_file else {
        return defaults;
    };

    ResolvedConfig {
        page_size: config.page_size.unwrap_or(defaults.page_size),
        max_items_per_row: config.max_items_per_row.or(defaults.max_items_per_row),
        media_queries: config.media_queries.unwrap_or(defaults.media_queries),
        count_new_limit: config.count_new_limit.unwrap_or(defaults.count_new_limit),
        row_gap: config.row_gap.unwrap_or(defaults.row_gap),
        pull_threshold: config.pull_threshold.unwrap_or(defaults.pull_threshold),
        url_throttle: config
            .url_throttle_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.url_throttle),
        url_params: config.url_params.unwrap_or(defaults.url_params),
        orderings: config.orderings.unwrap_or(defaults.orderings),
        log_file_path: config.log_file_path.unwrap_or(defaults.log_file_path),
    }
}

/// Apply CLI argument overrides to resolved config.
///
/// CLI args have the highest precedence and override all other sources.
/// Only applies overrides for flags that were explicitly set by the user.
///
/// Precedence chain: Defaults → Config File → Env Vars → CLI Args (highest)
pub fn apply_cli_overrides(mut config: ResolvedConfig, overrides: CliOverrides) -> ResolvedConfig {
    if let Some(page_size) = overrides.page_size {
        config.page_size = page_size;
    }

    if let Some(max_items_per_row) = overrides.max_items_per_row {
        config.max_items_per_row = Some(max_items_per_row);
    }

    if let Some(path) = overrides.log_file_path {
        config.log_file_path = path;
    }

    config
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
