//! Configuration module.
//!
//! [`EngineConfig`] is what a [`ScrollEngine`](crate::engine::ScrollEngine) is
//! built from. The [`loader`] submodule resolves it from defaults, a TOML file,
//! environment variables and CLI flags.

pub mod loader;

pub use loader::{
    apply_cli_overrides, apply_env_overrides, default_config_path, default_log_path,
    load_config_file, load_config_with_precedence, merge_config, CliOverrides, ConfigError,
    ConfigFile, ResolvedConfig,
};

use crate::model::{Ordering, UrlParamNames};
use serde::Deserialize;
use std::time::Duration;

/// One responsive column rule.
///
/// Applies when the viewport is at most `max_width` wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaQuery {
    /// Largest viewport width (inclusive) this rule matches.
    pub max_width: i64,
    /// Grid column count while the rule applies.
    pub items_per_row: usize,
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Rows kept rendered at once. The render window holds
    /// `items_per_row * page_size` items.
    pub page_size: usize,
    /// Column count used when no media query matches.
    pub max_items_per_row: Option<usize>,
    /// Responsive column rules, evaluated in order; the last match wins.
    pub media_queries: Vec<MediaQuery>,
    /// Cap passed to the server for counting newer items.
    pub count_new_limit: usize,
    /// Vertical gap between grid rows, in pixels.
    pub row_gap: i64,
    /// Pull distance that triggers a refresh on release.
    pub pull_threshold: i64,
    /// Names of the persisted URL parameters.
    pub url_params: UrlParamNames,
    /// Minimum interval between two URL replacements.
    pub url_throttle: Duration,
    /// Ordering clauses passed through to the server.
    pub orderings: Vec<Ordering>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_items_per_row: None,
            media_queries: Vec::new(),
            count_new_limit: 100,
            row_gap: 0,
            pull_threshold: 80,
            url_params: UrlParamNames::default(),
            url_throttle: Duration::from_millis(500),
            orderings: Vec::new(),
        }
    }
}
