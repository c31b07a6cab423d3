//! Error types for infiniscroll.
//!
//! This module defines the error taxonomy using `thiserror` for structured error
//! handling. Errors compose via `?` and `From` conversions.
//!
//! # Error Hierarchy
//!
//! - [`AppError`] - Top-level error of the simulator binary
//!   - [`ConfigError`] - Configuration file loading or validation failures
//!   - [`LoggingError`] - Tracing subscriber setup failures
//!   - [`EngineError`] - Broken engine invariants (fatal)
//!   - `std::io::Error` / `serde_json::Error` - Trace output failures
//! - [`GatewayError`] - Pagination query failures (non-fatal, swallowed by the engine)
//!
//! # Recovery Strategy
//!
//! Pagination failures are **non-fatal**: the engine logs them, clears its loading
//! flags and leaves the items untouched, so the next scroll or manual trigger retries.
//! Rendering glitches (a freshly mounted item without a height) are logged and
//! processing continues. Only a broken key pool is fatal.

use crate::config::ConfigError;
use crate::logging::LoggingError;
use thiserror::Error;

/// Top-level error of the simulator binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tracing could not be initialized.
    #[error("Logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    /// The engine reported a broken invariant.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Writing the trace failed.
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing a trace frame failed.
    #[error("Failed to serialize trace: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Fatal engine errors.
///
/// These indicate a programmer error: rendering correctness can no longer be
/// guaranteed, so the error is returned immediately instead of being logged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The rendering key pool is smaller than the rendered slice.
    ///
    /// # Examples
    ///
    /// ```
    /// use infiniscroll::model::error::EngineError;
    ///
    /// let err = EngineError::KeyPoolExhausted { keys: 4, rendered: 6 };
    /// assert!(err.to_string().contains("4 keys"));
    /// ```
    #[error("Key pool exhausted: {keys} keys for {rendered} rendered items")]
    KeyPoolExhausted {
        /// Number of keys in the pool.
        keys: usize,
        /// Number of items in the rendered slice.
        rendered: usize,
    },
}

/// Errors returned by a [`PaginationGateway`](crate::gateway::PaginationGateway).
///
/// The engine never propagates these; a failed query resolves its job as
/// [`JobOutcome::Failed`](crate::engine::JobOutcome::Failed).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The request could not be delivered or the server failed.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The server answered with something the gateway cannot interpret.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
