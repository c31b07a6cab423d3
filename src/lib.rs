//! infiniscroll
//!
//! Headless virtualized infinite-scrolling list engine with bidirectional
//! cursor pagination.
//!
//! This is the library root. The engine is a Pure Core: it consumes events and
//! emits effects. [`integration`] is the Impure Shell that carries the effects
//! out against a pagination gateway and a presentation host.

pub mod config;
pub mod engine;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod sim;

// Re-export main loop integration
pub mod integration;
