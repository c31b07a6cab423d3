//! Simulated feed and presentation layer.
//!
//! Used by the `infiniscroll` binary and the test-suite to run the engine
//! end to end without a browser.

pub mod host;

pub use host::SimulatedHost;

use crate::config::EngineConfig;
use crate::engine::{EngineSnapshot, ScrollEngine, Viewport};
use crate::gateway::MemoryGateway;
use crate::integration::{Driver, Host, PumpReport, DEFAULT_MAX_ROUNDS};
use crate::model::{EngineError, Identify, UrlParams};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

/// Item with a layout height that depends on the column width.
pub trait Block {
    /// Rendered height in a column `width` pixels wide.
    fn height_at(&self, width: i64) -> i64;
}

/// A post in the simulated feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    /// Post id, unique within a feed.
    pub id: u64,
    /// Body length in characters.
    pub body: u32,
}

impl Identify for FeedItem {
    type Id = u64;

    fn item_id(&self) -> u64 {
        self.id
    }
}

impl Block for FeedItem {
    /// A 40px header plus 20px per wrapped line of 8px characters.
    fn height_at(&self, width: i64) -> i64 {
        let chars_per_line = (width / 8).max(1) as u64;
        let lines = u64::from(self.body).div_ceil(chars_per_line).max(1) as i64;
        40 + 20 * lines
    }
}

/// Deterministic feed with ids `ids`, body lengths drawn from `seed`.
pub fn feed(ids: std::ops::Range<u64>, seed: u64) -> Vec<FeedItem> {
    let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
    ids.map(|id| {
        // xorshift64*
        state ^= state >> 12;
        state ^= state << 25;
        state ^= state >> 27;
        let draw = state.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 33;
        FeedItem {
            id,
            body: 20 + (draw % 400) as u32,
        }
    })
    .collect()
}

/// Engine, simulated host and in-memory gateway wired together.
#[derive(Debug)]
pub struct Simulation {
    /// The engine under test.
    pub engine: ScrollEngine<FeedItem>,
    /// Presentation layer the engine renders into.
    pub host: SimulatedHost<FeedItem>,
    /// Effect runner owning the backend.
    pub driver: Driver<MemoryGateway<FeedItem>>,
    /// Simulated time. Only [`wait`](Self::wait) moves it.
    clock: Instant,
}

impl Simulation {
    /// Wire up a fresh engine over `items`. Nothing is loaded yet.
    pub fn new(config: EngineConfig, viewport: Viewport, items: Vec<FeedItem>) -> Self {
        let clock = Instant::now();
        let mut engine = ScrollEngine::new(config, viewport);
        engine.advance_clock(clock);
        Self {
            engine,
            host: SimulatedHost::new(viewport),
            driver: Driver::new(MemoryGateway::new(items)),
            clock,
        }
    }

    /// Start from URL state read at startup.
    pub fn resumed(
        config: EngineConfig,
        viewport: Viewport,
        items: Vec<FeedItem>,
        params: UrlParams,
    ) -> Self {
        let mut sim = Self::new(config, viewport, items);
        sim.engine = ScrollEngine::new(sim.engine.config().clone(), viewport).resume_from(params);
        sim.engine.advance_clock(sim.clock);
        sim
    }

    /// Queue the initial load and settle.
    ///
    /// # Errors
    ///
    /// Propagates fatal engine errors.
    pub fn mount(&mut self) -> Result<PumpReport, EngineError> {
        self.engine.mount();
        self.settle()
    }

    /// Pump until neither the engine nor the host has anything left to do.
    ///
    /// A render that shrinks the document clamps the host's scroll position;
    /// that clamp reaches the engine as a native scroll event.
    ///
    /// # Errors
    ///
    /// Propagates fatal engine errors.
    pub fn settle(&mut self) -> Result<PumpReport, EngineError> {
        let mut report = self.driver.pump(&mut self.engine, &mut self.host)?;
        for _ in 0..DEFAULT_MAX_ROUNDS {
            let host_y = self.host.scroll_y();
            if host_y == self.engine.scroll_y() && !self.engine.has_effects() {
                break;
            }
            if host_y != self.engine.scroll_y() {
                debug!(host_y, engine_y = self.engine.scroll_y(), "Host clamped scroll");
                self.engine.on_scroll(host_y, &self.host)?;
            }
            let next = self.driver.pump(&mut self.engine, &mut self.host)?;
            report.absorb(next);
        }
        Ok(report)
    }

    /// User scroll to an absolute position.
    ///
    /// # Errors
    ///
    /// Propagates fatal engine errors.
    pub fn scroll_to(&mut self, y: i64) -> Result<PumpReport, EngineError> {
        let reached = self.host.scroll_to(y);
        self.engine.on_scroll(reached, &self.host)?;
        self.settle()
    }

    /// User scroll by a relative amount.
    ///
    /// # Errors
    ///
    /// Propagates fatal engine errors.
    pub fn scroll_by(&mut self, dy: i64) -> Result<PumpReport, EngineError> {
        let y = self.host.scroll_y() + dy;
        self.scroll_to(y)
    }

    /// Resize the viewport on both sides.
    ///
    /// # Errors
    ///
    /// Propagates fatal engine errors.
    pub fn resize(&mut self, viewport: Viewport) -> Result<PumpReport, EngineError> {
        self.host.resize(viewport);
        self.engine.on_resize(viewport)?;
        self.settle()
    }

    /// Let `elapsed` pass, then flush any throttled URL update.
    ///
    /// # Errors
    ///
    /// Propagates fatal engine errors.
    pub fn wait(&mut self, elapsed: Duration) -> Result<PumpReport, EngineError> {
        self.clock += elapsed;
        self.engine.flush_url(self.clock);
        self.settle()
    }

    /// Publish newer items on the backend.
    pub fn publish(&mut self, items: Vec<FeedItem>) {
        self.driver.gateway_mut().prepend(items);
    }

    /// Host scroll position.
    pub fn scroll_y(&self) -> i64 {
        self.host.scroll_y()
    }

    /// Furthest the host can scroll.
    pub fn max_scroll(&self) -> i64 {
        self.host.max_scroll()
    }

    /// Engine state for assertions and traces.
    pub fn snapshot(&self) -> EngineSnapshot {
        self.engine.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_is_deterministic() {
        assert_eq!(feed(0..10, 7), feed(0..10, 7));
        assert_ne!(feed(0..10, 7), feed(0..10, 8));
    }

    #[test]
    fn feed_uses_requested_ids() {
        let items = feed(100..103, 1);
        let ids: Vec<u64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![100, 101, 102]);
    }

    #[test]
    fn height_grows_as_columns_narrow() {
        let item = FeedItem { id: 0, body: 100 };
        // 100 chars at 50 per line -> 2 lines
        assert_eq!(item.height_at(400), 80);
        // 100 chars at 12 per line -> 9 lines
        assert_eq!(item.height_at(100), 220);
        assert_eq!(FeedItem { id: 1, body: 0 }.height_at(400), 60);
    }
}
