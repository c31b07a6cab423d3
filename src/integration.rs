//! Impure shell around the engine.
//!
//! The engine only emits effects. [`Driver::pump`] carries them out against
//! a [`PaginationGateway`] and a [`Host`] until the engine goes quiet, in
//! the order the engine expects: gateway results first, then the render,
//! then the scroll correction, then the commit.

use crate::engine::{Effect, JobId, JobOutcome, Measure, RenderDescription, ScrollEngine};
use crate::gateway::PaginationGateway;
use crate::model::{EngineError, Identify, UrlParams};
use serde::Serialize;
use tracing::{trace, warn};

/// Rounds after which a pump gives up.
pub const DEFAULT_MAX_ROUNDS: usize = 256;

/// Presentation layer the driver renders into.
pub trait Host<T: Identify>: Measure<T::Id> {
    /// Draw a description and report which items were mounted and unmounted.
    fn render(&mut self, description: &RenderDescription<'_, T>) -> MountDiff<T::Id>;

    /// Scroll the viewport. Returns the position actually reached.
    fn scroll_to(&mut self, y: i64) -> i64;

    /// Current scroll position.
    fn scroll_y(&self) -> i64;

    /// Update the address bar.
    fn replace_url(&mut self, params: &UrlParams);
}

/// Mount changes caused by one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountDiff<Id> {
    /// Items that appeared.
    pub mounted: Vec<Id>,
    /// Items that went away.
    pub unmounted: Vec<Id>,
}

impl<Id> Default for MountDiff<Id> {
    fn default() -> Self {
        Self {
            mounted: Vec::new(),
            unmounted: Vec::new(),
        }
    }
}

/// What one pump did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PumpReport {
    /// Effect batches processed.
    pub rounds: usize,
    /// Gateway queries run.
    pub queries: usize,
    /// Renders performed.
    pub renders: usize,
    /// Scroll corrections applied.
    pub scrolls: usize,
    /// Jobs that resolved, in order.
    pub finished: Vec<(JobId, JobOutcome)>,
    /// Last URL state emitted, if any.
    pub url: Option<UrlParams>,
    /// True if the pump stopped at the round limit.
    pub truncated: bool,
}

impl PumpReport {
    /// Fold a later pump into this one.
    pub fn absorb(&mut self, later: PumpReport) {
        self.rounds += later.rounds;
        self.queries += later.queries;
        self.renders += later.renders;
        self.scrolls += later.scrolls;
        self.finished.extend(later.finished);
        if later.url.is_some() {
            self.url = later.url;
        }
        self.truncated |= later.truncated;
    }
}

/// Runs engine effects against a gateway and a host.
#[derive(Debug)]
pub struct Driver<G> {
    gateway: G,
    max_rounds: usize,
}

impl<G> Driver<G> {
    /// Drive effects against `gateway`.
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Stop a pump after `max_rounds` effect batches.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// The gateway queries go to.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Mutable access to the gateway, e.g. to change backend data.
    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// Carry out effects until the engine has none left.
    ///
    /// # Errors
    ///
    /// Propagates fatal [`EngineError`]s.
    pub fn pump<T, H>(
        &mut self,
        engine: &mut ScrollEngine<T>,
        host: &mut H,
    ) -> Result<PumpReport, EngineError>
    where
        T: Identify,
        G: PaginationGateway<T>,
        H: Host<T>,
    {
        let mut report = PumpReport::default();

        while engine.has_effects() {
            if report.rounds >= self.max_rounds {
                warn!(rounds = report.rounds, "Engine did not settle, stopping pump");
                report.truncated = true;
                break;
            }
            report.rounds += 1;

            let mut rerender = false;
            let mut scroll_target = None;
            for effect in engine.take_effects() {
                match effect {
                    Effect::Query(request) => {
                        report.queries += 1;
                        let result = self.gateway.query(&request.args, request.query_type);
                        engine.complete(request.id, result)?;
                    }
                    Effect::ScrollTo { y } => scroll_target = Some(y),
                    Effect::ReplaceUrl(params) => {
                        host.replace_url(&params);
                        report.url = Some(params);
                    }
                    Effect::JobFinished { job, outcome } => report.finished.push((job, outcome)),
                    Effect::Rerender => rerender = true,
                }
            }

            if rerender {
                let diff = {
                    let description = engine.render();
                    host.render(&description)
                };
                trace!(
                    mounted = diff.mounted.len(),
                    unmounted = diff.unmounted.len(),
                    "Rendered"
                );
                for id in &diff.unmounted {
                    engine.item_unmounted(id);
                }
                for id in diff.mounted {
                    engine.item_mounted(id);
                }
                report.renders += 1;
            }

            if let Some(y) = scroll_target {
                let reached = host.scroll_to(y);
                engine.on_scroll(reached, &*host)?;
                report.scrolls += 1;
            }

            if rerender {
                engine.commit(&*host)?;
            }
        }

        Ok(report)
    }
}
