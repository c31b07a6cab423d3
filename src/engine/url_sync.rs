//! Throttled URL updates.
//!
//! The first change after a quiet period is emitted immediately; changes
//! inside the throttle interval are held and emitted by a trailing flush.

use crate::model::UrlParams;
use std::time::{Duration, Instant};

/// Leading-edge throttle over URL states, with a trailing flush.
#[derive(Debug, Clone)]
pub struct UrlSync {
    interval: Duration,
    last_emit: Option<Instant>,
    pending: Option<UrlParams>,
    last_params: Option<UrlParams>,
}

impl UrlSync {
    /// Throttle to at most one update per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
            pending: None,
            last_params: None,
        }
    }

    /// Offer new params. Returns the params to emit now, if any.
    pub fn offer(&mut self, params: UrlParams, now: Instant) -> Option<UrlParams> {
        if self.last_params.as_ref() == Some(&params) {
            self.pending = None;
            return None;
        }
        let quiet = self
            .last_emit
            .is_none_or(|at| now.saturating_duration_since(at) >= self.interval);
        if quiet {
            self.emit(params, now)
        } else {
            self.pending = Some(params);
            None
        }
    }

    /// Emit held params once the interval has elapsed.
    pub fn flush(&mut self, now: Instant) -> Option<UrlParams> {
        let due = self
            .last_emit
            .is_none_or(|at| now.saturating_duration_since(at) >= self.interval);
        if !due {
            return None;
        }
        let params = self.pending.take()?;
        self.emit(params, now)
    }

    /// Forget everything, e.g. after a reset.
    pub fn clear(&mut self) {
        self.pending = None;
        self.last_params = None;
    }

    fn emit(&mut self, params: UrlParams, now: Instant) -> Option<UrlParams> {
        self.pending = None;
        self.last_emit = Some(now);
        self.last_params = Some(params.clone());
        Some(params)
    }
}
