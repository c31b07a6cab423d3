//! Pull-to-refresh gesture.

use serde::Serialize;

/// Gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PullState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Pointer down while scrolled to the top.
    Pulling {
        /// Pointer position when the gesture began.
        origin: i64,
        /// Downward travel so far, never negative.
        distance: i64,
    },
}

impl PullState {
    /// Begin tracking at pointer position `y`.
    pub fn start(y: i64) -> Self {
        PullState::Pulling {
            origin: y,
            distance: 0,
        }
    }

    /// Follow the pointer. Pulling upward never goes below zero.
    pub fn moved(self, y: i64) -> Self {
        match self {
            PullState::Idle => PullState::Idle,
            PullState::Pulling { origin, .. } => PullState::Pulling {
                origin,
                distance: (y - origin).max(0),
            },
        }
    }

    /// Current pull distance.
    pub fn distance(&self) -> i64 {
        match self {
            PullState::Idle => 0,
            PullState::Pulling { distance, .. } => *distance,
        }
    }
}
