//! Round transition phases, shared between the engine and the store.
//!
//! A transition moves `Idle -> Computing -> Stamping -> Resetting -> Idle`.
//! The store reports each step through a [`TransitionProgress`] so that the
//! engine (and the `/api/game` endpoint) can see where an in-flight
//! transition is, even when the store runs the whole thing as one
//! transaction.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Phase of the round transition state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    /// No transition in flight.
    Idle,
    /// Ranking provinces to find the worst one.
    Computing,
    /// Writing the destroyment round onto the worst province.
    Stamping,
    /// Zeroing every province's counters.
    Resetting,
}

impl EnginePhase {
    const fn to_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Computing => 1,
            Self::Stamping => 2,
            Self::Resetting => 3,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Computing,
            2 => Self::Stamping,
            3 => Self::Resetting,
            _ => Self::Idle,
        }
    }
}

impl core::fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Computing => "computing",
            Self::Stamping => "stamping",
            Self::Resetting => "resetting",
        };
        f.write_str(name)
    }
}

/// Lock-free phase tracker.
#[derive(Debug)]
pub struct TransitionProgress {
    phase: AtomicU8,
}

impl TransitionProgress {
    /// A tracker in [`EnginePhase::Idle`].
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(EnginePhase::Idle.to_u8()),
        }
    }

    /// Record entry into `phase`.
    pub fn enter(&self, phase: EnginePhase) {
        tracing::trace!(%phase, "round transition phase");
        self.phase.store(phase.to_u8(), Ordering::Release);
    }

    /// The phase most recently entered.
    pub fn current(&self) -> EnginePhase {
        EnginePhase::from_u8(self.phase.load(Ordering::Acquire))
    }
}

impl Default for TransitionProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the tracker to [`EnginePhase::Idle`] when dropped, including
/// when the transition future is cancelled mid-flight.
#[derive(Debug)]
pub struct IdleOnDrop<'a>(pub &'a TransitionProgress);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.enter(EnginePhase::Idle);
    }
}
