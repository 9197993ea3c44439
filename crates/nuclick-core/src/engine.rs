//! The destroyment engine: one round transition per scheduling cycle.
//!
//! A transition ranks every province, stamps the worst one with the round
//! index, and zeroes all counters:
//!
//! ```text
//! Idle -> Computing -> Stamping -> Resetting -> Idle
//!           |
//!           +-- empty store --> EmptyCollection (no-op) --> Idle
//! ```
//!
//! The engine is single-flight: a second call waits for the first to finish
//! and then runs against the already-reset state. A repeated call for the
//! same round with no votes in between re-targets the province that already
//! carries that round's stamp, so a double fire overwrites one stamp with
//! the same value and resets counters that are already zero. Votes cast
//! between the two calls are ranked normally.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use nuclick_types::ProvinceId;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::deadline::with_deadline;
use crate::progress::{EnginePhase, IdleOnDrop, TransitionProgress};
use crate::store::{ProvinceStore, StoreError};

/// Errors from [`DestroymentEngine::execute_round`].
#[derive(Debug, thiserror::Error)]
pub enum RoundError {
    /// There were no provinces to rank. The transition was a no-op.
    #[error("no provinces to rank; round {round} transition skipped")]
    EmptyCollection {
        /// Round that was requested.
        round: u32,
    },

    /// The trigger fell before the game start date. Nothing was touched.
    #[error("game starts at {starts_at}; transition at {fired_at} skipped")]
    NotStarted {
        /// Configured start date.
        starts_at: DateTime<Utc>,
        /// Instant the transition was requested for.
        fired_at: DateTime<Utc>,
    },

    /// The store failed. Nothing is left half-applied unless the error is
    /// [`StoreError::PartialTransition`].
    #[error("round {round} transition failed: {source}")]
    Store {
        /// Round that was requested.
        round: u32,
        /// The underlying store error.
        source: StoreError,
    },
}

impl RoundError {
    fn from_store(round: u32, source: StoreError) -> Self {
        match source {
            StoreError::NoProvinces => Self::EmptyCollection { round },
            source => Self::Store { round, source },
        }
    }

    /// Whether the failure should be treated as fatal for this cycle.
    /// An empty store or a game that has not started is reported but not
    /// fatal.
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::EmptyCollection { .. } | Self::NotStarted { .. }
        )
    }

    /// Whether the store reported a stamp/reset divergence.
    pub const fn is_partial_transition(&self) -> bool {
        matches!(
            self,
            Self::Store {
                source: StoreError::PartialTransition { .. },
                ..
            }
        )
    }
}

/// Summary of a completed round transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundReport {
    /// Round index written onto the destroyed province.
    pub round: u32,
    /// Destroyed province.
    pub destroyed_id: ProvinceId,
    /// Its display name.
    pub destroyed_name: String,
    /// Its differential at selection time.
    pub score_differential: i64,
    /// Number of provinces whose counters were reset.
    pub provinces_reset: u64,
    /// When the transition finished.
    pub completed_at: DateTime<Utc>,
}

/// Orchestrates round transitions over a [`ProvinceStore`].
#[derive(Debug)]
pub struct DestroymentEngine<S> {
    store: Arc<S>,
    in_flight: Mutex<()>,
    progress: TransitionProgress,
    last_report: RwLock<Option<RoundReport>>,
}

impl<S: ProvinceStore> DestroymentEngine<S> {
    /// Create an engine over a shared store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            in_flight: Mutex::new(()),
            progress: TransitionProgress::new(),
            last_report: RwLock::new(None),
        }
    }

    /// The store this engine drives.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Current phase of the transition state machine.
    pub fn phase(&self) -> EnginePhase {
        self.progress.current()
    }

    /// The most recent successful transition, if any.
    pub async fn last_report(&self) -> Option<RoundReport> {
        self.last_report.read().await.clone()
    }

    /// Run one round transition stamping `round`.
    ///
    /// Waits for any transition already in flight.
    pub async fn execute_round(&self, round: u32) -> Result<RoundReport, RoundError> {
        let _single_flight = self.in_flight.lock().await;
        let _idle = IdleOnDrop(&self.progress);

        self.progress.enter(EnginePhase::Computing);
        let outcome = match self.store.stamp_worst_and_reset(round, &self.progress).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let err = RoundError::from_store(round, e);
                log_failure(&err);
                return Err(err);
            }
        };

        let report = RoundReport {
            round,
            destroyed_id: outcome.destroyed.id,
            destroyed_name: outcome.destroyed.name.clone(),
            score_differential: outcome.score_differential,
            provinces_reset: outcome.provinces_reset,
            completed_at: Utc::now(),
        };

        info!(
            round,
            province = %report.destroyed_id,
            name = %report.destroyed_name,
            score_differential = report.score_differential,
            provinces_reset = report.provinces_reset,
            "Round transition complete"
        );

        *self.last_report.write().await = Some(report.clone());
        Ok(report)
    }

    /// [`execute_round`](Self::execute_round) bounded by `timeout`.
    ///
    /// On timeout the in-flight store call is dropped.
    pub async fn execute_round_within(
        &self,
        round: u32,
        timeout: Duration,
    ) -> Result<RoundReport, RoundError> {
        let bounded = with_deadline(timeout, async {
            Ok(self.execute_round(round).await)
        })
        .await;
        match bounded {
            Ok(result) => result,
            Err(e) => {
                warn!(round, error = %e, "Round transition timed out");
                Err(RoundError::from_store(round, e))
            }
        }
    }
}

fn log_failure(err: &RoundError) {
    if err.is_partial_transition() {
        error!(error = %err, "CONSISTENCY WARNING: destroyment stamp and counter reset diverged");
    } else if err.is_fatal() {
        warn!(error = %err, "Round transition failed");
    } else {
        warn!(error = %err, "Round transition skipped");
    }
}
