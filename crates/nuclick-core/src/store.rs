//! The province store: the only owner of mutable province state.
//!
//! [`ProvinceStore`] is the persistence seam. The engine and the HTTP
//! surface never touch province records directly; every mutation is one of
//! the store's operations. Two implementations ship:
//!
//! - [`InMemoryProvinceStore`](crate::memory::InMemoryProvinceStore) for
//!   tests and database-less runs.
//! - `PgProvinceStore` in the `nuclick-db` crate.
//!
//! # Atomicity contract
//!
//! - `increment_counter` must be an atomic `+1` on a single field.
//! - `stamp_worst_and_reset` must not expose a state where the stamp landed
//!   but the reset did not (or the reverse) beyond its own duration. Stores
//!   with transactions override it with a single critical section. The
//!   provided implementation composes the primitives and compensates: if the
//!   reset fails, the previous stamp is restored; if that also fails, the
//!   caller receives [`StoreError::PartialTransition`].

use std::future::Future;

use nuclick_types::{ActionKind, NewProvince, Province, ProvinceId, ValidationError};
use serde::Serialize;

use crate::progress::{EnginePhase, TransitionProgress};
use crate::ranking;

/// Errors returned by [`ProvinceStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Malformed input (for example an identifier not in the key format).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No province has the given identifier.
    #[error("province {0} not found")]
    NotFound(ProvinceId),

    /// The store is empty, so there is nothing to rank.
    #[error("no provinces to rank")]
    NoProvinces,

    /// The backing storage failed. Retryable by the caller.
    #[error("storage error: {0}")]
    Storage(String),

    /// The operation did not finish before its deadline.
    #[error("storage operation timed out after {0}ms")]
    Timeout(u64),

    /// The stamp and the reset diverged and could not be reconciled.
    #[error("partial round transition for round {round} on province {province}: {detail}")]
    PartialTransition {
        /// Round being stamped.
        round: u32,
        /// Province whose stamp could not be reconciled.
        province: ProvinceId,
        /// What failed.
        detail: String,
    },
}

impl StoreError {
    /// Whether the error is the caller's fault (4xx-equivalent).
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

/// Result of a completed round transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    /// Round index written onto the destroyed province.
    pub round: u32,
    /// The destroyed province as it stood before the reset (counters intact,
    /// new stamp applied).
    pub destroyed: Province,
    /// Its differential at selection time.
    pub score_differential: i64,
    /// Number of province records whose counters were reset.
    pub provinces_reset: u64,
}

impl TransitionOutcome {
    /// Build an outcome from the pre-reset record of the worst province.
    pub fn new(round: u32, mut destroyed: Province, provinces_reset: u64) -> Self {
        destroyed.destroyment_round = Some(round);
        let score_differential = destroyed.score_differential();
        Self {
            round,
            destroyed,
            score_differential,
            provinces_reset,
        }
    }
}

/// Durable keyed collection of provinces.
///
/// All futures are `Send` so that implementations can be driven from axum
/// handlers and spawned scheduler tasks.
pub trait ProvinceStore: Send + Sync + 'static {
    /// Create a province with zeroed counters and no destroyment round.
    fn insert(
        &self,
        province: NewProvince,
    ) -> impl Future<Output = Result<Province, StoreError>> + Send;

    /// All provinces in insertion order.
    fn list_all(&self) -> impl Future<Output = Result<Vec<Province>, StoreError>> + Send;

    /// A single province.
    fn get(&self, id: ProvinceId) -> impl Future<Output = Result<Province, StoreError>> + Send;

    /// Atomically add 1 to the counter selected by `kind`.
    fn increment_counter(
        &self,
        id: ProvinceId,
        kind: ActionKind,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Overwrite a province's destroyment round.
    fn set_destroyment_round(
        &self,
        id: ProvinceId,
        round: Option<u32>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Zero every province's counters. Returns the number of records reset.
    fn reset_all_counters(&self) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Parse `raw_id` and increment. A malformed identifier is rejected
    /// before any storage call is made.
    fn increment_by_raw_id(
        &self,
        raw_id: &str,
        kind: ActionKind,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let parsed = ProvinceId::parse(raw_id);
        async move {
            let id = parsed?;
            self.increment_counter(id, kind).await
        }
    }

    /// All provinces ranked by `attack_count - support_count` descending,
    /// ties in insertion order.
    fn rank_by_score_descending(
        &self,
    ) -> impl Future<Output = Result<Vec<Province>, StoreError>> + Send {
        async move { Ok(ranking::rank_provinces(self.list_all().await?)) }
    }

    /// Stamp the worst-ranked province with `round`, then reset every
    /// counter.
    ///
    /// The target is chosen by [`ranking::transition_target`]: the worst
    /// province, or the province already stamped for `round` if the
    /// transition is being repeated. Returns [`StoreError::NoProvinces`]
    /// without mutating anything when the store is empty.
    fn stamp_worst_and_reset(
        &self,
        round: u32,
        progress: &TransitionProgress,
    ) -> impl Future<Output = Result<TransitionOutcome, StoreError>> + Send {
        async move {
            progress.enter(EnginePhase::Computing);
            let provinces = self.list_all().await?;
            let worst = ranking::transition_target(&provinces, round)
                .and_then(|idx| provinces.into_iter().nth(idx))
                .ok_or(StoreError::NoProvinces)?;

            progress.enter(EnginePhase::Stamping);
            self.set_destroyment_round(worst.id, Some(round)).await?;

            progress.enter(EnginePhase::Resetting);
            match self.reset_all_counters().await {
                Ok(provinces_reset) => Ok(TransitionOutcome::new(round, worst, provinces_reset)),
                Err(reset_err) => {
                    tracing::warn!(
                        round,
                        province = %worst.id,
                        error = %reset_err,
                        "counter reset failed, restoring previous destroyment round"
                    );
                    match self
                        .set_destroyment_round(worst.id, worst.destroyment_round)
                        .await
                    {
                        Ok(()) => Err(reset_err),
                        Err(restore_err) => Err(StoreError::PartialTransition {
                            round,
                            province: worst.id,
                            detail: format!(
                                "reset failed ({reset_err}); restoring the stamp failed ({restore_err})"
                            ),
                        }),
                    }
                }
            }
        }
    }
}
