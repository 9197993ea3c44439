//! Shared application state for the province API.
//!
//! [`AppState`] carries the collaborators wired at startup: the store, the
//! destroyment engine over that same store, and the round clock. Handlers
//! receive it as `State<Arc<AppState<S>>>`; nothing is global.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use nuclick_core::ranking::DEFAULT_TOP_LIMIT;
use nuclick_core::{DestroymentEngine, ProvinceStore, RoundClock};

/// Deadline applied to each storage call when none is configured.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for a manually triggered round when none is configured.
const DEFAULT_ROUND_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state behind every handler.
#[derive(Debug)]
pub struct AppState<S> {
    /// The province store.
    pub store: Arc<S>,
    /// Engine for manual round execution.
    pub engine: Arc<DestroymentEngine<S>>,
    /// Round calendar.
    pub clock: RoundClock,
    /// Deadline for each storage call made by a handler.
    pub request_timeout: Duration,
    /// Deadline for a manually triggered round transition.
    pub round_timeout: Duration,
    /// Default size of the top list.
    pub top_limit: usize,
    /// Whether manual round execution is allowed.
    pub enable_manual_round: bool,
    now: fn() -> DateTime<Utc>,
}

impl<S: ProvinceStore> AppState<S> {
    /// State over `engine` and its store, with default limits.
    pub fn new(engine: Arc<DestroymentEngine<S>>, clock: RoundClock) -> Self {
        Self {
            store: Arc::clone(engine.store()),
            engine,
            clock,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            round_timeout: DEFAULT_ROUND_TIMEOUT,
            top_limit: DEFAULT_TOP_LIMIT,
            enable_manual_round: true,
            now: Utc::now,
        }
    }

    /// Set the per-call storage deadline.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the deadline for manually triggered rounds.
    #[must_use]
    pub const fn with_round_timeout(mut self, timeout: Duration) -> Self {
        self.round_timeout = timeout;
        self
    }

    /// Set the default top list size.
    #[must_use]
    pub const fn with_top_limit(mut self, limit: usize) -> Self {
        self.top_limit = limit;
        self
    }

    /// Allow or forbid manual round execution.
    #[must_use]
    pub const fn with_manual_round(mut self, enabled: bool) -> Self {
        self.enable_manual_round = enabled;
        self
    }

    /// Replace the wall clock, for deterministic round numbers in tests.
    #[must_use]
    pub const fn with_now(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// The current instant according to this state's clock source.
    pub fn now(&self) -> DateTime<Utc> {
        (self.now)()
    }
}
