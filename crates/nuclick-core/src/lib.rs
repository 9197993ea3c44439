//! Round calendar, ranking and the daily destroyment cycle.
//!
//! This crate owns everything between the HTTP surface and persistence:
//!
//! - [`clock`] -- Round index arithmetic and the next trigger instant.
//! - [`config`] -- Configuration loading from `nuclick-config.yaml` into
//!   strongly-typed structs.
//! - [`ranking`] -- Pure ordering of provinces by score differential.
//! - [`store`] -- The [`ProvinceStore`] persistence seam and its errors.
//! - [`memory`] -- In-memory store for tests and database-less runs.
//! - [`engine`] -- [`DestroymentEngine`], one round transition per call.
//! - [`scheduler`] -- [`DailyScheduler`], the daily trigger loop.
//! - [`progress`] -- Observable transition phase.
//! - [`deadline`] -- Timeouts for storage calls.
//! - [`seed`] -- Startup seeding.
//!
//! [`ProvinceStore`]: store::ProvinceStore
//! [`DestroymentEngine`]: engine::DestroymentEngine
//! [`DailyScheduler`]: scheduler::DailyScheduler

pub mod clock;
pub mod config;
pub mod deadline;
pub mod engine;
pub mod memory;
pub mod progress;
pub mod ranking;
pub mod scheduler;
pub mod seed;
pub mod store;

pub use clock::{ClockError, RoundClock, current_round_index};
pub use config::{ConfigError, NuclickConfig};
pub use deadline::with_deadline;
pub use engine::{DestroymentEngine, RoundError, RoundReport};
pub use memory::InMemoryProvinceStore;
pub use progress::{EnginePhase, TransitionProgress};
pub use scheduler::DailyScheduler;
pub use store::{ProvinceStore, StoreError, TransitionOutcome};
