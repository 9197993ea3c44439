//! Nuclick game server binary.
//!
//! Wires together configuration, logging, the province store, the
//! destroyment engine, the daily scheduler and the HTTP API, then serves
//! until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `nuclick-config.yaml` and the environment
//! 2. Initialize structured logging (tracing)
//! 3. Build the round clock
//! 4. Open the store: `PostgreSQL` when `DATABASE_URL` is set, memory
//!    otherwise
//! 5. Seed provinces into an empty store
//! 6. Start the daily scheduler
//! 7. Serve the HTTP API until shutdown, then stop the scheduler

mod error;

use std::sync::Arc;

use nuclick_api::{AppState, ServerConfig, start_server};
use nuclick_core::config::LoggingConfig;
use nuclick_core::seed::seed_if_empty;
use nuclick_core::{
    ClockError, DailyScheduler, DestroymentEngine, InMemoryProvinceStore, NuclickConfig,
    ProvinceStore, RoundClock,
};
use nuclick_db::{PgProvinceStore, PostgresConfig, PostgresPool};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, storage setup or the HTTP server
/// fails.
#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // 1. Load configuration.
    let config = NuclickConfig::load()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("nuclick-server starting");

    // 3. Build the round clock.
    let clock = config.round_clock()?;
    info!(
        start_date = %clock.start_date(),
        trigger = %clock.trigger_time(),
        current_round = clock.current_round_index().saturating_add(1),
        "Round clock initialized"
    );

    // 4. Open the store and run.
    if config.database.url.is_some() {
        let pool = PostgresPool::connect(&PostgresConfig::from_settings(&config.database)?).await?;
        pool.run_migrations().await?;
        let store = Arc::new(PgProvinceStore::new(pool.pool().clone()));
        let result = run(store, &config, clock).await;
        pool.close().await;
        result
    } else {
        warn!("DATABASE_URL not set, using the in-memory store; state is lost on restart");
        run(Arc::new(InMemoryProvinceStore::new()), &config, clock).await
    }
}

/// Seed, start the scheduler, and serve until shutdown.
async fn run<S: ProvinceStore>(
    store: Arc<S>,
    config: &NuclickConfig,
    clock: RoundClock,
) -> Result<(), ServerError> {
    // 5. Seed provinces.
    let seeded = seed_if_empty(store.as_ref(), &config.game.seed_provinces).await?;
    if seeded > 0 {
        info!(count = seeded, "Seeded provinces into empty store");
    }

    let engine = Arc::new(DestroymentEngine::new(store));

    // 6. Start the daily scheduler.
    let scheduler = if config.scheduler.enabled {
        Some(RunningScheduler::start(DailyScheduler::new(
            Arc::clone(&engine),
            clock,
            config.scheduler.round_timeout(),
        )))
    } else {
        info!("Daily scheduler disabled by configuration");
        None
    };

    // 7. Serve the HTTP API.
    let state = Arc::new(
        AppState::new(engine, clock)
            .with_request_timeout(config.server.request_timeout())
            .with_round_timeout(config.scheduler.round_timeout())
            .with_top_limit(config.game.top_limit)
            .with_manual_round(config.server.enable_manual_round),
    );
    let served = start_server(&ServerConfig::from(&config.server), state, shutdown_signal()).await;

    if let Some(scheduler) = scheduler {
        scheduler.stop().await;
    }

    served?;
    info!("nuclick-server stopped");
    Ok(())
}

/// A spawned scheduler task and the sender that stops it.
struct RunningScheduler {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<(), ClockError>>,
}

impl RunningScheduler {
    fn start<S: ProvinceStore>(scheduler: DailyScheduler<S>) -> Self {
        let (shutdown, rx) = watch::channel(false);
        Self {
            shutdown,
            task: scheduler.spawn(rx),
        }
    }

    /// Signal shutdown and wait for the loop. Returns whether it exited
    /// cleanly after being asked to.
    async fn stop(self) -> bool {
        let signalled = self.shutdown.send(true).is_ok();
        if !signalled {
            warn!("Daily scheduler stopped before shutdown was requested");
        }
        match self.task.await {
            Ok(Ok(())) => signalled,
            Ok(Err(e)) => {
                error!(error = %e, "Daily scheduler failed");
                false
            }
            Err(e) => {
                error!(error = %e, "Daily scheduler task panicked");
                false
            }
        }
    }
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Resolve on `Ctrl-C`. If the signal handler cannot be installed, never
/// resolve rather than shutting down immediately.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
