//! Daily trigger loop.
//!
//! Sleeps until the next configured trigger time, runs one round transition
//! bounded by the round timeout, and repeats until told to shut down. A
//! failed cycle is logged and not retried; the next trigger runs as normal.
//! Triggers before the game start date are skipped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::clock::{ClockError, RoundClock};
use crate::engine::{DestroymentEngine, RoundError, RoundReport};
use crate::store::ProvinceStore;

/// Fires the destroyment engine once a day at the clock's trigger time.
#[derive(Debug)]
pub struct DailyScheduler<S> {
    engine: Arc<DestroymentEngine<S>>,
    clock: RoundClock,
    round_timeout: Duration,
    now: fn() -> DateTime<Utc>,
}

impl<S: ProvinceStore> DailyScheduler<S> {
    /// Create a scheduler over a shared engine.
    pub const fn new(
        engine: Arc<DestroymentEngine<S>>,
        clock: RoundClock,
        round_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            clock,
            round_timeout,
            now: Utc::now,
        }
    }

    /// Replace the wall-clock source used to place triggers.
    #[must_use]
    pub const fn with_now(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Run one cycle as if the trigger fired at `fired_at`.
    ///
    /// The stamped round is the round index at `fired_at`, the first index
    /// of the round that the trigger opens, so a wake-up a few milliseconds
    /// late stamps the same round as an exact one. Before the start date
    /// nothing is touched and [`RoundError::NotStarted`] is returned.
    pub async fn fire_once(&self, fired_at: DateTime<Utc>) -> Result<RoundReport, RoundError> {
        if !self.clock.has_started(fired_at) {
            info!(
                %fired_at,
                start_date = %self.clock.start_date(),
                "Game has not started, skipping trigger"
            );
            return Err(RoundError::NotStarted {
                starts_at: self.clock.start_date(),
                fired_at,
            });
        }
        let round = self.clock.round_index_at(fired_at);
        info!(round, %fired_at, "Daily trigger fired");
        self.engine
            .execute_round_within(round, self.round_timeout)
            .await
    }

    /// Loop until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError`] only if the next trigger time cannot be
    /// represented.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), ClockError> {
        info!(
            trigger = %self.clock.trigger_time(),
            start_date = %self.clock.start_date(),
            "Daily scheduler started"
        );
        let mut next = self.clock.next_trigger_after((self.now)())?;
        loop {
            if *shutdown.borrow() {
                break;
            }
            let wait = (next - (self.now)()).to_std().unwrap_or(Duration::ZERO);
            debug!(%next, wait_secs = wait.as_secs(), "Sleeping until next trigger");

            tokio::select! {
                () = tokio::time::sleep(wait) => {
                    log_cycle(&self.fire_once(next).await);
                    // A wall clock still reading before `next` must not
                    // schedule the same trigger again.
                    next = self.clock.next_trigger_after((self.now)().max(next))?;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("Daily scheduler stopped");
        Ok(())
    }

    /// Spawn [`run`](Self::run) onto the current runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<Result<(), ClockError>> {
        tokio::spawn(self.run(shutdown))
    }
}

fn log_cycle(result: &Result<RoundReport, RoundError>) {
    match result {
        Ok(report) => info!(
            round = report.round,
            province = %report.destroyed_id,
            "Scheduled round transition complete"
        ),
        Err(RoundError::NotStarted { .. }) => {}
        Err(e) if e.is_partial_transition() => {
            error!(error = %e, "Scheduled round transition left inconsistent state");
        }
        Err(e) => warn!(error = %e, "Scheduled round transition did not complete"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;
    use nuclick_types::{ActionKind, NewProvince, Province, ProvinceId};

    use super::*;
    use crate::memory::InMemoryProvinceStore;
    use crate::store::StoreError;

    async fn scheduler() -> (Arc<InMemoryProvinceStore>, DailyScheduler<InMemoryProvinceStore>) {
        let store = Arc::new(InMemoryProvinceStore::new());
        for name in ["Aland", "Bremen"] {
            store
                .insert(NewProvince::new(name, "FF0000").unwrap())
                .await
                .unwrap();
        }
        let engine = Arc::new(DestroymentEngine::new(Arc::clone(&store)));
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = RoundClock::new(start, 14, 0).unwrap();
        (store, DailyScheduler::new(engine, clock, Duration::from_secs(10)))
    }

    #[tokio::test]
    async fn fire_once_stamps_round_at_trigger_time() {
        let (store, scheduler) = scheduler().await;
        let ids: Vec<_> = store.list_all().await.unwrap().iter().map(|p| p.id).collect();
        store.increment_counter(ids[1], ActionKind::Attack).await.unwrap();

        let fired_at = Utc.with_ymd_and_hms(2024, 1, 4, 14, 0, 0).unwrap();
        let report = scheduler.fire_once(fired_at).await.unwrap();
        assert_eq!(report.round, 3);
        assert_eq!(report.destroyed_id, ids[1]);
        assert_eq!(store.get(ids[1]).await.unwrap().destroyment_round, Some(3));
    }

    #[tokio::test]
    async fn fire_once_on_empty_store_is_not_fatal() {
        let store = Arc::new(InMemoryProvinceStore::new());
        let engine = Arc::new(DestroymentEngine::new(store));
        let clock = RoundClock::new(Utc::now(), 14, 0).unwrap();
        let scheduler = DailyScheduler::new(engine, clock, Duration::from_secs(1));
        let err = scheduler.fire_once(Utc::now()).await.unwrap_err();
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let (_store, scheduler) = scheduler().await;
        let (tx, rx) = watch::channel(false);
        let handle = scheduler.spawn(rx);
        tx.send(true).unwrap();
        let finished = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(finished.unwrap().unwrap().is_ok());
    }

    #[tokio::test]
    async fn dropped_sender_stops_the_loop() {
        let (_store, scheduler) = scheduler().await;
        let (tx, rx) = watch::channel(false);
        let handle = scheduler.spawn(rx);
        drop(tx);
        let finished = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(finished.unwrap().unwrap().is_ok());
    }

    #[tokio::test]
    async fn triggers_before_start_date_are_skipped() {
        let store = Arc::new(InMemoryProvinceStore::new());
        let mut ids = Vec::new();
        for name in ["Aland", "Bremen"] {
            let p = store
                .insert(NewProvince::new(name, "#FF0000").unwrap())
                .await
                .unwrap();
            ids.push(p.id);
        }
        let engine = Arc::new(DestroymentEngine::new(Arc::clone(&store)));
        let start = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let clock = RoundClock::new(start, 14, 0).unwrap();
        let scheduler = DailyScheduler::new(engine, clock, Duration::from_secs(10));

        store.increment_counter(ids[1], ActionKind::Attack).await.unwrap();
        let early = Utc.with_ymd_and_hms(2024, 1, 8, 14, 0, 0).unwrap();
        let err = scheduler.fire_once(early).await.unwrap_err();
        assert!(matches!(err, RoundError::NotStarted { .. }));
        assert!(!err.is_fatal());

        let untouched = store.list_all().await.unwrap();
        assert!(untouched.iter().all(|p| p.destroyment_round.is_none()));
        assert_eq!(untouched[1].attack_count, 1);

        for _ in 0..10 {
            store.increment_counter(ids[0], ActionKind::Attack).await.unwrap();
        }
        let first = Utc.with_ymd_and_hms(2024, 1, 10, 14, 0, 0).unwrap();
        let report = scheduler.fire_once(first).await.unwrap();
        assert_eq!(report.destroyed_id, ids[0]);
        assert_eq!(report.round, 0);
        assert_eq!(store.get(ids[1]).await.unwrap().destroyment_round, None);
    }

    /// In-memory store that counts counter resets, so every transition
    /// through the provided trait path is visible.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryProvinceStore,
        resets: AtomicUsize,
    }

    impl ProvinceStore for CountingStore {
        async fn insert(&self, province: NewProvince) -> Result<Province, StoreError> {
            self.inner.insert(province).await
        }

        async fn list_all(&self) -> Result<Vec<Province>, StoreError> {
            self.inner.list_all().await
        }

        async fn get(&self, id: ProvinceId) -> Result<Province, StoreError> {
            self.inner.get(id).await
        }

        async fn increment_counter(&self, id: ProvinceId, kind: ActionKind) -> Result<(), StoreError> {
            self.inner.increment_counter(id, kind).await
        }

        async fn set_destroyment_round(
            &self,
            id: ProvinceId,
            round: Option<u32>,
        ) -> Result<(), StoreError> {
            self.inner.set_destroyment_round(id, round).await
        }

        async fn reset_all_counters(&self) -> Result<u64, StoreError> {
            self.resets.fetch_add(1, Ordering::SeqCst);
            self.inner.reset_all_counters().await
        }
    }

    thread_local! {
        static PAUSED_BASE: Cell<Option<tokio::time::Instant>> = const { Cell::new(None) };
        static WALL_LAG: Cell<Duration> = const { Cell::new(Duration::ZERO) };
    }

    /// Wall clock pinned to the paused tokio clock: 2024-01-04T13:59:00Z at
    /// the first call, minus an adjustable lag.
    fn paused_wall_clock() -> DateTime<Utc> {
        let base = PAUSED_BASE.with(|b| {
            b.get().unwrap_or_else(|| {
                let now = tokio::time::Instant::now();
                b.set(Some(now));
                now
            })
        });
        let elapsed = chrono::Duration::from_std(base.elapsed()).unwrap();
        let lag = chrono::Duration::from_std(WALL_LAG.with(Cell::get)).unwrap();
        Utc.with_ymd_and_hms(2024, 1, 4, 13, 59, 0).unwrap() + elapsed - lag
    }

    #[tokio::test(start_paused = true)]
    async fn loop_fires_once_per_trigger_even_when_wall_clock_lags() {
        paused_wall_clock();
        let store = Arc::new(CountingStore::default());
        let mut ids = Vec::new();
        for name in ["Aland", "Bremen"] {
            let p = store
                .insert(NewProvince::new(name, "#00FF00").unwrap())
                .await
                .unwrap();
            ids.push(p.id);
        }
        store.increment_counter(ids[1], ActionKind::Attack).await.unwrap();

        let engine = Arc::new(DestroymentEngine::new(Arc::clone(&store)));
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = RoundClock::new(start, 14, 0).unwrap();
        let (tx, rx) = watch::channel(false);
        let handle = DailyScheduler::new(Arc::clone(&engine), clock, Duration::from_secs(10))
            .with_now(paused_wall_clock)
            .spawn(rx);

        // The trigger is 60s away. Let the wall clock fall behind the
        // timer before it fires.
        tokio::time::sleep(Duration::from_secs(30)).await;
        WALL_LAG.with(|lag| lag.set(Duration::from_secs(2)));
        tokio::time::sleep(Duration::from_secs(90)).await;

        assert_eq!(store.resets.load(Ordering::SeqCst), 1);
        let report = engine.last_report().await.unwrap();
        assert_eq!(report.round, 3);
        assert_eq!(report.destroyed_id, ids[1]);
        let after = store.list_all().await.unwrap();
        assert_eq!(after[1].destroyment_round, Some(3));
        assert!(after.iter().all(|p| p.attack_count == 0));

        // Votes cast after the trigger survive until the next one.
        store.increment_counter(ids[0], ActionKind::Attack).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(store.resets.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(ids[0]).await.unwrap().attack_count, 1);

        tx.send(true).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }
}
