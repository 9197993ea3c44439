//! In-memory [`ProvinceStore`] backed by a single lock.
//!
//! Every mutation, including a full round transition, runs under one write
//! guard, so increments are atomic and a transition is never observed half
//! done. Increments that arrive during a transition wait for it and count
//! towards the next round.

use nuclick_types::{ActionKind, NewProvince, Province, ProvinceId};
use tokio::sync::RwLock;

use crate::progress::{EnginePhase, TransitionProgress};
use crate::ranking;
use crate::store::{ProvinceStore, StoreError, TransitionOutcome};

/// Province store kept in process memory, in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryProvinceStore {
    provinces: RwLock<Vec<Province>>,
}

impl InMemoryProvinceStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of provinces held.
    pub async fn len(&self) -> usize {
        self.provinces.read().await.len()
    }

    /// Whether the store holds no provinces.
    pub async fn is_empty(&self) -> bool {
        self.provinces.read().await.is_empty()
    }
}

impl ProvinceStore for InMemoryProvinceStore {
    async fn insert(&self, province: NewProvince) -> Result<Province, StoreError> {
        let record = Province::from_new(ProvinceId::new(), province);
        self.provinces.write().await.push(record.clone());
        tracing::debug!(province = %record.id, name = %record.name, "province created");
        Ok(record)
    }

    async fn list_all(&self) -> Result<Vec<Province>, StoreError> {
        Ok(self.provinces.read().await.clone())
    }

    async fn get(&self, id: ProvinceId) -> Result<Province, StoreError> {
        self.provinces
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn increment_counter(&self, id: ProvinceId, kind: ActionKind) -> Result<(), StoreError> {
        let mut provinces = self.provinces.write().await;
        let province = provinces
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let counter = match kind {
            ActionKind::Attack => &mut province.attack_count,
            ActionKind::Support => &mut province.support_count,
        };
        *counter = counter.saturating_add(1);
        tracing::debug!(province = %id, action = %kind, "counter incremented");
        Ok(())
    }

    async fn set_destroyment_round(
        &self,
        id: ProvinceId,
        round: Option<u32>,
    ) -> Result<(), StoreError> {
        let mut provinces = self.provinces.write().await;
        let province = provinces
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound(id))?;
        province.destroyment_round = round;
        Ok(())
    }

    async fn reset_all_counters(&self) -> Result<u64, StoreError> {
        let mut provinces = self.provinces.write().await;
        for province in provinces.iter_mut() {
            province.attack_count = 0;
            province.support_count = 0;
        }
        Ok(u64::try_from(provinces.len()).unwrap_or(u64::MAX))
    }

    async fn stamp_worst_and_reset(
        &self,
        round: u32,
        progress: &TransitionProgress,
    ) -> Result<TransitionOutcome, StoreError> {
        let mut provinces = self.provinces.write().await;

        progress.enter(EnginePhase::Computing);
        let worst_idx =
            ranking::transition_target(&provinces, round).ok_or(StoreError::NoProvinces)?;
        let worst = provinces
            .get_mut(worst_idx)
            .ok_or(StoreError::NoProvinces)?;

        progress.enter(EnginePhase::Stamping);
        let snapshot = worst.clone();
        worst.destroyment_round = Some(round);

        progress.enter(EnginePhase::Resetting);
        for province in provinces.iter_mut() {
            province.attack_count = 0;
            province.support_count = 0;
        }
        let provinces_reset = u64::try_from(provinces.len()).unwrap_or(u64::MAX);

        Ok(TransitionOutcome::new(round, snapshot, provinces_reset))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use super::*;

    async fn seeded(names: &[&str]) -> InMemoryProvinceStore {
        let store = InMemoryProvinceStore::new();
        for name in names {
            store
                .insert(NewProvince::new(name, "#AA0000").unwrap())
                .await
                .unwrap();
        }
        store
    }

    async fn cast(store: &InMemoryProvinceStore, id: ProvinceId, kind: ActionKind, times: u32) {
        for _ in 0..times {
            store.increment_counter(id, kind).await.unwrap();
        }
    }

    #[tokio::test]
    async fn list_all_keeps_insertion_order() {
        let store = seeded(&["Berlin", "Paris", "Rome"]).await;
        let names: Vec<String> = store.list_all().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["Berlin", "Paris", "Rome"]);
    }

    #[tokio::test]
    async fn increment_touches_exactly_one_counter() {
        let store = seeded(&["Berlin", "Paris"]).await;
        let all = store.list_all().await.unwrap();
        store.increment_counter(all[0].id, ActionKind::Attack).await.unwrap();

        let after = store.list_all().await.unwrap();
        assert_eq!((after[0].attack_count, after[0].support_count), (1, 0));
        assert_eq!((after[1].attack_count, after[1].support_count), (0, 0));
    }

    #[tokio::test]
    async fn increment_unknown_id_is_not_found() {
        let store = seeded(&["Berlin"]).await;
        let missing = ProvinceId::new();
        let err = store.increment_counter(missing, ActionKind::Support).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn malformed_raw_id_is_a_validation_error() {
        let store = seeded(&["Berlin"]).await;
        let err = store
            .increment_by_raw_id("not-an-id", ActionKind::Attack)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn scenario_stamps_worst_and_resets_everything() {
        let store = seeded(&["A", "B", "C"]).await;
        let all = store.list_all().await.unwrap();
        let (a, b, c) = (all[0].id, all[1].id, all[2].id);
        cast(&store, a, ActionKind::Attack, 5).await;
        cast(&store, a, ActionKind::Support, 2).await;
        cast(&store, b, ActionKind::Attack, 1).await;
        cast(&store, b, ActionKind::Support, 1).await;
        cast(&store, c, ActionKind::Support, 3).await;

        let ranked = store.rank_by_score_descending().await.unwrap();
        let diffs: Vec<i64> = ranked.iter().map(Province::score_differential).collect();
        assert_eq!(diffs, [3, 0, -3]);
        assert_eq!(ranked[0].id, a);

        let progress = TransitionProgress::new();
        let outcome = store.stamp_worst_and_reset(7, &progress).await.unwrap();
        assert_eq!(outcome.destroyed.id, a);
        assert_eq!(outcome.score_differential, 3);
        assert_eq!(outcome.provinces_reset, 3);
        assert_eq!(progress.current(), EnginePhase::Resetting);

        let after = store.list_all().await.unwrap();
        assert_eq!(after[0].destroyment_round, Some(7));
        assert_eq!(after[1].destroyment_round, None);
        assert_eq!(after[2].destroyment_round, None);
        assert!(after.iter().all(|p| p.attack_count == 0 && p.support_count == 0));
    }

    #[tokio::test]
    async fn empty_store_reports_no_provinces() {
        let store = InMemoryProvinceStore::new();
        let err = store
            .stamp_worst_and_reset(1, &TransitionProgress::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NoProvinces));
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = Arc::new(seeded(&["North", "South", "East"]).await);
        let ids: Vec<ProvinceId> = store.list_all().await.unwrap().iter().map(|p| p.id).collect();

        let mut tasks = tokio::task::JoinSet::new();
        for (i, id) in ids.iter().copied().enumerate() {
            for n in 0..50usize {
                let store = Arc::clone(&store);
                let kind = if (n + i) % 3 == 0 {
                    ActionKind::Support
                } else {
                    ActionKind::Attack
                };
                tasks.spawn(async move { store.increment_counter(id, kind).await });
            }
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        for (i, province) in store.list_all().await.unwrap().iter().enumerate() {
            let supports = u64::try_from((0..50usize).filter(|n| (n + i) % 3 == 0).count()).unwrap();
            assert_eq!(province.support_count, supports);
            assert_eq!(province.attack_count, 50 - supports);
        }
    }
}
