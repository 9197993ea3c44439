//! `PostgreSQL`-backed [`ProvinceStore`].
//!
//! Counter increments are single `UPDATE ... SET n = n + 1` statements, so
//! concurrent actions never lose an update. A round transition runs in one
//! transaction that first locks every province row (`FOR UPDATE`). An
//! increment that races the transition blocks on that lock and is applied
//! after the reset, so it counts towards the next round.

use nuclick_core::progress::{EnginePhase, TransitionProgress};
use nuclick_core::ranking;
use nuclick_core::store::{ProvinceStore, StoreError, TransitionOutcome};
use nuclick_types::{ActionKind, ColorHex, NewProvince, Province, ProvinceId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, storage};

/// Operations on the `provinces` table.
#[derive(Debug, Clone)]
pub struct PgProvinceStore {
    pool: PgPool,
}

impl PgProvinceStore {
    /// Create a store over a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ProvinceStore for PgProvinceStore {
    async fn insert(&self, province: NewProvince) -> Result<Province, StoreError> {
        let id = ProvinceId::new();
        let row = sqlx::query_as::<_, ProvinceRow>(
            r"INSERT INTO provinces (id, name, color_hex)
              VALUES ($1, $2, $3)
              RETURNING id, seq, name, color_hex, attack_count, support_count, destroyment_round",
        )
        .bind(id.into_inner())
        .bind(&province.name)
        .bind(province.color_hex.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        tracing::debug!(province = %id, name = %province.name, "Inserted province");
        Ok(Province::try_from(row)?)
    }

    async fn list_all(&self) -> Result<Vec<Province>, StoreError> {
        let rows = sqlx::query_as::<_, ProvinceRow>(
            r"SELECT id, seq, name, color_hex, attack_count, support_count, destroyment_round
              FROM provinces
              ORDER BY seq ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        into_provinces(rows)
    }

    async fn get(&self, id: ProvinceId) -> Result<Province, StoreError> {
        let row = sqlx::query_as::<_, ProvinceRow>(
            r"SELECT id, seq, name, color_hex, attack_count, support_count, destroyment_round
              FROM provinces
              WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        let row = row.ok_or(StoreError::NotFound(id))?;
        Ok(Province::try_from(row)?)
    }

    async fn increment_counter(&self, id: ProvinceId, kind: ActionKind) -> Result<(), StoreError> {
        // The column name comes from a closed enum, never from input.
        let sql = format!(
            "UPDATE provinces SET {col} = {col} + 1 WHERE id = $1",
            col = kind.counter_column()
        );
        let result = sqlx::query(&sql)
            .bind(id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        tracing::debug!(province = %id, action = %kind, "Incremented counter");
        Ok(())
    }

    async fn set_destroyment_round(
        &self,
        id: ProvinceId,
        round: Option<u32>,
    ) -> Result<(), StoreError> {
        let round = round.map(round_to_db).transpose()?;
        let result = sqlx::query("UPDATE provinces SET destroyment_round = $2 WHERE id = $1")
            .bind(id.into_inner())
            .bind(round)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn reset_all_counters(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE provinces SET attack_count = 0, support_count = 0")
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(result.rows_affected())
    }

    async fn rank_by_score_descending(&self) -> Result<Vec<Province>, StoreError> {
        let rows = sqlx::query_as::<_, ProvinceRow>(
            r"SELECT id, seq, name, color_hex, attack_count, support_count, destroyment_round
              FROM provinces
              ORDER BY (attack_count - support_count) DESC, seq ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        into_provinces(rows)
    }

    async fn stamp_worst_and_reset(
        &self,
        round: u32,
        progress: &TransitionProgress,
    ) -> Result<TransitionOutcome, StoreError> {
        let db_round = round_to_db(round)?;
        let mut tx = self.pool.begin().await.map_err(storage)?;

        progress.enter(EnginePhase::Computing);
        let rows = sqlx::query_as::<_, ProvinceRow>(
            r"SELECT id, seq, name, color_hex, attack_count, support_count, destroyment_round
              FROM provinces
              ORDER BY seq ASC
              FOR UPDATE",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(storage)?;
        let provinces = into_provinces(rows)?;
        let target = ranking::transition_target(&provinces, round)
            .and_then(|idx| provinces.into_iter().nth(idx))
            .ok_or(StoreError::NoProvinces)?;

        progress.enter(EnginePhase::Stamping);
        sqlx::query("UPDATE provinces SET destroyment_round = $2 WHERE id = $1")
            .bind(target.id.into_inner())
            .bind(db_round)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        progress.enter(EnginePhase::Resetting);
        let reset = sqlx::query("UPDATE provinces SET attack_count = 0, support_count = 0")
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        tx.commit().await.map_err(storage)?;

        tracing::debug!(
            round,
            province = %target.id,
            provinces_reset = reset.rows_affected(),
            "Committed round transition"
        );
        Ok(TransitionOutcome::new(round, target, reset.rows_affected()))
    }
}

/// A row from the `provinces` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProvinceRow {
    /// Province identifier.
    pub id: Uuid,
    /// Insertion ordinal.
    pub seq: i64,
    /// Display name.
    pub name: String,
    /// Colour as stored (`#RRGGBB`).
    pub color_hex: String,
    /// Attacks this round.
    pub attack_count: i64,
    /// Supports this round.
    pub support_count: i64,
    /// Last destroyment round.
    pub destroyment_round: Option<i32>,
}

impl TryFrom<ProvinceRow> for Province {
    type Error = DbError;

    fn try_from(row: ProvinceRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let color_hex = ColorHex::parse(&row.color_hex)
            .map_err(|e| invalid_field(id, "color_hex", &row.color_hex, &e))?;
        let attack_count = u64::try_from(row.attack_count)
            .map_err(|e| invalid_field(id, "attack_count", &row.attack_count, &e))?;
        let support_count = u64::try_from(row.support_count)
            .map_err(|e| invalid_field(id, "support_count", &row.support_count, &e))?;
        let destroyment_round = row
            .destroyment_round
            .map(|r| u32::try_from(r).map_err(|e| invalid_field(id, "destroyment_round", &r, &e)))
            .transpose()?;

        Ok(Self {
            id: ProvinceId::from(row.id),
            name: row.name,
            color_hex,
            attack_count,
            support_count,
            destroyment_round,
        })
    }
}

fn invalid_field(
    id: Uuid,
    field: &str,
    value: &dyn core::fmt::Display,
    err: &dyn core::fmt::Display,
) -> DbError {
    DbError::InvalidRow(format!("province {id}: {field} = {value} ({err})"))
}

fn into_provinces(rows: Vec<ProvinceRow>) -> Result<Vec<Province>, StoreError> {
    rows.into_iter()
        .map(|row| Province::try_from(row).map_err(StoreError::from))
        .collect()
}

fn round_to_db(round: u32) -> Result<i32, StoreError> {
    i32::try_from(round).map_err(|e| {
        DbError::InvalidRow(format!("destroyment_round {round} does not fit INTEGER ({e})")).into()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row() -> ProvinceRow {
        ProvinceRow {
            id: Uuid::now_v7(),
            seq: 1,
            name: "Aceh".into(),
            color_hex: "#1F77B4".into(),
            attack_count: 4,
            support_count: 1,
            destroyment_round: Some(2),
        }
    }

    #[test]
    fn row_converts_to_province() {
        let row = row();
        let id = row.id;
        let province = Province::try_from(row).unwrap();
        assert_eq!(province.id.into_inner(), id);
        assert_eq!(province.color_hex.as_str(), "#1F77B4");
        assert_eq!(province.score_differential(), 3);
        assert_eq!(province.destroyment_round, Some(2));
    }

    #[test]
    fn negative_counter_is_rejected() {
        let mut row = row();
        row.support_count = -1;
        assert!(matches!(Province::try_from(row), Err(DbError::InvalidRow(_))));
    }

    #[test]
    fn negative_round_is_rejected() {
        let mut row = row();
        row.destroyment_round = Some(-3);
        assert!(matches!(Province::try_from(row), Err(DbError::InvalidRow(_))));
    }

    #[test]
    fn oversized_round_is_a_storage_error() {
        assert!(matches!(round_to_db(u32::MAX), Err(StoreError::Storage(_))));
        assert_eq!(round_to_db(12).unwrap(), 12);
    }
}
