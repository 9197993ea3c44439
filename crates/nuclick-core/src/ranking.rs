//! Ranking policy: order provinces by score differential.
//!
//! The ranking key is `attack_count - support_count`, highest first. Equal
//! keys keep their input order, so when the input is in insertion order the
//! tie-break is insertion order. Every function here is pure.

use std::cmp::Reverse;

use nuclick_types::{Province, ProvinceId, score_differential};

/// Default number of provinces returned by the "top" query.
pub const DEFAULT_TOP_LIMIT: usize = 5;

/// The minimal tally needed to rank a province.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreEntry {
    /// Province being scored.
    pub id: ProvinceId,
    /// Attacks this round.
    pub attack_count: u64,
    /// Supports this round.
    pub support_count: u64,
}

impl ScoreEntry {
    /// `attack_count - support_count`, saturating.
    pub fn differential(&self) -> i64 {
        score_differential(self.attack_count, self.support_count)
    }
}

impl From<&Province> for ScoreEntry {
    fn from(p: &Province) -> Self {
        Self {
            id: p.id,
            attack_count: p.attack_count,
            support_count: p.support_count,
        }
    }
}

/// Rank identifiers by differential, descending, stable on ties.
pub fn rank_ids<I>(entries: I) -> Vec<ProvinceId>
where
    I: IntoIterator<Item = ScoreEntry>,
{
    let mut entries: Vec<ScoreEntry> = entries.into_iter().collect();
    // `sort_by_key` is a stable sort.
    entries.sort_by_key(|e| Reverse(e.differential()));
    entries.into_iter().map(|e| e.id).collect()
}

/// Rank full province records by differential, descending, stable on ties.
pub fn rank_provinces(mut provinces: Vec<Province>) -> Vec<Province> {
    provinces.sort_by_key(|p| Reverse(p.score_differential()));
    provinces
}

/// Position of the worst-ranked province: the first one holding the
/// maximum differential.
pub fn worst_index(provinces: &[Province]) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;
    for (idx, province) in provinces.iter().enumerate() {
        let diff = province.score_differential();
        match best {
            Some((_, current)) if diff <= current => {}
            _ => best = Some((idx, diff)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Position of the province a transition for `round` should stamp.
///
/// Normally the worst-ranked province. When every counter is zero and a
/// province already carries the stamp for `round`, the transition has
/// already run against this state, so that province is targeted again and
/// firing twice for one round never stamps a second province. Any vote
/// since the last reset means a fresh ranking.
pub fn transition_target(provinces: &[Province], round: u32) -> Option<usize> {
    let untouched = provinces
        .iter()
        .all(|p| p.attack_count == 0 && p.support_count == 0);
    untouched
        .then(|| {
            provinces
                .iter()
                .position(|p| p.destroyment_round == Some(round))
        })
        .flatten()
        .or_else(|| worst_index(provinces))
}
