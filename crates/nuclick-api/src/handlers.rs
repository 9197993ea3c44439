//! REST endpoint handlers for the province API.
//!
//! Every handler is generic over the [`ProvinceStore`] in [`AppState`] and
//! bounds each storage call by the request deadline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/province` | All provinces, insertion order |
//! | `GET` | `/api/province/top` | Worst-ranked provinces (`?limit=N`) |
//! | `POST` | `/api/province/attack` | Attack a province |
//! | `POST` | `/api/province/support` | Support a province |
//! | `GET` | `/api/province/round` | Current displayed round |
//! | `POST` | `/api/province/round/execute` | Run a round transition now |
//! | `GET` | `/api/game` | Destroyed, surviving, winner |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use nuclick_core::config::MAX_TOP_LIMIT;
use nuclick_core::{EnginePhase, ProvinceStore, RoundError, RoundReport, with_deadline};
use nuclick_types::{ActionKind, Province};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

/// Response for `GET /api/province`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProvinceListResponse {
    /// Every province in insertion order.
    pub province_list: Vec<Province>,
}

/// Response for `GET /api/province/top`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TopProvincesResponse {
    /// Provinces ranked by `attack_count - support_count`, highest first.
    pub provinces: Vec<Province>,
}

/// Query parameters for `GET /api/province/top`.
#[derive(Debug, Deserialize)]
pub struct TopQuery {
    /// Number of provinces to return (1..=100).
    pub limit: Option<usize>,
}

/// Body of `POST /api/province/attack` and `/support`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Target province identifier.
    #[serde(default)]
    pub province_id: String,
}

/// Response for attack and support.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Always `true`; failures are reported as error responses.
    pub is_success: bool,
}

/// Response for `GET /api/province/round`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RoundResponse {
    /// Current round, 1-based.
    pub round: u32,
    /// Always `true`.
    pub success: bool,
}

/// Response for `POST /api/province/round/execute`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteRoundResponse {
    /// Human-readable summary.
    pub message: String,
    /// Round index stamped onto the destroyed province.
    pub round_count: u32,
}

/// Response for `GET /api/game`.
#[derive(Debug, Serialize)]
pub struct GameResponse {
    /// Current round, 1-based.
    pub round: u32,
    /// Whether the start date has passed.
    pub started: bool,
    /// Provinces that have been destroyed, ordered by destroyment round.
    pub destroyed: Vec<Province>,
    /// Provinces never destroyed, in insertion order.
    pub survivors: Vec<Province>,
    /// The last surviving province, once only one is left.
    pub winner: Option<Province>,
    /// Phase of the round transition engine.
    pub engine_phase: EnginePhase,
    /// The most recent successful round transition, if any.
    pub last_transition: Option<RoundReport>,
}

/// Response for `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: String,
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
    })
}

// ---------------------------------------------------------------------------
// GET /api/province
// ---------------------------------------------------------------------------

/// List every province in insertion order.
pub async fn list_provinces<S: ProvinceStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ProvinceListResponse>, ApiError> {
    let province_list = with_deadline(state.request_timeout, state.store.list_all()).await?;
    Ok(Json(ProvinceListResponse { province_list }))
}

// ---------------------------------------------------------------------------
// GET /api/province/top
// ---------------------------------------------------------------------------

/// The worst-ranked provinces, highest differential first.
pub async fn top_provinces<S: ProvinceStore>(
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<TopQuery>, QueryRejection>,
) -> Result<Json<TopProvincesResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let limit = query.limit.unwrap_or(state.top_limit);
    if limit == 0 || limit > MAX_TOP_LIMIT {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {MAX_TOP_LIMIT}"
        )));
    }

    let mut provinces =
        with_deadline(state.request_timeout, state.store.rank_by_score_descending()).await?;
    provinces.truncate(limit);
    Ok(Json(TopProvincesResponse { provinces }))
}

// ---------------------------------------------------------------------------
// POST /api/province/attack, /api/province/support
// ---------------------------------------------------------------------------

/// Add one attack to a province.
pub async fn attack<S: ProvinceStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<ActionRequest>, JsonRejection>,
) -> Result<Json<ActionResponse>, ApiError> {
    record_action(&state, body, ActionKind::Attack).await
}

/// Add one support to a province.
pub async fn support<S: ProvinceStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<ActionRequest>, JsonRejection>,
) -> Result<Json<ActionResponse>, ApiError> {
    record_action(&state, body, ActionKind::Support).await
}

async fn record_action<S: ProvinceStore>(
    state: &AppState<S>,
    body: Result<Json<ActionRequest>, JsonRejection>,
    kind: ActionKind,
) -> Result<Json<ActionResponse>, ApiError> {
    let Json(request) =
        body.map_err(|e| ApiError::BadRequest(format!("invalid request body: {}", e.body_text())))?;
    with_deadline(
        state.request_timeout,
        state.store.increment_by_raw_id(&request.province_id, kind),
    )
    .await?;
    Ok(Json(ActionResponse { is_success: true }))
}

// ---------------------------------------------------------------------------
// GET /api/province/round
// ---------------------------------------------------------------------------

/// The current round, 1-based.
pub async fn current_round<S: ProvinceStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<RoundResponse> {
    Json(RoundResponse {
        round: state.clock.displayed_round_at(state.now()),
        success: true,
    })
}

// ---------------------------------------------------------------------------
// POST /api/province/round/execute
// ---------------------------------------------------------------------------

/// Run a round transition for the current round index immediately.
///
/// Rejected with 409 before the game start date.
pub async fn execute_round<S: ProvinceStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ExecuteRoundResponse>, ApiError> {
    if !state.enable_manual_round {
        return Err(ApiError::Disabled("manual round execution is disabled".into()));
    }
    let now = state.now();
    if !state.clock.has_started(now) {
        return Err(RoundError::NotStarted {
            starts_at: state.clock.start_date(),
            fired_at: now,
        }
        .into());
    }
    let round = state.clock.round_index_at(now);
    let report = state
        .engine
        .execute_round_within(round, state.round_timeout)
        .await?;
    Ok(Json(ExecuteRoundResponse {
        message: format!(
            "Destroyment round updated and counts reset successfully ({} destroyed)",
            report.destroyed_name
        ),
        round_count: report.round,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/game
// ---------------------------------------------------------------------------

/// Game standing: who has been destroyed, who survives, and the winner.
pub async fn game<S: ProvinceStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<GameResponse>, ApiError> {
    let now = state.now();
    let provinces = with_deadline(state.request_timeout, state.store.list_all()).await?;
    let (mut destroyed, survivors): (Vec<Province>, Vec<Province>) =
        provinces.into_iter().partition(Province::is_destroyed);
    destroyed.sort_by_key(|p| p.destroyment_round);

    let winner = match survivors.as_slice() {
        [only] if !destroyed.is_empty() => Some(only.clone()),
        _ => None,
    };

    Ok(Json(GameResponse {
        round: state.clock.displayed_round_at(now),
        started: state.clock.has_started(now),
        destroyed,
        survivors,
        winner,
        engine_phase: state.engine.phase(),
        last_transition: state.engine.last_report().await,
    }))
}
