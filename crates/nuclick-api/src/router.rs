//! Axum router construction for the province API.
//!
//! Assembles all routes into a single [`Router`] with CORS and request
//! tracing middleware.

use std::sync::Arc;

use axum::Router;
use axum::http::Method;
use axum::routing::{get, post};
use nuclick_core::ProvinceStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router over a store type `S`.
///
/// The router includes:
/// - `GET /health` -- liveness probe
/// - `GET /api/province` -- list provinces
/// - `GET /api/province/top` -- top ranked provinces
/// - `POST /api/province/attack` -- attack a province
/// - `POST /api/province/support` -- support a province
/// - `GET /api/province/round` -- current round
/// - `POST /api/province/round/execute` -- run a round transition now
/// - `GET /api/game` -- game standing
///
/// CORS allows any origin so the browser client can be served from a
/// different host.
pub fn build_router<S: ProvinceStore>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/province", get(handlers::list_provinces::<S>))
        .route("/api/province/top", get(handlers::top_provinces::<S>))
        .route("/api/province/attack", post(handlers::attack::<S>))
        .route("/api/province/support", post(handlers::support::<S>))
        .route("/api/province/round", get(handlers::current_round::<S>))
        .route(
            "/api/province/round/execute",
            post(handlers::execute_round::<S>),
        )
        .route("/api/game", get(handlers::game::<S>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
