//! HTTP API for the province game.
//!
//! This crate provides an Axum HTTP server that exposes the province store
//! and the destroyment engine to players:
//!
//! - **Province endpoints** for listing, ranking, attacking and supporting
//! - **Round endpoints** for the current round and manual execution
//! - **Game standing** (`/api/game`) with destroyed and surviving provinces
//!
//! Handlers and the router are generic over the
//! [`ProvinceStore`](nuclick_core::ProvinceStore) implementation, so the
//! same surface runs over `PostgreSQL` or the in-memory store.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
