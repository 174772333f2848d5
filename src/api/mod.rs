//! HTTP surface. Thin: validation and serialization only; all domain
//! logic stays in the engine.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/recommend", post(handlers::recommend))
        .with_state(state)
}
