//! Health check endpoint

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::server::state::AppState;
use crate::server::types::HealthResponse;

/// GET /api/health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        llm_planner: state.llm_planner_enabled(),
        active_tasks: state.sequencer.active_count().await,
    })
}
