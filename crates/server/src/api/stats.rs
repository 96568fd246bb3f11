use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use swarmprobe_core::{DatabaseStats, ProbeStatus};

use super::handlers::{internal_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub database: DatabaseStats,
    pub probe: ProbeStatus,
}

/// Table totals plus the live session counters
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    let database = state.store().stats().map_err(internal_error)?;
    Ok(Json(StatsResponse {
        database,
        probe: state.controller().status(),
    }))
}
