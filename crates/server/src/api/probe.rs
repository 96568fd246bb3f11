//! Probe session API handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use swarmprobe_core::{
    Pipeline, ProbeError, ProbeStatus, SessionParams, StartOutcome, StopOutcome,
};
use tracing::info;

use super::handlers::{bad_request, internal_error, ApiError};
use crate::state::AppState;

/// Request body for starting a session. Omitted fields take the configured defaults.
#[derive(Debug, Default, Deserialize)]
pub struct StartProbeBody {
    pub workers: Option<usize>,
    pub listener_budget: Option<usize>,
    pub pipelines: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct StartProbeResponse {
    pub outcome: StartOutcome,
    pub workers: usize,
    pub listener_budget: usize,
    pub pipelines: Vec<Pipeline>,
}

#[derive(Debug, Serialize)]
pub struct StopProbeResponse {
    pub outcome: StopOutcome,
}

/// Start a probe session
pub async fn start_probe(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StartProbeBody>>,
) -> Result<Json<StartProbeResponse>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let controller = state.controller();
    let defaults = controller.default_params();

    let params = match body.pipelines {
        Some(names) => SessionParams::parse(
            body.workers.unwrap_or(defaults.workers),
            body.listener_budget.unwrap_or(defaults.listener_budget),
            &names,
        )
        .map_err(|e| bad_request(e.to_string()))?,
        None => SessionParams {
            workers: body.workers.unwrap_or(defaults.workers),
            listener_budget: body.listener_budget.unwrap_or(defaults.listener_budget),
            pipelines: defaults.pipelines,
        },
    };

    match controller.start(params.clone()).await {
        Ok(outcome) => {
            info!("Start requested: {:?}", outcome);
            // Report the parameters the running session actually uses
            let active = match outcome {
                StartOutcome::AlreadyRunning => {
                    controller.current_params().await.unwrap_or(params)
                }
                StartOutcome::Started => params,
            };
            Ok(Json(StartProbeResponse {
                outcome,
                workers: active.workers,
                listener_budget: active.listener_budget,
                pipelines: active.pipelines,
            }))
        }
        Err(ProbeError::Validation(msg)) => Err(bad_request(msg)),
        Err(e) => Err(internal_error(e)),
    }
}

/// Stop the running session
pub async fn stop_probe(State(state): State<Arc<AppState>>) -> Json<StopProbeResponse> {
    let outcome = state.controller().stop().await;
    Json(StopProbeResponse { outcome })
}

/// Current session status
pub async fn get_status(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ProbeStatus>) {
    (StatusCode::OK, Json(state.controller().status()))
}
