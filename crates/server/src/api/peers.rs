//! Host-centric query handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use swarmprobe_core::{HostCount, HostInfohash};

use super::handlers::{bad_request, internal_error, ApiError};
use super::infohashes::TopParams;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct HostPageParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HostResponse {
    pub host: String,
    pub total_infohashes: u64,
    pub infohashes: Vec<HostInfohash>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Serialize)]
pub struct NeighborsResponse {
    pub host: String,
    pub neighbors: Vec<String>,
}

fn parse_ip(raw: &str) -> Result<IpAddr, ApiError> {
    raw.parse()
        .map_err(|_| bad_request(format!("Invalid IP address: {}", raw)))
}

/// Infohashes a host was seen in
pub async fn get_host(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
    Query(params): Query<HostPageParams>,
) -> Result<Json<HostResponse>, ApiError> {
    let host = parse_ip(&ip)?.to_string();
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);

    let store = state.store();
    let total_infohashes = store
        .count_infohashes_for_host(&host)
        .map_err(internal_error)?;
    let infohashes = store
        .peers_for_host(&host, limit, offset)
        .map_err(internal_error)?;

    Ok(Json(HostResponse {
        host,
        total_infohashes,
        infohashes,
        limit,
        offset,
    }))
}

/// Other known hosts in the same /24. IPv6 hosts have no neighbors.
pub async fn get_neighbors(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
) -> Result<Json<NeighborsResponse>, ApiError> {
    let neighbors = match parse_ip(&ip)? {
        IpAddr::V4(v4) => state
            .store()
            .neighboring_hosts(v4)
            .map_err(internal_error)?,
        IpAddr::V6(_) => Vec::new(),
    };

    Ok(Json(NeighborsResponse {
        host: ip,
        neighbors,
    }))
}

/// Hosts seen in the most distinct infohashes
pub async fn top_hosts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopParams>,
) -> Result<Json<Vec<HostCount>>, ApiError> {
    let top = state
        .store()
        .top_hosts(params.limit())
        .map_err(internal_error)?;
    Ok(Json(top))
}
