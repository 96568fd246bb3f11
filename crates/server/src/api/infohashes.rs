//! Infohash API handlers.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use swarmprobe_core::{
    parse_magnet_link, parse_torrent_identity, DeleteSummary, InfoHash, InfohashPeerCount,
    InfohashRecord, PeerRecord, TrackerPeerRecord,
};
use tracing::info;

use super::handlers::{bad_request, internal_error, ApiError};
use crate::state::AppState;

/// Maximum allowed limit for ranking queries
const MAX_LIMIT: u32 = 1000;

/// Default limit for ranking queries
const DEFAULT_LIMIT: u32 = 10;

/// Title prefix length, in hex characters, for torrents without a name
const UNNAMED_PREFIX_LEN: usize = 10;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for adding an infohash: either a hash (with optional title) or a magnet link.
#[derive(Debug, Deserialize)]
pub struct AddInfohashBody {
    pub info_hash: Option<String>,
    pub title: Option<String>,
    pub magnet: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddInfohashResponse {
    pub info_hash: InfoHash,
    pub title: String,
    pub created: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeleteInfohashesBody {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListInfohashesResponse {
    pub infohashes: Vec<InfohashRecord>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct TopParams {
    pub limit: Option<u32>,
}

impl TopParams {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// Query parameters for paging routing-table peers
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageParams {
    /// 1-based page and page size. Zero is rejected, large limits are capped.
    fn resolve(&self) -> Result<(u32, u32), ApiError> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if page == 0 || limit == 0 {
            return Err(bad_request("page and limit must be at least 1"));
        }
        Ok((page, limit.min(MAX_LIMIT)))
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub total_peers: u64,
    pub total_pages: u64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct InfohashPeersResponse {
    pub info_hash: InfoHash,
    pub peers: Vec<PeerRecord>,
    pub pagination: Pagination,
    pub tracker_peers: Vec<TrackerPeerRecord>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List all infohashes, most recently discovered first
pub async fn list_infohashes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListInfohashesResponse>, ApiError> {
    let infohashes = state.store().list_infohashes().map_err(internal_error)?;
    Ok(Json(ListInfohashesResponse {
        total: infohashes.len(),
        infohashes,
    }))
}

/// Add an infohash from a hash/title pair or a magnet link
pub async fn add_infohash(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddInfohashBody>,
) -> Result<(StatusCode, Json<AddInfohashResponse>), ApiError> {
    let (info_hash, title) = match (body.magnet, body.info_hash) {
        (Some(magnet), _) => {
            let link = parse_magnet_link(&magnet)
                .map_err(|e| bad_request(format!("Invalid magnet link: {}", e)))?;
            (link.info_hash, body.title.unwrap_or(link.title))
        }
        (None, Some(raw)) => {
            let info_hash: InfoHash = raw
                .parse()
                .map_err(|e| bad_request(format!("Invalid infohash: {}", e)))?;
            let title = body
                .title
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| bad_request("title is required when adding by infohash"))?;
            (info_hash, title)
        }
        (None, None) => return Err(bad_request("Either info_hash or magnet is required")),
    };

    let created = state
        .store()
        .add_infohash(&info_hash, &title)
        .map_err(internal_error)?;

    if created {
        info!(info_hash = %info_hash, "Infohash added");
    }

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(AddInfohashResponse {
            info_hash,
            title,
            created,
        }),
    ))
}

/// Delete infohashes by id together with their peers
pub async fn delete_infohashes(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DeleteInfohashesBody>,
) -> Result<Json<DeleteSummary>, ApiError> {
    if body.ids.is_empty() {
        return Err(bad_request("ids must not be empty"));
    }

    let summary = state
        .store()
        .delete_infohashes(&body.ids)
        .map_err(internal_error)?;
    info!(
        infohashes = summary.infohashes,
        peers = summary.peers,
        tracker_peers = summary.tracker_peers,
        "Deleted infohashes"
    );
    Ok(Json(summary))
}

/// Infohashes with the most routing-table peers
pub async fn top_infohashes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopParams>,
) -> Result<Json<Vec<InfohashPeerCount>>, ApiError> {
    let top = state
        .store()
        .top_infohashes(params.limit())
        .map_err(internal_error)?;
    Ok(Json(top))
}

/// Peers recorded for one infohash, from both pipelines.
///
/// Routing-table peers are paged with `page` and `limit`; tracker peers are
/// returned in full.
pub async fn infohash_peers(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<InfohashPeersResponse>, ApiError> {
    let info_hash: InfoHash = hash
        .parse()
        .map_err(|e| bad_request(format!("Invalid infohash: {}", e)))?;
    let (page, limit) = params.resolve()?;

    let total_peers = state
        .store()
        .count_peers_for_infohash(&info_hash)
        .map_err(internal_error)?;
    let offset = u64::from(page - 1) * u64::from(limit);
    let peers = state
        .store()
        .peers_for_infohash_page(&info_hash, limit, offset)
        .map_err(internal_error)?;
    let tracker_peers = state
        .store()
        .tracker_peers_for_infohash(&info_hash)
        .map_err(internal_error)?;

    Ok(Json(InfohashPeersResponse {
        info_hash,
        peers,
        pagination: Pagination {
            total_peers,
            total_pages: total_peers.div_ceil(u64::from(limit)),
            page,
            limit,
        },
        tracker_peers,
    }))
}

/// Add an infohash from an uploaded .torrent file (multipart field `torrent`)
pub async fn upload_torrent(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AddInfohashResponse>), ApiError> {
    let mut torrent_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("torrent") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("Failed to read file: {}", e)))?;
            torrent_data = Some(bytes.to_vec());
        }
    }

    let data = match torrent_data {
        Some(d) if !d.is_empty() => d,
        _ => return Err(bad_request("No torrent file provided")),
    };

    let identity = parse_torrent_identity(&data)
        .map_err(|e| bad_request(format!("Invalid .torrent file: {}", e)))?;
    let info_hash = identity.info_hash;
    let title = identity
        .name
        .unwrap_or_else(|| format!("Torrent ({}...)", &info_hash.to_hex()[..UNNAMED_PREFIX_LEN]));

    let created = state
        .store()
        .add_infohash(&info_hash, &title)
        .map_err(internal_error)?;

    if created {
        info!(info_hash = %info_hash, "Infohash added from torrent file");
    }

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(AddInfohashResponse {
            info_hash,
            title,
            created,
        }),
    ))
}
