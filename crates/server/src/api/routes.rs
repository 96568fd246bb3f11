use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, infohashes, middleware::metrics_middleware, peers, probe, stats};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Probe session
        .route("/probe/start", post(probe::start_probe))
        .route("/probe/stop", post(probe::stop_probe))
        .route("/probe/status", get(probe::get_status))
        // Infohashes
        .route(
            "/infohashes",
            get(infohashes::list_infohashes)
                .post(infohashes::add_infohash)
                .delete(infohashes::delete_infohashes),
        )
        .route("/infohashes/top", get(infohashes::top_infohashes))
        .route("/infohashes/torrent", post(infohashes::upload_torrent))
        .route("/infohashes/{hash}/peers", get(infohashes::infohash_peers))
        // Hosts
        .route("/peers/{ip}", get(peers::get_host))
        .route("/peers/{ip}/neighbors", get(peers::get_neighbors))
        .route("/hosts/top", get(peers::top_hosts))
        // Stats
        .route("/stats", get(stats::get_stats));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
