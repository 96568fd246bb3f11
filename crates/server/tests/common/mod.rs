//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock discovery collaborators injected, so the whole HTTP surface can
//! be exercised without sockets, DHT nodes or trackers.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use swarmprobe_core::{
    config::{DatabaseConfig, ProbeConfig, ServerConfig},
    testing::{MockAnnouncer, MockEngineFactory, MockMetadataFetcher, StaticEnricher, StaticTrackerList},
    Config, ProbeController, ProbeDeps, ProbeStore, SqliteProbeStore,
};

/// Re-export fixtures for test convenience
pub use swarmprobe_core::testing::fixtures;

/// Tracker the mock announcer answers for.
pub const REACHABLE_TRACKER: &str = "udp://reachable.tracker.test:6969/announce";

/// Test fixture for API testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - Routing-table lookups (MockEngineFactory)
/// - Tracker announces (MockAnnouncer)
/// - Metadata fetches (MockMetadataFetcher)
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Direct store access for seeding and assertions
    pub store: Arc<SqliteProbeStore>,
    pub engines: Arc<MockEngineFactory>,
    pub announcer: Arc<MockAnnouncer>,
    pub metadata: Arc<MockMetadataFetcher>,
    pub enricher: Arc<StaticEnricher>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_engines(MockEngineFactory::new()).await
    }

    /// Create a test fixture with a preconfigured engine factory.
    pub async fn with_engines(engines: MockEngineFactory) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 3005, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            probe: ProbeConfig {
                default_workers: 2,
                default_listener_budget: 8,
                ..fixtures::probe_config()
            },
            ..Default::default()
        };

        let store = Arc::new(SqliteProbeStore::new(&db_path).expect("Failed to create store"));
        let engines = Arc::new(engines);
        let announcer = Arc::new(MockAnnouncer::new());
        let metadata = Arc::new(MockMetadataFetcher::new());
        let enricher = Arc::new(StaticEnricher::new());

        let deps = ProbeDeps {
            store: Arc::clone(&store) as Arc<dyn ProbeStore>,
            enricher: enricher.clone(),
            engines: engines.clone(),
            announcer: announcer.clone(),
            tracker_list: Arc::new(StaticTrackerList::new(vec![REACHABLE_TRACKER.to_string()])),
            metadata: Some(metadata.clone()),
        };
        let controller = Arc::new(ProbeController::new(config.probe.clone(), deps));

        let state = Arc::new(swarmprobe_server::state::AppState::new(
            config,
            controller,
            Arc::clone(&store) as Arc<dyn ProbeStore>,
        ));

        let router = swarmprobe_server::api::create_router(state);

        Self {
            router,
            store,
            engines,
            announcer,
            metadata,
            enricher,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a DELETE request with JSON body.
    pub async fn delete_with_body(&self, path: &str, body: Value) -> TestResponse {
        self.request("DELETE", path, Some(body)).await
    }

    /// Send a POST request with one multipart file field.
    pub async fn post_file(&self, path: &str, field: &str, filename: &str, data: &[u8]) -> TestResponse {
        const BOUNDARY: &str = "swarmprobe-test-boundary";

        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/x-bittorrent\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Send a GET request and return the raw text body.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&body_bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
