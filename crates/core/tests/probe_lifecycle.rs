//! Probe session lifecycle integration tests.
//!
//! These drive a real controller against an on-disk store with in-process
//! engine, announcer and enrichment doubles.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use swarmprobe_core::{
    config::ProbeConfig,
    testing::{fixtures, MockAnnouncer, MockEngineFactory, StaticEnricher, StaticTrackerList},
    Pipeline, ProbeController, ProbeDeps, ProbeError, ProbeStore, SessionParams,
    SqliteProbeStore, StartOutcome, StopOutcome,
};

const REACHABLE: &str = "udp://reachable.tracker.test:6969/announce";
const UNREACHABLE: &str = "udp://unreachable.tracker.test:6969/announce";

/// Test helper owning every collaborator of the controller.
struct TestHarness {
    store: Arc<SqliteProbeStore>,
    engines: Arc<MockEngineFactory>,
    announcer: Arc<MockAnnouncer>,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new(engines: MockEngineFactory) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteProbeStore::new(&temp_dir.path().join("probe.db"))
                .expect("Failed to create store"),
        );

        Self {
            store,
            engines: Arc::new(engines),
            announcer: Arc::new(MockAnnouncer::new()),
            _temp_dir: temp_dir,
        }
    }

    fn controller(&self, config: ProbeConfig) -> ProbeController {
        let deps = ProbeDeps {
            store: Arc::clone(&self.store) as Arc<dyn ProbeStore>,
            enricher: Arc::new(StaticEnricher::new()),
            engines: self.engines.clone(),
            announcer: self.announcer.clone(),
            tracker_list: Arc::new(StaticTrackerList::new(vec![
                UNREACHABLE.to_string(),
                REACHABLE.to_string(),
            ])),
            metadata: None,
        };
        ProbeController::new(config, deps)
    }

    fn seed(&self, count: u8) {
        for n in 1..=count {
            self.store
                .add_infohash(&fixtures::info_hash(n), &format!("Swarm {n}"))
                .expect("Failed to seed infohash");
        }
    }
}

fn params(pipelines: Vec<Pipeline>) -> SessionParams {
    SessionParams {
        workers: 2,
        listener_budget: 4,
        pipelines,
    }
}

/// Poll `check` until it holds or `timeout` elapses.
async fn wait_until<F: Fn() -> bool>(check: F, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

#[tokio::test]
async fn test_start_while_running_is_rejected_without_reset() {
    let engines = MockEngineFactory::new();
    engines.set_peers(fixtures::info_hash(1), vec![fixtures::peer(1, 6881)]);
    engines.set_peers(
        fixtures::info_hash(2),
        vec![fixtures::peer(2, 6881), fixtures::peer(3, 6881)],
    );
    let harness = TestHarness::new(engines);
    harness.seed(2);
    // Long cooldown: the finished pass keeps its counters while we poke it.
    let controller = harness.controller(ProbeConfig {
        cooldown_secs: 60,
        ..fixtures::probe_config()
    });

    let outcome = controller.start(params(vec![Pipeline::DhtCrawl])).await.unwrap();
    assert_eq!(outcome, StartOutcome::Started);
    assert!(
        wait_until(
            || controller.status().hashes_processed == 2,
            Duration::from_secs(2)
        )
        .await
    );
    let before = controller.status();
    assert_eq!(before.matches, 3);

    let outcome = controller
        .start(SessionParams {
            workers: 8,
            ..params(vec![Pipeline::DhtCrawl])
        })
        .await
        .unwrap();
    assert_eq!(outcome, StartOutcome::AlreadyRunning);

    let after = controller.status();
    assert!(after.running);
    assert_eq!(after.matches, before.matches);
    assert_eq!(after.hashes_processed, before.hashes_processed);
    assert!(after.elapsed_seconds >= before.elapsed_seconds);
    assert_eq!(harness.engines.created(), 2);
    assert_eq!(controller.current_params().await.unwrap().workers, 2);

    controller.stop().await;
}

#[tokio::test]
async fn test_stop_while_idle_is_noop() {
    let harness = TestHarness::new(MockEngineFactory::new());
    let controller = harness.controller(fixtures::probe_config());

    assert_eq!(controller.stop().await, StopOutcome::NotRunning);
    assert!(!controller.status().running);
    assert_eq!(controller.status().hashes_per_second, 0.0);
}

#[tokio::test]
async fn test_stop_destroys_engines_immediately() {
    let harness = TestHarness::new(MockEngineFactory::new().hold_open());
    harness.seed(3);
    let controller = harness.controller(fixtures::probe_config());

    controller.start(params(vec![Pipeline::DhtCrawl])).await.unwrap();
    assert!(wait_until(|| harness.engines.lookups() > 0, Duration::from_secs(2)).await);

    assert_eq!(controller.stop().await, StopOutcome::Stopped);
    assert_eq!(harness.engines.destroyed(), 2);

    let status = controller.status();
    assert!(!status.running);
    assert_eq!(status.hashes_per_second, 0.0);
    assert_eq!(status.elapsed_seconds, 0.0);
}

#[tokio::test]
async fn test_stop_during_cooldown_prevents_restart() {
    let harness = TestHarness::new(MockEngineFactory::new());
    harness.seed(1);
    let controller = harness.controller(ProbeConfig {
        cooldown_secs: 1,
        ..fixtures::probe_config()
    });

    controller.start(params(vec![Pipeline::DhtCrawl])).await.unwrap();
    // Pass done and pool released: the session is now in its cooldown.
    assert!(wait_until(|| harness.engines.destroyed() == 2, Duration::from_secs(2)).await);

    assert_eq!(controller.stop().await, StopOutcome::Stopped);
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(harness.engines.created(), 2);
    assert!(!controller.status().running);
}

#[tokio::test]
async fn test_restarts_after_cooldown_with_fresh_pool_and_counters() {
    let harness = TestHarness::new(MockEngineFactory::new());
    harness.seed(1);
    let controller = harness.controller(ProbeConfig {
        cooldown_secs: 1,
        ..fixtures::probe_config()
    });

    controller.start(params(vec![Pipeline::DhtCrawl])).await.unwrap();
    assert!(wait_until(|| harness.engines.created() == 4, Duration::from_secs(5)).await);
    assert!(
        wait_until(
            || controller.status().hashes_processed == 1 && harness.engines.lookups() == 2,
            Duration::from_secs(2)
        )
        .await
    );

    // Counters were reset on restart: the second pass counts from zero.
    let status = controller.status();
    assert!(status.running);
    assert_eq!(status.hashes_processed, 1);

    controller.stop().await;
}

#[tokio::test]
async fn test_crawl_scenario_duplicate_peer_yields_one_row() {
    let harness = TestHarness::new(MockEngineFactory::new());
    harness.seed(3);
    let dup = fixtures::peer(10, 6881);
    harness.engines.set_peers(fixtures::info_hash(2), vec![dup, dup]);
    let controller = harness.controller(fixtures::probe_config());

    controller.start(params(vec![Pipeline::DhtCrawl])).await.unwrap();
    assert!(
        wait_until(
            || controller.status().hashes_processed == 3,
            Duration::from_secs(5)
        )
        .await
    );

    let peers = harness
        .store
        .peers_for_infohash(&fixtures::info_hash(2))
        .unwrap();
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].host, "203.0.113.10");
    assert_eq!(peers[0].title.as_deref(), Some("Swarm 2"));

    controller.stop().await;
}

#[tokio::test]
async fn test_tracker_scenario_unreachable_and_reachable() {
    let harness = TestHarness::new(MockEngineFactory::new());
    harness.seed(1);
    harness.announcer.respond(
        REACHABLE,
        20,
        4,
        vec![fixtures::peer(1, 51413), fixtures::peer(2, 51413)],
    );
    let controller = harness.controller(fixtures::probe_config());

    controller
        .start(params(vec![Pipeline::QueryTrackers]))
        .await
        .unwrap();
    assert!(
        wait_until(
            || controller.status().hashes_processed == 1,
            Duration::from_secs(5)
        )
        .await
    );

    let rows = harness
        .store
        .tracker_peers_for_infohash(&fixtures::info_hash(1))
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.tracker == REACHABLE));
    // The tracker pipeline never needs routing engines.
    assert_eq!(harness.engines.created(), 0);

    controller.stop().await;
}

#[tokio::test]
async fn test_start_with_no_pipelines_is_rejected() {
    let harness = TestHarness::new(MockEngineFactory::new());
    let controller = harness.controller(fixtures::probe_config());

    let result = controller.start(params(Vec::new())).await;
    assert!(matches!(result, Err(ProbeError::Validation(_))));
    assert!(!controller.status().running);
    assert_eq!(harness.engines.created(), 0);
}

#[tokio::test]
async fn test_both_pipelines_run_together() {
    let harness = TestHarness::new(MockEngineFactory::new());
    harness.seed(2);
    harness
        .engines
        .set_peers(fixtures::info_hash(1), vec![fixtures::peer(3, 6881)]);
    harness
        .announcer
        .respond(REACHABLE, 1, 1, vec![fixtures::peer(4, 6881)]);
    let controller = harness.controller(fixtures::probe_config());

    controller
        .start(params(vec![Pipeline::DhtCrawl, Pipeline::QueryTrackers]))
        .await
        .unwrap();
    assert!(
        wait_until(
            || controller.status().hashes_processed == 4,
            Duration::from_secs(5)
        )
        .await
    );

    let stats = harness.store.stats().unwrap();
    assert_eq!(stats.total_infohashes, 2);
    // One crawl peer plus one tracker peer per infohash.
    assert_eq!(stats.total_peers, 3);

    controller.stop().await;
}
