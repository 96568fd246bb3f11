//! Tracker announce pipeline.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use futures::{stream, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::context::{ProbeDeps, SessionContext};
use super::stats::StatsHandle;
use super::types::Pipeline;
use crate::config::ProbeConfig;
use crate::engine::{
    generate_peer_id, resolve_trackers, AnnounceRequest, AnnounceSession, TrackerEvent,
};
use crate::infohash::InfoHash;
use crate::metrics;
use crate::store::{InfohashRecord, NewTrackerPeer};

/// What one tracker reported during a round.
#[derive(Debug, Default)]
struct Observation {
    seeders: Option<u32>,
    leechers: Option<u32>,
    hosts: BTreeSet<IpAddr>,
}

/// One full pass: an announce round per stored infohash.
pub(crate) async fn run_trackers(
    ctx: &SessionContext,
    deps: &ProbeDeps,
    stats: &StatsHandle,
    config: &ProbeConfig,
) {
    let started = Instant::now();
    let trackers = resolve_trackers(deps.tracker_list.as_ref(), &config.fallback_trackers).await;
    if trackers.is_empty() {
        warn!("No trackers available, skipping tracker pass");
        return;
    }

    let records = match deps.store.list_infohashes() {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "Failed to load infohashes for tracker pass");
            return;
        }
    };

    info!(
        infohashes = records.len(),
        trackers = trackers.len(),
        "Tracker pass started"
    );

    let trackers = trackers.as_slice();
    stream::iter(records)
        .for_each_concurrent(config.max_concurrent_tracker_rounds, |record| {
            tracker_round(ctx, deps, stats, config, trackers, record)
        })
        .await;

    metrics::PASS_DURATION
        .with_label_values(&[Pipeline::QueryTrackers.metric_label()])
        .observe(started.elapsed().as_secs_f64());
    info!(elapsed_secs = started.elapsed().as_secs(), "Tracker pass finished");
}

async fn tracker_round(
    ctx: &SessionContext,
    deps: &ProbeDeps,
    stats: &StatsHandle,
    config: &ProbeConfig,
    trackers: &[String],
    record: InfohashRecord,
) {
    let mut shutdown_rx = ctx.subscribe();
    if !ctx.is_alive() {
        return;
    }

    let info_hash: InfoHash = match record.info_hash.parse() {
        Ok(hash) => hash,
        Err(e) => {
            warn!(info_hash = %record.info_hash, error = %e, "Skipping malformed infohash");
            return;
        }
    };

    let mut session = deps.announcer.start(AnnounceRequest {
        info_hash,
        trackers: trackers.to_vec(),
        peer_id: generate_peer_id(),
        port: config.announce_port,
    });

    let observations =
        collect_events(config.tracker_window(), &mut shutdown_rx, &mut session).await;
    session.stop();

    if !ctx.is_alive() {
        return;
    }

    if observations.is_empty() {
        debug!(info_hash = %info_hash, "No tracker responded");
        metrics::TRACKER_ROUNDS.with_label_values(&["silent"]).inc();
        stats.record_hash();
        return;
    }

    if let Some(fetcher) = &deps.metadata {
        match fetcher.fetch(&info_hash, trackers).await {
            Ok(_) if !ctx.is_alive() => return,
            Ok(meta) => {
                let files = (!meta.files.is_empty()).then_some(meta.files.as_slice());
                if let Err(e) = deps
                    .store
                    .upsert_infohash(&info_hash, meta.name.as_deref(), files)
                {
                    warn!(info_hash = %info_hash, error = %e, "Failed to store metadata");
                }
            }
            Err(e) => debug!(info_hash = %info_hash, error = %e, "Metadata unavailable"),
        }
    }

    // The fetch can outlive the session.
    if !ctx.is_alive() {
        return;
    }

    let mut stored = 0usize;
    for (tracker, observation) in &observations {
        for host in &observation.hosts {
            stats.record_match();
            let peer = NewTrackerPeer {
                info_hash,
                host: *host,
                tracker: tracker.clone(),
                seeders: observation.seeders,
                leechers: observation.leechers,
                location: deps.enricher.resolve(*host),
            };
            match deps.store.upsert_tracker_peer(&peer) {
                Ok(true) => stored += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(info_hash = %info_hash, tracker = %tracker, host = %host, error = %e, "Failed to store tracker peer")
                }
            }
        }
    }

    metrics::PEERS_PERSISTED
        .with_label_values(&[Pipeline::QueryTrackers.metric_label()])
        .inc_by(stored as u64);
    metrics::TRACKER_ROUNDS.with_label_values(&["responded"]).inc();
    stats.record_hash();
    debug!(
        info_hash = %info_hash,
        trackers = observations.len(),
        new_peers = stored,
        "Tracker round complete"
    );
}

/// Gather events until the window closes, the session is cancelled or every
/// tracker task has finished.
async fn collect_events(
    window: Duration,
    shutdown_rx: &mut broadcast::Receiver<()>,
    session: &mut AnnounceSession,
) -> BTreeMap<String, Observation> {
    let mut observations: BTreeMap<String, Observation> = BTreeMap::new();
    let deadline = tokio::time::sleep(window);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = shutdown_rx.recv() => break,
            event = session.next_event() => match event {
                Some(TrackerEvent::Update { tracker, seeders, leechers }) => {
                    let entry = observations.entry(tracker).or_default();
                    entry.seeders = Some(seeders);
                    entry.leechers = Some(leechers);
                }
                Some(TrackerEvent::Peer { tracker, addr }) => {
                    observations.entry(tracker).or_default().hosts.insert(addr.ip());
                }
                None => break,
            },
        }
    }

    observations
}
