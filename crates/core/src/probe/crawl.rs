//! Routing-table crawl pipeline.

use std::net::SocketAddr;
use std::time::Instant;

use futures::{stream, StreamExt};
use tracing::{debug, info, warn};

use super::context::{ProbeDeps, SessionContext};
use super::pool::WorkerPool;
use super::stats::StatsHandle;
use super::types::Pipeline;
use crate::config::ProbeConfig;
use crate::infohash::InfoHash;
use crate::metrics;
use crate::store::{InfohashRecord, NewPeer};

/// One full pass: a lookup per stored infohash, spread over the pool.
pub(crate) async fn run_crawl(
    ctx: &SessionContext,
    deps: &ProbeDeps,
    pool: &WorkerPool,
    stats: &StatsHandle,
    config: &ProbeConfig,
) {
    let started = Instant::now();
    let records = match deps.store.list_infohashes() {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "Failed to load infohashes for crawl");
            return;
        }
    };

    info!(infohashes = records.len(), workers = pool.len(), "DHT crawl pass started");

    stream::iter(records)
        .for_each_concurrent(config.max_in_flight_lookups, |record| {
            crawl_one(ctx, deps, pool, stats, config, record)
        })
        .await;

    metrics::PASS_DURATION
        .with_label_values(&[Pipeline::DhtCrawl.metric_label()])
        .observe(started.elapsed().as_secs_f64());
    info!(
        elapsed_secs = started.elapsed().as_secs(),
        "DHT crawl pass finished"
    );
}

async fn crawl_one(
    ctx: &SessionContext,
    deps: &ProbeDeps,
    pool: &WorkerPool,
    stats: &StatsHandle,
    config: &ProbeConfig,
    record: InfohashRecord,
) {
    if !ctx.is_alive() {
        return;
    }

    let info_hash: InfoHash = match record.info_hash.parse() {
        Ok(hash) => hash,
        Err(e) => {
            warn!(info_hash = %record.info_hash, error = %e, "Skipping malformed infohash");
            metrics::LOOKUPS_TOTAL.with_label_values(&["skipped"]).inc();
            return;
        }
    };

    let Some(engine) = pool.pick() else {
        return;
    };

    let mut lookup = match engine.lookup(info_hash).await {
        Ok(lookup) => lookup,
        Err(e) => {
            debug!(info_hash = %info_hash, error = %e, "Lookup failed");
            metrics::LOOKUPS_TOTAL.with_label_values(&["failed"]).inc();
            return;
        }
    };

    let title = record.title.as_deref();
    let drained = tokio::time::timeout(config.lookup_timeout(), async {
        while let Some(addr) = lookup.next().await {
            // Late results from a stopped session are dropped.
            if !ctx.is_alive() {
                break;
            }
            stats.record_match();
            record_peer(deps, &info_hash, title, addr);
        }
    })
    .await;

    let result = if drained.is_ok() { "completed" } else { "timed_out" };
    metrics::LOOKUPS_TOTAL.with_label_values(&[result]).inc();
    stats.record_hash();
}

fn record_peer(deps: &ProbeDeps, info_hash: &InfoHash, title: Option<&str>, addr: SocketAddr) {
    let peer = NewPeer {
        host: addr.ip(),
        port: addr.port(),
        info_hash: *info_hash,
        title: title.map(str::to_string),
        location: deps.enricher.resolve(addr.ip()),
    };

    match deps.store.upsert_peer(&peer) {
        Ok(true) => {
            metrics::PEERS_PERSISTED
                .with_label_values(&[Pipeline::DhtCrawl.metric_label()])
                .inc();
            debug!(info_hash = %info_hash, peer = %addr, "New peer");
        }
        Ok(false) => {}
        Err(e) => warn!(info_hash = %info_hash, peer = %addr, error = %e, "Failed to store peer"),
    }
}
