//! Tracker announce engine.
//!
//! An [`AnnounceSession`] announces one infohash to every tracker at once
//! and surfaces what comes back as [`TrackerEvent`]s on a channel. Trackers
//! that never answer simply produce no events; the caller decides how long
//! to listen.

mod http;
mod list;
mod udp;

pub use list::{merge_tracker_lists, parse_tracker_list, resolve_trackers, HttpTrackerList, TrackerListSource};

use std::net::SocketAddr;
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;

use super::EngineError;
use crate::infohash::InfoHash;
use crate::metrics;

const PEER_ID_PREFIX: &[u8; 8] = b"-SP0100-";
const EVENT_BUFFER: usize = 256;

/// What to announce.
#[derive(Debug, Clone)]
pub struct AnnounceRequest {
    pub info_hash: InfoHash,
    pub trackers: Vec<String>,
    pub peer_id: [u8; 20],
    pub port: u16,
}

/// Something a tracker told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    /// Swarm counts as reported by one tracker.
    Update {
        tracker: String,
        seeders: u32,
        leechers: u32,
    },
    /// One peer address returned by one tracker.
    Peer { tracker: String, addr: SocketAddr },
}

/// A running announce. Dropping or stopping it cancels all outstanding requests.
pub struct AnnounceSession {
    events: mpsc::Receiver<TrackerEvent>,
    tasks: JoinSet<()>,
}

impl AnnounceSession {
    /// Create an event channel and an empty session reading from it.
    pub fn channel() -> (mpsc::Sender<TrackerEvent>, Self) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (
            tx,
            Self {
                events: rx,
                tasks: JoinSet::new(),
            },
        )
    }

    /// Run `task` as part of this session.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    /// Next event, or `None` once every tracker task has finished.
    pub async fn next_event(&mut self) -> Option<TrackerEvent> {
        self.events.recv().await
    }

    /// Cancel all outstanding tracker requests.
    pub fn stop(mut self) {
        self.tasks.abort_all();
    }
}

/// Starts announce sessions.
pub trait TrackerAnnouncer: Send + Sync {
    fn start(&self, request: AnnounceRequest) -> AnnounceSession;
}

/// Announces over UDP (BEP 15) and HTTP(S) (BEP 3, compact).
#[derive(Debug, Clone)]
pub struct AnnounceClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl AnnounceClient {
    pub fn new(timeout: Duration) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("swarmprobe/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, timeout })
    }
}

impl TrackerAnnouncer for AnnounceClient {
    fn start(&self, request: AnnounceRequest) -> AnnounceSession {
        let (tx, mut session) = AnnounceSession::channel();

        for tracker in request.trackers.iter().cloned() {
            let tx = tx.clone();
            let http = self.http.clone();
            let timeout = self.timeout;
            let info_hash = request.info_hash;
            let peer_id = request.peer_id;
            let port = request.port;

            session.spawn(async move {
                let params = AnnounceParams {
                    info_hash: *info_hash.as_bytes(),
                    peer_id,
                    port,
                };
                let (protocol, result) = if tracker.starts_with("udp://") {
                    ("udp", udp::announce(&tracker, &params, timeout).await)
                } else if tracker.starts_with("http://") || tracker.starts_with("https://") {
                    ("http", http::announce(&http, &tracker, &params).await)
                } else {
                    debug!(%tracker, "Skipping tracker with unsupported scheme");
                    return;
                };

                match result {
                    Ok(response) => {
                        metrics::TRACKER_ANNOUNCES
                            .with_label_values(&[protocol, "ok"])
                            .inc();
                        forward_response(&tx, &tracker, response).await;
                    }
                    Err(e) => {
                        metrics::TRACKER_ANNOUNCES
                            .with_label_values(&[protocol, "error"])
                            .inc();
                        debug!(%tracker, %info_hash, error = %e, "Tracker announce failed");
                    }
                }
            });
        }

        session
    }
}

/// Fields shared by both announce transports.
#[derive(Debug, Clone)]
pub(crate) struct AnnounceParams {
    pub info_hash: [u8; 20],
    pub peer_id: [u8; 20],
    pub port: u16,
}

/// Parsed announce response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct AnnounceResponse {
    pub interval: u32,
    pub seeders: u32,
    pub leechers: u32,
    pub peers: Vec<SocketAddr>,
}

async fn forward_response(
    tx: &mpsc::Sender<TrackerEvent>,
    tracker: &str,
    response: AnnounceResponse,
) {
    let update = TrackerEvent::Update {
        tracker: tracker.to_string(),
        seeders: response.seeders,
        leechers: response.leechers,
    };
    if tx.send(update).await.is_err() {
        return;
    }
    for addr in response.peers {
        let event = TrackerEvent::Peer {
            tracker: tracker.to_string(),
            addr,
        };
        if tx.send(event).await.is_err() {
            return;
        }
    }
}

/// A fresh Azureus-style peer id: fixed client prefix plus 12 random
/// alphanumerics.
pub fn generate_peer_id() -> [u8; 20] {
    let mut id = [0u8; 20];
    id[..8].copy_from_slice(PEER_ID_PREFIX);
    let mut rng = rand::thread_rng();
    for byte in id[8..].iter_mut() {
        *byte = rng.sample(Alphanumeric);
    }
    id
}

/// Decode compact IPv4 peers (6 bytes each).
pub(crate) fn parse_compact_peers(bytes: &[u8]) -> Vec<SocketAddr> {
    bytes
        .chunks_exact(6)
        .map(|c| {
            let ip = std::net::Ipv4Addr::new(c[0], c[1], c[2], c[3]);
            SocketAddr::new(ip.into(), u16::from_be_bytes([c[4], c[5]]))
        })
        .collect()
}

/// Decode compact IPv6 peers (18 bytes each).
pub(crate) fn parse_compact_peers_v6(bytes: &[u8]) -> Vec<SocketAddr> {
    bytes
        .chunks_exact(18)
        .map(|c| {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&c[..16]);
            let ip = std::net::Ipv6Addr::from(octets);
            SocketAddr::new(ip.into(), u16::from_be_bytes([c[16], c[17]]))
        })
        .collect()
}
