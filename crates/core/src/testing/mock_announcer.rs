//! Mock tracker announcer for testing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use crate::engine::{AnnounceRequest, AnnounceSession, TrackerAnnouncer, TrackerEvent};

/// Canned response of one tracker.
#[derive(Debug, Clone, Default)]
pub struct TrackerScript {
    pub seeders: u32,
    pub leechers: u32,
    pub peers: Vec<SocketAddr>,
}

/// Mock implementation of [`TrackerAnnouncer`].
///
/// Trackers with a script answer immediately; every other tracker in the
/// request stays silent, like an unreachable one. By default silent trackers
/// finish at once; with [`hold_silent`](Self::hold_silent) they keep the
/// session open until it is stopped.
#[derive(Debug, Clone, Default)]
pub struct MockAnnouncer {
    scripts: Arc<RwLock<HashMap<String, TrackerScript>>>,
    requests: Arc<RwLock<Vec<AnnounceRequest>>>,
    hold_silent: bool,
}

impl MockAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Silent trackers never finish, so only the caller's window ends a round.
    pub fn hold_silent(mut self) -> Self {
        self.hold_silent = true;
        self
    }

    /// Make `tracker` respond with the given swarm counts and peers.
    pub fn respond(&self, tracker: &str, seeders: u32, leechers: u32, peers: Vec<SocketAddr>) {
        self.scripts.write().unwrap().insert(
            tracker.to_string(),
            TrackerScript {
                seeders,
                leechers,
                peers,
            },
        );
    }

    /// All announce requests started so far.
    pub fn requests(&self) -> Vec<AnnounceRequest> {
        self.requests.read().unwrap().clone()
    }
}

impl TrackerAnnouncer for MockAnnouncer {
    fn start(&self, request: AnnounceRequest) -> AnnounceSession {
        let (tx, mut session) = AnnounceSession::channel();
        let scripts = self.scripts.read().unwrap().clone();

        for tracker in &request.trackers {
            let Some(script) = scripts.get(tracker).cloned() else {
                if self.hold_silent {
                    let tx = tx.clone();
                    session.spawn(async move {
                        let _held = tx;
                        std::future::pending::<()>().await;
                    });
                }
                continue;
            };
            let tx = tx.clone();
            let tracker = tracker.clone();
            session.spawn(async move {
                let _ = tx
                    .send(TrackerEvent::Update {
                        tracker: tracker.clone(),
                        seeders: script.seeders,
                        leechers: script.leechers,
                    })
                    .await;
                for addr in script.peers {
                    let _ = tx
                        .send(TrackerEvent::Peer {
                            tracker: tracker.clone(),
                            addr,
                        })
                        .await;
                }
            });
        }

        self.requests.write().unwrap().push(request);
        session
    }
}
