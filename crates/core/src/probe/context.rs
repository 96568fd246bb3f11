use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::engine::{MetadataFetcher, RoutingEngineFactory, TrackerAnnouncer, TrackerListSource};
use crate::geoip::Enricher;
use crate::store::ProbeStore;

/// Long-lived collaborators shared by every session.
#[derive(Clone)]
pub struct ProbeDeps {
    pub store: Arc<dyn ProbeStore>,
    pub enricher: Arc<dyn Enricher>,
    pub engines: Arc<dyn RoutingEngineFactory>,
    pub announcer: Arc<dyn TrackerAnnouncer>,
    pub tracker_list: Arc<dyn TrackerListSource>,
    /// `None` disables metadata fetching in tracker rounds.
    pub metadata: Option<Arc<dyn MetadataFetcher>>,
}

/// Liveness of one session, shared by its pipelines.
#[derive(Clone)]
pub(crate) struct SessionContext {
    alive: Arc<AtomicBool>,
    shutdown: broadcast::Sender<()>,
}

impl SessionContext {
    pub(crate) fn new() -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            alive: Arc::new(AtomicBool::new(true)),
            shutdown,
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Flip the liveness flag and wake every waiter. Returns `false` if the
    /// session was already cancelled.
    pub(crate) fn cancel(&self) -> bool {
        let was_alive = self.alive.swap(false, Ordering::SeqCst);
        let _ = self.shutdown.send(());
        was_alive
    }

    pub(crate) fn same_session(&self, other: &SessionContext) -> bool {
        Arc::ptr_eq(&self.alive, &other.alive)
    }

    /// Subscribe before checking [`is_alive`](Self::is_alive) so a cancel
    /// between the two is not missed.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }
}
