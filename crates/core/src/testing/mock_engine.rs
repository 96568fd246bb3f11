//! Mock routing engines for testing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use futures::StreamExt;

use crate::engine::{
    EngineError, ListenerBudget, PeerLookup, RoutingEngineFactory, RoutingLookupEngine,
};
use crate::infohash::InfoHash;

type PeerScript = Arc<RwLock<HashMap<InfoHash, Vec<SocketAddr>>>>;

/// Mock implementation of [`RoutingLookupEngine`].
///
/// Lookups replay the scripted peers for the infohash, then either end or,
/// with `hold_open`, stay pending until the engine is destroyed.
pub struct MockRoutingEngine {
    peers: PeerScript,
    budget: ListenerBudget,
    hold_open: bool,
    lookups: Arc<AtomicUsize>,
    destroyed: Arc<AtomicUsize>,
}

impl MockRoutingEngine {
    /// Standalone engine with no scripted peers.
    pub fn new(listener_budget: usize) -> Self {
        Self {
            peers: Arc::default(),
            budget: ListenerBudget::new(listener_budget),
            hold_open: false,
            lookups: Arc::default(),
            destroyed: Arc::default(),
        }
    }

    /// Script the peers reported for `info_hash`.
    pub fn set_peers(&self, info_hash: InfoHash, peers: Vec<SocketAddr>) {
        self.peers.write().unwrap().insert(info_hash, peers);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoutingLookupEngine for MockRoutingEngine {
    async fn lookup(&self, info_hash: InfoHash) -> Result<PeerLookup, EngineError> {
        let permit = self.budget.acquire().await?;
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let peers = self
            .peers
            .read()
            .unwrap()
            .get(&info_hash)
            .cloned()
            .unwrap_or_default();
        let scripted = futures::stream::iter(peers);

        if self.hold_open {
            let budget = self.budget.clone();
            // Pending until destroy closes the budget.
            let tail = futures::stream::once(async move {
                while !budget.is_closed() {
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                }
            })
            .filter_map(|_| async { None::<SocketAddr> });
            Ok(PeerLookup::new(Box::pin(scripted.chain(tail)), permit))
        } else {
            Ok(PeerLookup::new(Box::pin(scripted), permit))
        }
    }

    fn destroy(&self) {
        if !self.budget.is_closed() {
            self.budget.close();
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_destroyed(&self) -> bool {
        self.budget.is_closed()
    }
}

/// Mock implementation of [`RoutingEngineFactory`].
///
/// Every engine it creates shares the same peer script, so tests can
/// configure the factory once and let the worker pool pick freely.
#[derive(Default)]
pub struct MockEngineFactory {
    peers: PeerScript,
    hold_open: bool,
    fail_after: Option<usize>,
    created: AtomicUsize,
    budgets: Mutex<Vec<usize>>,
    lookups: Arc<AtomicUsize>,
    destroyed: Arc<AtomicUsize>,
}

impl MockEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep lookups open after the scripted peers until the engine is destroyed.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Fail every `create` after the first `n`.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Script the peers reported for `info_hash` by every engine.
    pub fn set_peers(&self, info_hash: InfoHash, peers: Vec<SocketAddr>) {
        self.peers.write().unwrap().insert(info_hash, peers);
    }

    /// Engines created so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Engines destroyed so far.
    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Lookups started across all engines.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Listener budget passed to each `create` call, in order.
    pub fn listener_budgets(&self) -> Vec<usize> {
        self.budgets.lock().unwrap().clone()
    }
}

impl RoutingEngineFactory for MockEngineFactory {
    fn create(&self, listener_budget: usize) -> Result<Arc<dyn RoutingLookupEngine>, EngineError> {
        if let Some(limit) = self.fail_after {
            if self.created() >= limit {
                return Err(EngineError::Lookup("mock engine refused to start".to_string()));
            }
        }

        self.created.fetch_add(1, Ordering::SeqCst);
        self.budgets.lock().unwrap().push(listener_budget);

        Ok(Arc::new(MockRoutingEngine {
            peers: Arc::clone(&self.peers),
            budget: ListenerBudget::new(listener_budget),
            hold_open: self.hold_open,
            lookups: Arc::clone(&self.lookups),
            destroyed: Arc::clone(&self.destroyed),
        }))
    }
}
