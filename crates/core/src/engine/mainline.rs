//! Mainline DHT routing engine.

use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::StreamExt;
use mainline::async_dht::AsyncDht;
use mainline::{Dht, Id};
use tracing::debug;

use super::{EngineError, ListenerBudget, PeerLookup, RoutingEngineFactory, RoutingLookupEngine};
use crate::infohash::InfoHash;

/// A DHT client node with its own socket and routing table.
pub struct MainlineEngine {
    dht: RwLock<Option<AsyncDht>>,
    budget: ListenerBudget,
}

impl MainlineEngine {
    /// Bootstrap a new client node.
    pub fn new(listener_budget: usize) -> Result<Self, EngineError> {
        let dht = Dht::client().map_err(|e| EngineError::Lookup(e.to_string()))?;

        Ok(Self {
            dht: RwLock::new(Some(dht.as_async())),
            budget: ListenerBudget::new(listener_budget),
        })
    }

    fn handle(&self) -> Result<AsyncDht, EngineError> {
        self.dht
            .read()
            .map_err(|_| EngineError::Lookup("dht handle lock poisoned".to_string()))?
            .clone()
            .ok_or(EngineError::Destroyed)
    }
}

#[async_trait]
impl RoutingLookupEngine for MainlineEngine {
    async fn lookup(&self, info_hash: InfoHash) -> Result<PeerLookup, EngineError> {
        let permit = self.budget.acquire().await?;
        let dht = self.handle()?;
        let id = Id::from_bytes(info_hash.as_bytes())
            .map_err(|e| EngineError::Lookup(e.to_string()))?;

        // Responses arrive in batches, one per responding node.
        let peers = dht
            .get_peers(id)
            .flat_map(|batch| futures::stream::iter(batch.into_iter().map(SocketAddr::V4)));

        Ok(PeerLookup::new(Box::pin(peers), permit))
    }

    fn destroy(&self) {
        self.budget.close();
        // Dropping the last handle shuts the node's actor down, which ends
        // any streams still being polled.
        if let Ok(mut guard) = self.dht.write() {
            if guard.take().is_some() {
                debug!("DHT engine destroyed");
            }
        }
    }

    fn is_destroyed(&self) -> bool {
        self.budget.is_closed()
    }
}

/// Creates [`MainlineEngine`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct MainlineEngineFactory;

impl RoutingEngineFactory for MainlineEngineFactory {
    fn create(&self, listener_budget: usize) -> Result<Arc<dyn RoutingLookupEngine>, EngineError> {
        Ok(Arc::new(MainlineEngine::new(listener_budget)?))
    }
}
