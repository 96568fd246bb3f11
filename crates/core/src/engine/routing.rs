//! Routing-table lookup contract.

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::EngineError;
use crate::infohash::InfoHash;

pub type PeerStream = Pin<Box<dyn Stream<Item = SocketAddr> + Send>>;

/// An in-progress lookup.
///
/// Yields peer addresses as the engine hears about them; the end of the
/// stream is the lookup's completion. Holding the lookup holds one slot of
/// the engine's listener budget.
pub struct PeerLookup {
    peers: PeerStream,
    _permit: OwnedSemaphorePermit,
}

impl PeerLookup {
    pub fn new(peers: PeerStream, permit: OwnedSemaphorePermit) -> Self {
        Self {
            peers,
            _permit: permit,
        }
    }
}

impl Stream for PeerLookup {
    type Item = SocketAddr;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.peers.as_mut().poll_next(cx)
    }
}

/// Caps the number of lookups an engine has outstanding at once.
#[derive(Debug, Clone)]
pub struct ListenerBudget {
    slots: Arc<Semaphore>,
}

impl ListenerBudget {
    pub fn new(max_outstanding: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(max_outstanding.max(1))),
        }
    }

    /// Wait for a free slot. Fails once the budget is closed.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, EngineError> {
        Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| EngineError::Destroyed)
    }

    /// Wake all waiters with an error and refuse new lookups.
    pub fn close(&self) {
        self.slots.close();
    }

    pub fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }

    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }
}

/// One independent routing-table client.
#[async_trait]
pub trait RoutingLookupEngine: Send + Sync {
    /// Start a peer lookup for `info_hash`.
    ///
    /// Waits for a listener slot first; fails with
    /// [`EngineError::Destroyed`] once the engine has been destroyed.
    async fn lookup(&self, info_hash: InfoHash) -> Result<PeerLookup, EngineError>;

    /// Release the engine's network resources. Idempotent.
    ///
    /// Lookups already handed out end early; their late results are dropped.
    fn destroy(&self);

    fn is_destroyed(&self) -> bool;
}

/// Builds engines for a worker pool.
pub trait RoutingEngineFactory: Send + Sync {
    fn create(&self, listener_budget: usize) -> Result<Arc<dyn RoutingLookupEngine>, EngineError>;
}
