//! Pool of independent routing engines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::engine::{EngineError, RoutingEngineFactory, RoutingLookupEngine};

/// A fixed set of routing engines, each with its own listener budget.
pub struct WorkerPool {
    engines: Vec<Arc<dyn RoutingLookupEngine>>,
    destroyed: AtomicBool,
}

impl WorkerPool {
    /// Create `workers` engines. If any engine fails to start, the ones
    /// already created are destroyed before the error is returned.
    pub fn provision(
        factory: &dyn RoutingEngineFactory,
        workers: usize,
        listener_budget: usize,
    ) -> Result<Self, EngineError> {
        let mut engines = Vec::with_capacity(workers);
        for _ in 0..workers {
            match factory.create(listener_budget) {
                Ok(engine) => engines.push(engine),
                Err(e) => {
                    engines.iter().for_each(|engine| engine.destroy());
                    return Err(e);
                }
            }
        }

        info!(workers, listener_budget, "Worker pool provisioned");
        Ok(Self {
            engines,
            destroyed: AtomicBool::new(false),
        })
    }

    /// A uniformly random engine, or `None` once the pool is destroyed.
    pub fn pick(&self) -> Option<Arc<dyn RoutingLookupEngine>> {
        if self.is_destroyed() {
            return None;
        }
        self.engines.choose(&mut rand::thread_rng()).cloned()
    }

    /// Destroy every engine. Idempotent.
    pub fn destroy_all(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        for engine in &self.engines {
            engine.destroy();
        }
        debug!(workers = self.engines.len(), "Worker pool destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.destroy_all();
    }
}
