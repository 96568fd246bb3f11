use std::sync::Arc;

use swarmprobe_core::{Config, ProbeController, ProbeStore};

/// Shared application state
pub struct AppState {
    config: Config,
    controller: Arc<ProbeController>,
    store: Arc<dyn ProbeStore>,
}

impl AppState {
    pub fn new(config: Config, controller: Arc<ProbeController>, store: Arc<dyn ProbeStore>) -> Self {
        Self {
            config,
            controller,
            store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn controller(&self) -> &ProbeController {
        self.controller.as_ref()
    }

    pub fn store(&self) -> &dyn ProbeStore {
        self.store.as_ref()
    }
}
