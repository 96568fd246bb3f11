//! Fixed-answer enricher and tracker list.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::engine::{EngineError, TrackerListSource};
use crate::geoip::{Enricher, GeoLocation};

/// [`Enricher`] backed by an in-memory table. Unknown addresses resolve to
/// an empty location.
#[derive(Debug, Clone, Default)]
pub struct StaticEnricher {
    table: Arc<RwLock<HashMap<IpAddr, GeoLocation>>>,
}

impl StaticEnricher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, ip: IpAddr, location: GeoLocation) {
        self.table.write().unwrap().insert(ip, location);
    }
}

impl Enricher for StaticEnricher {
    fn resolve(&self, ip: IpAddr) -> GeoLocation {
        self.table
            .read()
            .unwrap()
            .get(&ip)
            .cloned()
            .unwrap_or_default()
    }
}

/// [`TrackerListSource`] that returns a fixed list, or always fails.
#[derive(Debug, Clone)]
pub struct StaticTrackerList {
    trackers: Option<Vec<String>>,
}

impl StaticTrackerList {
    pub fn new(trackers: Vec<String>) -> Self {
        Self {
            trackers: Some(trackers),
        }
    }

    /// A source that behaves like an unreachable list server.
    pub fn failing() -> Self {
        Self { trackers: None }
    }
}

#[async_trait]
impl TrackerListSource for StaticTrackerList {
    async fn fetch(&self) -> Result<Vec<String>, EngineError> {
        self.trackers
            .clone()
            .ok_or_else(|| EngineError::Tracker("tracker list unavailable".to_string()))
    }
}
