//! Types for probe sessions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::EngineError;

/// Errors returned by the session controller.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Rejected start parameters. Nothing was changed.
    #[error("invalid session parameters: {0}")]
    Validation(String),

    /// The worker pool could not be provisioned.
    #[error("failed to provision worker pool: {0}")]
    Engine(#[from] EngineError),
}

/// A discovery mechanism run across the whole infohash set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pipeline {
    #[serde(rename = "DHT Crawl")]
    DhtCrawl,
    #[serde(rename = "Query Trackers")]
    QueryTrackers,
}

impl Pipeline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pipeline::DhtCrawl => "DHT Crawl",
            Pipeline::QueryTrackers => "Query Trackers",
        }
    }

    /// Label used in metrics.
    pub fn metric_label(&self) -> &'static str {
        match self {
            Pipeline::DhtCrawl => "dht_crawl",
            Pipeline::QueryTrackers => "query_trackers",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pipeline {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DHT Crawl" => Ok(Pipeline::DhtCrawl),
            "Query Trackers" => Ok(Pipeline::QueryTrackers),
            other => Err(ProbeError::Validation(format!("unknown pipeline: {other:?}"))),
        }
    }
}

/// Parameters of one probe session. Reused unchanged by every self-restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParams {
    /// Number of routing engines in the worker pool.
    pub workers: usize,
    /// Concurrent lookups allowed per routing engine.
    pub listener_budget: usize,
    pub pipelines: Vec<Pipeline>,
}

impl SessionParams {
    /// Build params from pipeline names as received over the wire.
    pub fn parse(
        workers: usize,
        listener_budget: usize,
        pipelines: &[String],
    ) -> Result<Self, ProbeError> {
        let pipelines = pipelines
            .iter()
            .map(|p| p.parse())
            .collect::<Result<Vec<Pipeline>, _>>()?;
        let params = Self {
            workers,
            listener_budget,
            pipelines,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.pipelines.is_empty() {
            return Err(ProbeError::Validation(
                "at least one pipeline is required".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(ProbeError::Validation("workers must be at least 1".to_string()));
        }
        if self.listener_budget == 0 {
            return Err(ProbeError::Validation(
                "listener_budget must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn includes(&self, pipeline: Pipeline) -> bool {
        self.pipelines.contains(&pipeline)
    }
}

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Result of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

/// Snapshot of the current session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeStatus {
    pub running: bool,
    /// Infohashes processed per second since the session (re)started.
    pub hashes_per_second: f64,
    pub elapsed_seconds: f64,
    /// Peer addresses reported by the pipelines.
    pub matches: u64,
    pub hashes_processed: u64,
}
