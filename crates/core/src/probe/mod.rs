//! Probe sessions.
//!
//! A session runs one or both discovery pipelines over every stored
//! infohash, then waits out a cooldown and starts over with fresh counters
//! until it is stopped:
//! - **DHT Crawl**: a routing-table lookup per infohash, spread over a
//!   [`WorkerPool`] of independent engines.
//! - **Query Trackers**: an announce round per infohash against the merged
//!   tracker list, with an optional metadata fetch when any tracker answers.
//!
//! Discovered peers are enriched and written through the store; duplicate
//! discoveries collapse on the store's uniqueness constraints.

mod context;
mod controller;
mod crawl;
mod pool;
mod stats;
mod trackers;
mod types;

pub use context::ProbeDeps;
pub use controller::ProbeController;
pub use pool::WorkerPool;
pub use stats::{SessionStats, StatsHandle};
pub use types::{Pipeline, ProbeError, ProbeStatus, SessionParams, StartOutcome, StopOutcome};
