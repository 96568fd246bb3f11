//! Protocol engines used by the discovery pipelines.
//!
//! The pipelines never talk to the network directly. They drive three
//! narrow contracts:
//! - [`RoutingLookupEngine`]: stream the peers of an infohash from the
//!   mainline DHT, with a per-engine cap on concurrent lookups.
//! - [`TrackerAnnouncer`]: announce an infohash to a set of trackers and
//!   report per-tracker swarm counts and peers as events.
//! - [`MetadataFetcher`]: resolve a swarm's name and file list.
//!
//! Concrete adapters live next to each contract; test doubles live in
//! [`crate::testing`].

mod error;
mod mainline;
pub mod metadata;
mod routing;
pub mod tracker;

pub use error::EngineError;
pub use self::mainline::{MainlineEngine, MainlineEngineFactory};
pub use metadata::{
    parse_torrent_identity, LibrqbitMetadataFetcher, MetadataFetcher, TorrentIdentity,
    TorrentMetadata,
};
pub use routing::{ListenerBudget, PeerLookup, PeerStream, RoutingEngineFactory, RoutingLookupEngine};
pub use tracker::{
    generate_peer_id, resolve_trackers, AnnounceClient, AnnounceRequest, AnnounceSession,
    HttpTrackerList, TrackerAnnouncer, TrackerEvent, TrackerListSource,
};
