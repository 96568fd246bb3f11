pub mod config;
pub mod engine;
pub mod geoip;
pub mod infohash;
pub mod metrics;
pub mod probe;
pub mod store;
pub mod testing;

pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use engine::{
    parse_torrent_identity, AnnounceClient, EngineError, HttpTrackerList, LibrqbitMetadataFetcher,
    MainlineEngineFactory, MetadataFetcher, RoutingEngineFactory, TorrentIdentity,
    TrackerAnnouncer, TrackerListSource,
};
pub use geoip::{ensure_databases, Enricher, GeoIpError, GeoLocation, MaxmindEnricher};
pub use infohash::{parse_magnet_link, InfoHash, InfoHashError, MagnetLink};
pub use probe::{
    Pipeline, ProbeController, ProbeDeps, ProbeError, ProbeStatus, SessionParams, StartOutcome,
    StopOutcome,
};
pub use store::{
    DatabaseStats, DeleteSummary, HostCount, HostInfohash, InfohashPeerCount, InfohashRecord,
    PeerRecord, ProbeStore, SqliteProbeStore, StoreError, TrackerPeerRecord,
};
