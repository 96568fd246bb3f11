//! Test doubles for the probe's network-facing collaborators.
//!
//! Everything here runs in-process without sockets, so pipeline and
//! controller behavior can be tested deterministically.
//!
//! # Example
//!
//! ```rust,ignore
//! use swarmprobe_core::testing::{fixtures, MockAnnouncer, MockEngineFactory};
//!
//! let engines = MockEngineFactory::new();
//! engines.set_peers(fixtures::info_hash(1), vec![fixtures::peer(1, 6881)]);
//!
//! let announcer = MockAnnouncer::new();
//! announcer.respond("udp://tracker.test:1337", 10, 3, vec![fixtures::peer(2, 51413)]);
//! ```

mod mock_announcer;
mod mock_engine;
mod mock_metadata;
mod static_sources;

pub use mock_announcer::{MockAnnouncer, TrackerScript};
pub use mock_engine::{MockEngineFactory, MockRoutingEngine};
pub use mock_metadata::MockMetadataFetcher;
pub use static_sources::{StaticEnricher, StaticTrackerList};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use crate::config::ProbeConfig;
    use crate::engine::TorrentMetadata;
    use crate::geoip::{GeoLocation, NetworkInfo, PlaceInfo};
    use crate::infohash::InfoHash;

    /// Infohash with every byte set to `n`.
    pub fn info_hash(n: u8) -> InfoHash {
        InfoHash::from_bytes([n; 20])
    }

    /// Peer in the 203.0.113.0/24 documentation block.
    pub fn peer(host: u8, port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(203, 0, 113, host)), port)
    }

    pub fn location(city: &str, country_code: &str, asn: u32, org: &str) -> GeoLocation {
        GeoLocation {
            place: PlaceInfo {
                city: Some(city.to_string()),
                country_code: Some(country_code.to_string()),
                latitude: Some(52.37),
                longitude: Some(4.89),
            },
            network: NetworkInfo {
                asn: Some(asn),
                as_organization: Some(org.to_string()),
            },
        }
    }

    pub fn torrent_metadata(name: &str, files: &[&str]) -> TorrentMetadata {
        TorrentMetadata {
            name: Some(name.to_string()),
            files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Probe settings with timings short enough for tests.
    pub fn probe_config() -> ProbeConfig {
        ProbeConfig {
            cooldown_secs: 1,
            tracker_window_secs: 1,
            lookup_timeout_secs: 5,
            fallback_trackers: Vec::new(),
            max_in_flight_lookups: 8,
            max_concurrent_tracker_rounds: 4,
            ..ProbeConfig::default()
        }
    }
}
