use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::probe::Pipeline;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub geoip: GeoIpConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    3005
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("swarmprobe.db")
}

/// Offline lookup tables used for peer enrichment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeoIpConfig {
    /// MaxMind city database (GeoLite2-City.mmdb or compatible)
    #[serde(default = "default_city_db")]
    pub city_db: PathBuf,
    /// MaxMind ASN database (GeoLite2-ASN.mmdb or compatible)
    #[serde(default = "default_asn_db")]
    pub asn_db: PathBuf,
    /// Gzipped city database fetched when `city_db` is missing. Empty disables.
    #[serde(default = "default_city_db_url")]
    pub city_db_url: String,
    /// Gzipped ASN database fetched when `asn_db` is missing. Empty disables.
    #[serde(default = "default_asn_db_url")]
    pub asn_db_url: String,
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

impl GeoIpConfig {
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

impl Default for GeoIpConfig {
    fn default() -> Self {
        Self {
            city_db: default_city_db(),
            asn_db: default_asn_db(),
            city_db_url: default_city_db_url(),
            asn_db_url: default_asn_db_url(),
            download_timeout_secs: default_download_timeout(),
        }
    }
}

fn default_city_db() -> PathBuf {
    PathBuf::from("Geo-ASN-Databases/GeoLite2-City.mmdb")
}

fn default_asn_db() -> PathBuf {
    PathBuf::from("Geo-ASN-Databases/GeoLite2-ASN.mmdb")
}

fn default_city_db_url() -> String {
    "https://cdn.jsdelivr.net/npm/geolite2-city/GeoLite2-City.mmdb.gz".to_string()
}

fn default_asn_db_url() -> String {
    "https://cdn.jsdelivr.net/npm/geolite2-asn/GeoLite2-ASN.mmdb.gz".to_string()
}

fn default_download_timeout() -> u64 {
    300
}

/// Probe session tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Delay between a completed pass and the automatic restart (seconds).
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,

    /// How long a tracker round collects announce responses (seconds).
    #[serde(default = "default_tracker_window")]
    pub tracker_window_secs: u64,

    /// Port reported to trackers in announces.
    #[serde(default = "default_announce_port")]
    pub announce_port: u16,

    /// Remote list of trackers, one URL per line.
    #[serde(default = "default_tracker_list_url")]
    pub tracker_list_url: String,

    #[serde(default = "default_tracker_list_timeout")]
    pub tracker_list_timeout_secs: u64,

    /// Trackers always announced to, merged with the remote list.
    #[serde(default = "default_fallback_trackers")]
    pub fallback_trackers: Vec<String>,

    /// Upper bound on crawl lookups in flight across the whole pool.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight_lookups: usize,

    /// A crawl lookup that has not ended by then is treated as complete (seconds).
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,

    /// Upper bound on concurrent tracker rounds.
    #[serde(default = "default_max_tracker_rounds")]
    pub max_concurrent_tracker_rounds: usize,

    /// Per-tracker request timeout (seconds).
    #[serde(default = "default_announce_timeout")]
    pub announce_timeout_secs: u64,

    #[serde(default = "default_workers")]
    pub default_workers: usize,

    #[serde(default = "default_listener_budget")]
    pub default_listener_budget: usize,

    #[serde(default = "default_pipelines")]
    pub default_pipelines: Vec<Pipeline>,

    /// Start a session with the defaults above when the server boots.
    #[serde(default)]
    pub autostart: bool,
}

impl ProbeConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn tracker_window(&self) -> Duration {
        Duration::from_secs(self.tracker_window_secs)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn tracker_list_timeout(&self) -> Duration {
        Duration::from_secs(self.tracker_list_timeout_secs)
    }

    pub fn announce_timeout(&self) -> Duration {
        Duration::from_secs(self.announce_timeout_secs)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown(),
            tracker_window_secs: default_tracker_window(),
            announce_port: default_announce_port(),
            tracker_list_url: default_tracker_list_url(),
            tracker_list_timeout_secs: default_tracker_list_timeout(),
            fallback_trackers: default_fallback_trackers(),
            max_in_flight_lookups: default_max_in_flight(),
            lookup_timeout_secs: default_lookup_timeout(),
            max_concurrent_tracker_rounds: default_max_tracker_rounds(),
            announce_timeout_secs: default_announce_timeout(),
            default_workers: default_workers(),
            default_listener_budget: default_listener_budget(),
            default_pipelines: default_pipelines(),
            autostart: false,
        }
    }
}

fn default_cooldown() -> u64 {
    600 // 10 minutes
}

fn default_tracker_window() -> u64 {
    15
}

fn default_announce_port() -> u16 {
    6881
}

fn default_tracker_list_url() -> String {
    "https://raw.githubusercontent.com/ngosang/trackerslist/master/trackers_best.txt".to_string()
}

fn default_tracker_list_timeout() -> u64 {
    10
}

pub fn default_fallback_trackers() -> Vec<String> {
    [
        "udp://glotorrents.pw:6969/announce",
        "udp://torrent.gresille.org:80/announce",
        "udp://tracker.openbittorrent.com:80",
        "udp://tracker.coppersurfer.tk:6969",
        "udp://tracker.leechers-paradise.org:6969",
        "udp://p4p.arenabg.ch:1337",
        "udp://tracker.internetwarriors.net:1337",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_in_flight() -> usize {
    64
}

fn default_lookup_timeout() -> u64 {
    120
}

fn default_max_tracker_rounds() -> usize {
    16
}

fn default_announce_timeout() -> u64 {
    5
}

fn default_workers() -> usize {
    4
}

fn default_listener_budget() -> usize {
    120
}

fn default_pipelines() -> Vec<Pipeline> {
    vec![Pipeline::DhtCrawl]
}

/// Torrent metadata fetching for tracker rounds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetadataConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Give up on a swarm's metadata after this long (seconds).
    #[serde(default = "default_metadata_timeout")]
    pub timeout_secs: u64,

    /// TCP listen port for the metadata session (ephemeral when unset).
    #[serde(default)]
    pub listen_port: Option<u16>,

    /// Session output folder. Nothing is written here in list-only mode.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
}

impl MetadataConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_metadata_timeout(),
            listen_port: None,
            scratch_dir: default_scratch_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_metadata_timeout() -> u64 {
    30
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("swarmprobe-metadata")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3005);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path, PathBuf::from("swarmprobe.db"));
        assert_eq!(config.probe.cooldown_secs, 600);
        assert_eq!(config.probe.tracker_window_secs, 15);
        assert_eq!(config.probe.announce_port, 6881);
        assert_eq!(config.probe.default_workers, 4);
        assert_eq!(config.probe.default_listener_budget, 120);
        assert_eq!(config.probe.fallback_trackers.len(), 7);
        assert!(!config.probe.autostart);
        assert!(config.metadata.enabled);
    }

    #[test]
    fn test_deserialize_probe_section() {
        let toml = r#"
[probe]
cooldown_secs = 60
default_pipelines = ["DHT Crawl", "Query Trackers"]
fallback_trackers = ["udp://tracker.example:1337"]
autostart = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.probe.cooldown(), Duration::from_secs(60));
        assert_eq!(
            config.probe.default_pipelines,
            vec![Pipeline::DhtCrawl, Pipeline::QueryTrackers]
        );
        assert_eq!(config.probe.fallback_trackers, vec!["udp://tracker.example:1337"]);
        assert!(config.probe.autostart);
    }

    #[test]
    fn test_deserialize_unknown_pipeline_fails() {
        let toml = r#"
[probe]
default_pipelines = ["Port Scan"]
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_geoip_paths() {
        let toml = r#"
[geoip]
city_db = "/data/city.mmdb"
asn_db = "/data/asn.mmdb"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.geoip.city_db, PathBuf::from("/data/city.mmdb"));
        assert_eq!(config.geoip.asn_db, PathBuf::from("/data/asn.mmdb"));
        assert!(config.geoip.city_db_url.ends_with("GeoLite2-City.mmdb.gz"));
        assert!(config.geoip.asn_db_url.ends_with("GeoLite2-ASN.mmdb.gz"));
        assert_eq!(config.geoip.download_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_deserialize_geoip_download_disabled() {
        let toml = r#"
[geoip]
city_db_url = ""
asn_db_url = ""
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.geoip.city_db_url.is_empty());
        assert!(config.geoip.asn_db_url.is_empty());
    }
}
