//! Types for probe result storage.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geoip::GeoLocation;
use crate::infohash::InfoHash;

/// A probe target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfohashRecord {
    pub id: i64,
    /// Stored form. Not guaranteed to be a valid infohash for rows written
    /// by older tooling, so callers parse it.
    pub info_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
    pub discovered_at: DateTime<Utc>,
}

/// A routing-table peer to record.
#[derive(Debug, Clone)]
pub struct NewPeer {
    pub host: IpAddr,
    pub port: u16,
    pub info_hash: InfoHash,
    pub title: Option<String>,
    pub location: GeoLocation,
}

/// A tracker peer to record.
#[derive(Debug, Clone)]
pub struct NewTrackerPeer {
    pub info_hash: InfoHash,
    pub host: IpAddr,
    pub tracker: String,
    pub seeders: Option<u32>,
    pub leechers: Option<u32>,
    pub location: GeoLocation,
}

/// A stored routing-table peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRecord {
    pub host: String,
    pub port: u16,
    pub info_hash: String,
    pub title: Option<String>,
    pub asn: Option<u32>,
    pub as_organization: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub discovered_at: DateTime<Utc>,
}

/// A stored tracker peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerPeerRecord {
    pub info_hash: String,
    pub host: String,
    pub asn: Option<u32>,
    pub as_organization: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub tracker: String,
    pub seeders: Option<u32>,
    pub leechers: Option<u32>,
    pub discovered_at: DateTime<Utc>,
}

/// One infohash a host participated in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostInfohash {
    pub info_hash: String,
    pub title: Option<String>,
    pub ports: Vec<u16>,
    pub latest_discovered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostCount {
    pub host: String,
    pub unique_infohashes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfohashPeerCount {
    pub info_hash: String,
    pub title: Option<String>,
    pub peer_count: u64,
}

/// Table totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub total_infohashes: u64,
    /// Routing-table peers plus tracker peers.
    pub total_peers: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_recent_peer: Option<DateTime<Utc>>,
}

/// Rows removed by a delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSummary {
    pub infohashes: usize,
    pub peers: usize,
    pub tracker_peers: usize,
}

/// Errors for storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
