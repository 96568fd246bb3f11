//! Persistence for discovered swarms and peers.
//!
//! Three tables: `infohashes` (the probe targets), `peers` (routing-table
//! discoveries) and `tracker_peers` (tracker announce discoveries). Writers
//! rely on uniqueness constraints instead of read-before-write, so duplicate
//! discoveries from concurrent lookups collapse into one row.

mod sqlite;
mod types;

pub use sqlite::SqliteProbeStore;
pub use types::*;

use std::net::Ipv4Addr;

use crate::infohash::InfoHash;

/// Trait for probe result storage.
pub trait ProbeStore: Send + Sync {
    /// Insert an infohash, or fill its missing title/files and refresh
    /// `discovered_at` when it already exists. Present values are never
    /// overwritten.
    fn upsert_infohash(
        &self,
        info_hash: &InfoHash,
        title: Option<&str>,
        files: Option<&[String]>,
    ) -> Result<(), StoreError>;

    /// Insert an infohash if absent. Returns `false` when it already existed.
    fn add_infohash(&self, info_hash: &InfoHash, title: &str) -> Result<bool, StoreError>;

    /// Record a routing-table peer. Returns `false` if the
    /// (host, port, infohash) triple was already known.
    fn upsert_peer(&self, peer: &NewPeer) -> Result<bool, StoreError>;

    /// Record a tracker peer. Returns `false` if the
    /// (infohash, host, tracker) triple was already known.
    fn upsert_tracker_peer(&self, peer: &NewTrackerPeer) -> Result<bool, StoreError>;

    /// Delete infohashes by id together with their peers and tracker peers.
    ///
    /// All-or-nothing: on any failure nothing is deleted.
    fn delete_infohashes(&self, ids: &[i64]) -> Result<DeleteSummary, StoreError>;

    /// All infohashes, most recently discovered first.
    fn list_infohashes(&self) -> Result<Vec<InfohashRecord>, StoreError>;

    /// Routing-table peers recorded for one infohash.
    fn peers_for_infohash(&self, info_hash: &InfoHash) -> Result<Vec<PeerRecord>, StoreError>;

    /// One page of [`peers_for_infohash`](Self::peers_for_infohash), in the same order.
    fn peers_for_infohash_page(
        &self,
        info_hash: &InfoHash,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PeerRecord>, StoreError>;

    /// Number of routing-table peers recorded for one infohash.
    fn count_peers_for_infohash(&self, info_hash: &InfoHash) -> Result<u64, StoreError>;

    /// Tracker peers recorded for one infohash.
    fn tracker_peers_for_infohash(
        &self,
        info_hash: &InfoHash,
    ) -> Result<Vec<TrackerPeerRecord>, StoreError>;

    /// Infohashes a host was seen in, grouped with the ports it used.
    fn peers_for_host(
        &self,
        host: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<HostInfohash>, StoreError>;

    /// Number of distinct infohashes a host was seen in.
    fn count_infohashes_for_host(&self, host: &str) -> Result<u64, StoreError>;

    /// Other known hosts in the same /24 block.
    fn neighboring_hosts(&self, ip: Ipv4Addr) -> Result<Vec<String>, StoreError>;

    /// Hosts seen in the most distinct infohashes.
    fn top_hosts(&self, limit: u32) -> Result<Vec<HostCount>, StoreError>;

    /// Infohashes with the most routing-table peers.
    fn top_infohashes(&self, limit: u32) -> Result<Vec<InfohashPeerCount>, StoreError>;

    /// Table totals.
    fn stats(&self) -> Result<DatabaseStats, StoreError>;
}
