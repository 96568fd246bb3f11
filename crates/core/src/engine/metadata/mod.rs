//! Torrent metadata retrieval.

mod librqbit;
mod torrent_parser;

pub use self::librqbit::LibrqbitMetadataFetcher;
pub use torrent_parser::{parse_torrent_identity, parse_torrent_metadata, TorrentIdentity};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::infohash::InfoHash;

/// Name and file listing of a torrent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentMetadata {
    pub name: Option<String>,
    pub files: Vec<String>,
}

/// Fetches metadata for an infohash from its swarm.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// `trackers` are passed along as hints for finding the swarm.
    async fn fetch(
        &self,
        info_hash: &InfoHash,
        trackers: &[String],
    ) -> Result<TorrentMetadata, EngineError>;
}
