//! Mock metadata fetcher for testing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::engine::{EngineError, MetadataFetcher, TorrentMetadata};
use crate::infohash::InfoHash;

/// Mock implementation of [`MetadataFetcher`].
///
/// Returns the configured metadata, or fails when none is set.
#[derive(Debug, Clone, Default)]
pub struct MockMetadataFetcher {
    metadata: Arc<RwLock<Option<TorrentMetadata>>>,
    fetched: Arc<RwLock<Vec<InfoHash>>>,
    delay: Option<Duration>,
}

impl MockMetadataFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetcher that always returns `metadata`.
    pub fn returning(metadata: TorrentMetadata) -> Self {
        Self {
            metadata: Arc::new(RwLock::new(Some(metadata))),
            ..Self::default()
        }
    }

    /// Take `delay` to answer, like a slow swarm.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn set_metadata(&self, metadata: Option<TorrentMetadata>) {
        *self.metadata.write().await = metadata;
    }

    /// Infohashes fetched so far, in call order.
    pub async fn fetched(&self) -> Vec<InfoHash> {
        self.fetched.read().await.clone()
    }
}

#[async_trait]
impl MetadataFetcher for MockMetadataFetcher {
    async fn fetch(
        &self,
        info_hash: &InfoHash,
        _trackers: &[String],
    ) -> Result<TorrentMetadata, EngineError> {
        self.fetched.write().await.push(*info_hash);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.metadata
            .read()
            .await
            .clone()
            .ok_or_else(|| EngineError::Metadata("no peers served metadata".to_string()))
    }
}
