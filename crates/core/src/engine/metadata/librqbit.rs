//! Metadata fetching through an embedded librqbit session.

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use librqbit::{AddTorrent, AddTorrentOptions, AddTorrentResponse, Session, SessionOptions};
use tracing::{debug, info};

use super::{parse_torrent_metadata, MetadataFetcher, TorrentMetadata};
use crate::config::MetadataConfig;
use crate::engine::EngineError;
use crate::infohash::{build_magnet_uri, InfoHash};
use crate::metrics;

/// Resolves magnets in list-only mode: the info dictionary is fetched from
/// the swarm, nothing is downloaded.
pub struct LibrqbitMetadataFetcher {
    session: Arc<Session>,
    timeout: Duration,
}

impl LibrqbitMetadataFetcher {
    pub async fn new(config: &MetadataConfig) -> Result<Self, EngineError> {
        std::fs::create_dir_all(&config.scratch_dir)?;

        let mut opts = SessionOptions::default();
        if let Some(port) = config.listen_port {
            opts.listen_port_range = Some(single_port_range(port)?);
        }

        info!(
            scratch_dir = %config.scratch_dir.display(),
            timeout_secs = config.timeout_secs,
            "Initializing metadata session"
        );

        let session = Session::new_with_opts(config.scratch_dir.clone(), opts)
            .await
            .map_err(|e| {
                EngineError::Metadata(format!("Failed to initialize librqbit session: {e:#}"))
            })?;

        Ok(Self {
            session,
            timeout: config.timeout(),
        })
    }
}

/// librqbit takes a half-open range; the top port has no exclusive end.
fn single_port_range(port: u16) -> Result<Range<u16>, EngineError> {
    let end = port.checked_add(1).ok_or_else(|| {
        EngineError::Metadata(format!("listen port {port} leaves no room for a range"))
    })?;
    Ok(port..end)
}

#[async_trait]
impl MetadataFetcher for LibrqbitMetadataFetcher {
    async fn fetch(
        &self,
        info_hash: &InfoHash,
        trackers: &[String],
    ) -> Result<TorrentMetadata, EngineError> {
        let magnet = build_magnet_uri(info_hash, trackers);
        let opts = AddTorrentOptions {
            list_only: true,
            ..Default::default()
        };

        let add = self
            .session
            .add_torrent(AddTorrent::from_url(&magnet), Some(opts));
        let response = match tokio::time::timeout(self.timeout, add).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                metrics::METADATA_FETCHES.with_label_values(&["failed"]).inc();
                return Err(EngineError::Metadata(format!("{e:#}")));
            }
            Err(_) => {
                metrics::METADATA_FETCHES
                    .with_label_values(&["timed_out"])
                    .inc();
                return Err(EngineError::Timeout(self.timeout));
            }
        };

        let result = match response {
            AddTorrentResponse::ListOnly(list) => parse_torrent_metadata(&list.torrent_bytes),
            _ => Err(EngineError::Metadata(
                "session did not resolve the magnet in list-only mode".to_string(),
            )),
        };

        match &result {
            Ok(meta) => {
                metrics::METADATA_FETCHES.with_label_values(&["ok"]).inc();
                debug!(info_hash = %info_hash, name = ?meta.name, files = meta.files.len(), "Fetched metadata");
            }
            Err(_) => metrics::METADATA_FETCHES.with_label_values(&["failed"]).inc(),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_port_range() {
        assert_eq!(single_port_range(6881).unwrap(), 6881..6882);
        assert_eq!(single_port_range(u16::MAX - 1).unwrap(), 65534..65535);
    }

    #[test]
    fn test_top_port_is_an_error() {
        assert!(matches!(
            single_port_range(u16::MAX),
            Err(EngineError::Metadata(_))
        ));
    }
}
