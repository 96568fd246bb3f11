//! Tracker list sources.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::engine::EngineError;

/// Somewhere to get an up-to-date tracker list from.
#[async_trait]
pub trait TrackerListSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<String>, EngineError>;
}

/// Plain-text list served over HTTP, one tracker URL per line.
pub struct HttpTrackerList {
    client: reqwest::Client,
    url: String,
}

impl HttpTrackerList {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TrackerListSource for HttpTrackerList {
    async fn fetch(&self) -> Result<Vec<String>, EngineError> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_tracker_list(&body))
    }
}

/// Split a tracker list body into URLs, skipping blank lines and comments.
pub fn parse_tracker_list(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Union of both lists, first occurrence wins.
pub fn merge_tracker_lists(remote: Vec<String>, fallback: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    remote
        .into_iter()
        .chain(fallback.iter().cloned())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Fetch the remote list and merge it with `fallback`.
///
/// A failed fetch is logged and the fallback list is used alone.
pub async fn resolve_trackers(source: &dyn TrackerListSource, fallback: &[String]) -> Vec<String> {
    match source.fetch().await {
        Ok(remote) => {
            info!(remote = remote.len(), fallback = fallback.len(), "Fetched tracker list");
            merge_tracker_lists(remote, fallback)
        }
        Err(e) => {
            warn!(error = %e, "Failed to fetch tracker list, using fallback trackers");
            merge_tracker_lists(Vec::new(), fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource;

    #[async_trait]
    impl TrackerListSource for FailingSource {
        async fn fetch(&self) -> Result<Vec<String>, EngineError> {
            Err(EngineError::Tracker("offline".to_string()))
        }
    }

    #[test]
    fn test_parse_tracker_list_skips_blank_lines() {
        let body = "udp://a:1/announce\n\n  udp://b:2/announce  \n# comment\n\nhttp://c/announce\n";
        assert_eq!(
            parse_tracker_list(body),
            vec!["udp://a:1/announce", "udp://b:2/announce", "http://c/announce"]
        );
    }

    #[test]
    fn test_merge_deduplicates_preserving_order() {
        let merged = merge_tracker_lists(
            vec!["udp://a:1".to_string(), "udp://b:2".to_string()],
            &["udp://b:2".to_string(), "udp://c:3".to_string()],
        );
        assert_eq!(merged, vec!["udp://a:1", "udp://b:2", "udp://c:3"]);
    }

    #[tokio::test]
    async fn test_resolve_falls_back_on_error() {
        let fallback = vec!["udp://fallback:1".to_string(), "udp://fallback:1".to_string()];
        let trackers = resolve_trackers(&FailingSource, &fallback).await;
        assert_eq!(trackers, vec!["udp://fallback:1"]);
    }
}
