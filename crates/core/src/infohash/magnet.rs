use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::{InfoHash, InfoHashError};

static BTIH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"xt=urn:btih:([a-fA-F0-9]{40})(?:[&#]|$)").expect("static regex")
});

static DISPLAY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]dn=([^&#]+)").expect("static regex"));

/// A parsed magnet link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetLink {
    pub info_hash: InfoHash,
    /// Display name, or a placeholder derived from the hash when absent.
    pub title: String,
}

/// Parse a `magnet:?xt=urn:btih:<hex>` link.
///
/// Only hex (v1) infohashes are accepted.
pub fn parse_magnet_link(link: &str) -> Result<MagnetLink, InfoHashError> {
    let hex = BTIH
        .captures(link)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or(InfoHashError::InvalidLength(0))?;
    let info_hash: InfoHash = hex.parse()?;

    let title = DISPLAY_NAME
        .captures(link)
        .and_then(|c| c.get(1))
        .map(|m| decode_component(m.as_str()))
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| {
            let hex = info_hash.to_hex();
            format!("Magnet ({}...)", &hex[..10])
        });

    Ok(MagnetLink { info_hash, title })
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Build a magnet URI carrying the given trackers as `tr=` parameters.
pub fn build_magnet_uri(info_hash: &InfoHash, trackers: &[String]) -> String {
    let mut uri = format!("magnet:?xt=urn:btih:{}", info_hash);
    for tracker in trackers {
        uri.push_str("&tr=");
        uri.push_str(&urlencoding::encode(tracker));
    }
    uri
}
