//! HTTP tracker announce with bencoded responses.

use std::net::{IpAddr, SocketAddr};

use bendy::decoding::{Decoder, Object};

use super::{parse_compact_peers, parse_compact_peers_v6, AnnounceParams, AnnounceResponse};
use crate::engine::EngineError;

/// Build the announce URL for `params`.
pub(crate) fn build_announce_url(base: &str, params: &AnnounceParams) -> String {
    let mut url = String::from(base);
    if !url.contains('?') {
        url.push('?');
    } else if !url.ends_with('&') {
        url.push('&');
    }

    url.push_str("info_hash=");
    url.push_str(&urlencoding::encode_binary(&params.info_hash));
    url.push_str("&peer_id=");
    url.push_str(&urlencoding::encode_binary(&params.peer_id));
    url.push_str(&format!(
        "&port={}&uploaded=0&downloaded=0&left=0&compact=1&event=started",
        params.port
    ));
    url
}

/// Perform a single HTTP announce.
pub(crate) async fn announce(
    client: &reqwest::Client,
    tracker: &str,
    params: &AnnounceParams,
) -> Result<AnnounceResponse, EngineError> {
    let bytes = client
        .get(build_announce_url(tracker, params))
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    parse_announce_response(&bytes)
}

fn bencode_err(e: bendy::decoding::Error) -> EngineError {
    EngineError::Tracker(format!("bencode: {}", e))
}

fn integer(value: Object) -> Result<u32, EngineError> {
    let raw = value.try_into_integer().map_err(bencode_err)?;
    raw.parse::<i64>()
        .map(|v| v.clamp(0, u32::MAX as i64) as u32)
        .map_err(|e| EngineError::Tracker(format!("bad integer {raw:?}: {e}")))
}

/// Parse a bencoded announce response dictionary.
pub(crate) fn parse_announce_response(bytes: &[u8]) -> Result<AnnounceResponse, EngineError> {
    let mut decoder = Decoder::new(bytes);
    let object = decoder
        .next_object()
        .map_err(bencode_err)?
        .ok_or_else(|| EngineError::Tracker("empty tracker response".to_string()))?;
    let mut dict = object.try_into_dictionary().map_err(bencode_err)?;

    let mut response = AnnounceResponse::default();

    while let Some((key, value)) = dict.next_pair().map_err(bencode_err)? {
        match key {
            b"failure reason" => {
                let reason = value.try_into_bytes().map_err(bencode_err)?;
                return Err(EngineError::Tracker(
                    String::from_utf8_lossy(reason).into_owned(),
                ));
            }
            b"interval" => response.interval = integer(value)?,
            b"complete" => response.seeders = integer(value)?,
            b"incomplete" => response.leechers = integer(value)?,
            b"peers" => match value {
                Object::Bytes(compact) => response.peers.extend(parse_compact_peers(compact)),
                Object::List(mut list) => {
                    while let Some(entry) = list.next_object().map_err(bencode_err)? {
                        if let Some(addr) = parse_peer_dict(entry)? {
                            response.peers.push(addr);
                        }
                    }
                }
                _ => return Err(EngineError::Tracker("unexpected peers type".to_string())),
            },
            b"peers6" => {
                let compact = value.try_into_bytes().map_err(bencode_err)?;
                response.peers.extend(parse_compact_peers_v6(compact));
            }
            _ => {}
        }
    }

    Ok(response)
}

/// Non-compact peer entry: `{ip, port, [peer id]}`.
fn parse_peer_dict(entry: Object) -> Result<Option<SocketAddr>, EngineError> {
    let mut dict = entry.try_into_dictionary().map_err(bencode_err)?;
    let mut ip: Option<IpAddr> = None;
    let mut port: Option<u16> = None;

    while let Some((key, value)) = dict.next_pair().map_err(bencode_err)? {
        match key {
            b"ip" => {
                let raw = value.try_into_bytes().map_err(bencode_err)?;
                ip = std::str::from_utf8(raw).ok().and_then(|s| s.parse().ok());
            }
            b"port" => {
                let raw = value.try_into_integer().map_err(bencode_err)?;
                port = raw.parse().ok();
            }
            _ => {}
        }
    }

    Ok(ip.zip(port).map(|(ip, port)| SocketAddr::new(ip, port)))
}
