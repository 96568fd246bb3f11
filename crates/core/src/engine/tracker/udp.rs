//! UDP tracker announce (connect, then announce).

use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use url::Url;

use super::{parse_compact_peers, parse_compact_peers_v6, AnnounceParams, AnnounceResponse};
use crate::engine::EngineError;

const PROTOCOL_ID: u64 = 0x41727101980;
const ACTION_CONNECT: u32 = 0;
const ACTION_ANNOUNCE: u32 = 1;
const ACTION_ERROR: u32 = 3;

/// Resolve the tracker host of a `udp://host:port[/path]` URL.
pub(crate) async fn resolve_tracker_addr(tracker: &str) -> Result<SocketAddr, EngineError> {
    let invalid = |reason: String| EngineError::InvalidTracker {
        url: tracker.to_string(),
        reason,
    };

    let url = Url::parse(tracker).map_err(|e| invalid(e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| invalid("missing host".to_string()))?
        .trim_matches(|c| c == '[' || c == ']')
        .to_string();
    let port = url.port().ok_or_else(|| invalid("missing port".to_string()))?;

    let addr = tokio::net::lookup_host((host.as_str(), port)).await?.next();
    addr.ok_or_else(|| invalid("host did not resolve".to_string()))
}

fn build_connect_request(transaction_id: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(16);
    buf.put_u64(PROTOCOL_ID);
    buf.put_u32(ACTION_CONNECT);
    buf.put_u32(transaction_id);
    buf.freeze()
}

fn build_announce_request(
    connection_id: u64,
    transaction_id: u32,
    params: &AnnounceParams,
    key: u32,
) -> Bytes {
    let mut buf = BytesMut::with_capacity(98);
    buf.put_u64(connection_id);
    buf.put_u32(ACTION_ANNOUNCE);
    buf.put_u32(transaction_id);
    buf.put_slice(&params.info_hash);
    buf.put_slice(&params.peer_id);
    buf.put_u64(0); // downloaded
    buf.put_u64(0); // left
    buf.put_u64(0); // uploaded
    buf.put_u32(2); // event: started
    buf.put_u32(0); // ip: default
    buf.put_u32(key);
    buf.put_i32(-1); // numwant: default
    buf.put_u16(params.port);
    buf.freeze()
}

/// Read the 8-byte action/transaction header, surfacing tracker error packets.
fn check_header(
    mut packet: &[u8],
    expected_action: u32,
    transaction_id: u32,
) -> Result<&[u8], EngineError> {
    if packet.len() < 8 {
        return Err(EngineError::Tracker("short response".to_string()));
    }
    let action = packet.get_u32();
    let tid = packet.get_u32();
    if tid != transaction_id {
        return Err(EngineError::Tracker("transaction id mismatch".to_string()));
    }
    if action == ACTION_ERROR {
        return Err(EngineError::Tracker(
            String::from_utf8_lossy(packet).into_owned(),
        ));
    }
    if action != expected_action {
        return Err(EngineError::Tracker(format!(
            "unexpected action {action}, wanted {expected_action}"
        )));
    }
    Ok(packet)
}

fn parse_connect_response(packet: &[u8], transaction_id: u32) -> Result<u64, EngineError> {
    let mut body = check_header(packet, ACTION_CONNECT, transaction_id)?;
    if body.len() < 8 {
        return Err(EngineError::Tracker("short connect response".to_string()));
    }
    Ok(body.get_u64())
}

fn parse_announce_response(
    packet: &[u8],
    transaction_id: u32,
    ipv6: bool,
) -> Result<AnnounceResponse, EngineError> {
    let mut body = check_header(packet, ACTION_ANNOUNCE, transaction_id)?;
    if body.len() < 12 {
        return Err(EngineError::Tracker("short announce response".to_string()));
    }
    let interval = body.get_u32();
    let leechers = body.get_u32();
    let seeders = body.get_u32();
    let peers = if ipv6 {
        parse_compact_peers_v6(body)
    } else {
        parse_compact_peers(body)
    };

    Ok(AnnounceResponse {
        interval,
        seeders,
        leechers,
        peers,
    })
}

async fn exchange(
    socket: &UdpSocket,
    tracker: SocketAddr,
    request: &[u8],
    wait: Duration,
    buf: &mut [u8],
) -> Result<usize, EngineError> {
    socket.send_to(request, tracker).await?;
    loop {
        let (n, from) = timeout(wait, socket.recv_from(buf))
            .await
            .map_err(|_| EngineError::Timeout(wait))??;
        if from == tracker {
            return Ok(n);
        }
    }
}

/// Perform a single UDP announce.
pub(crate) async fn announce(
    tracker_url: &str,
    params: &AnnounceParams,
    wait: Duration,
) -> Result<AnnounceResponse, EngineError> {
    let tracker = resolve_tracker_addr(tracker_url).await?;
    let bind: SocketAddr = if tracker.is_ipv6() {
        "[::]:0".parse().map_err(|_| EngineError::Tracker("bind address".to_string()))?
    } else {
        "0.0.0.0:0".parse().map_err(|_| EngineError::Tracker("bind address".to_string()))?
    };
    let socket = UdpSocket::bind(bind).await?;
    let mut buf = [0u8; 2048];

    let transaction_id = rand::random::<u32>();
    let n = exchange(
        &socket,
        tracker,
        &build_connect_request(transaction_id),
        wait,
        &mut buf,
    )
    .await?;
    let connection_id = parse_connect_response(&buf[..n], transaction_id)?;

    let transaction_id = rand::random::<u32>();
    let request = build_announce_request(connection_id, transaction_id, params, rand::random());
    let n = exchange(&socket, tracker, &request, wait, &mut buf).await?;
    parse_announce_response(&buf[..n], transaction_id, tracker.is_ipv6())
}
