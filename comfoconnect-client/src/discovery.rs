//! Bridge discovery
//!
//! Bridges answer a fixed probe datagram on UDP port 56747. Probes go out on
//! every interface's directed broadcast (or straight to one host), replies
//! are collected until the timeout and deduplicated by bridge uuid.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::time::Duration;

use comfoconnect_core::ComfoResult;
use comfoconnect_proto::discovery::{SearchGatewayResponse, SEARCH_GATEWAY_REQUEST};
use comfoconnect_transport::udp;
use tokio::net::UdpSocket;
use tokio::time::Instant;

use crate::bridge::{Bridge, PORT};

/// Default time to wait for discovery replies.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Discover all bridges reachable on the local network.
///
/// Returns the bridges that answered within the timeout; an empty list when
/// none did.
pub async fn discover_bridges(timeout: Duration) -> ComfoResult<Vec<Bridge>> {
    let socket = udp::broadcast_socket()?;
    let mut targets = udp::broadcast_addresses()?;
    if targets.is_empty() {
        log::debug!("No broadcast-capable interface, falling back to the limited broadcast");
        targets.push(Ipv4Addr::BROADCAST);
    }
    for target in targets {
        log::debug!("Sending discovery request to {target}:{PORT}");
        if let Err(e) = socket.send_to(SEARCH_GATEWAY_REQUEST, (target, PORT)).await {
            log::warn!("Discovery probe to {target} failed: {e}");
        }
    }
    collect(&socket, false, timeout).await
}

/// Probe a single host for a bridge.
pub async fn discover_bridge(host: &str, timeout: Duration) -> ComfoResult<Option<Bridge>> {
    let socket = udp::broadcast_socket()?;
    socket.send_to(SEARCH_GATEWAY_REQUEST, (host, PORT)).await?;
    Ok(collect(&socket, true, timeout).await?.into_iter().next())
}

/// Collect discovery replies until the timeout.
///
/// Replies are deduplicated by bridge uuid so a bridge reachable over more
/// than one interface shows up once. With `stop_after_first` the first valid
/// reply ends the wait.
async fn collect(
    socket: &UdpSocket,
    stop_after_first: bool,
    timeout: Duration,
) -> ComfoResult<Vec<Bridge>> {
    let deadline = Instant::now() + timeout;
    let mut seen = HashSet::new();
    let mut bridges = Vec::new();
    let mut buf = vec![0u8; 1024];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let (length, from) = match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await
        {
            Ok(received) => received?,
            Err(_) => break,
        };
        let datagram = &buf[..length];
        if datagram == SEARCH_GATEWAY_REQUEST {
            // Our own probe, looped back by the broadcast.
            continue;
        }
        match SearchGatewayResponse::decode(datagram) {
            Ok(response) => {
                if seen.insert(response.uuid) {
                    log::debug!(
                        "Found bridge {} at {} (version {})",
                        response.uuid,
                        response.ip_address,
                        response.version
                    );
                    bridges.push(Bridge::discovered(
                        response.ip_address,
                        response.uuid,
                        response.version,
                    ));
                    if stop_after_first {
                        break;
                    }
                }
            }
            Err(e) => log::warn!("Ignoring malformed discovery reply from {from}: {e}"),
        }
    }
    Ok(bridges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Spawn a fake bridge; returns the probing socket and the bridge port.
    async fn fake_bridge(replies: Vec<Vec<u8>>) -> (UdpSocket, u16) {
        let bridge_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = bridge_socket.local_addr().unwrap().port();
        let probe_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (length, from) = bridge_socket.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..length], SEARCH_GATEWAY_REQUEST);
            for reply in replies {
                bridge_socket.send_to(&reply, from).await.unwrap();
            }
        });
        (probe_socket, port)
    }

    #[tokio::test]
    async fn test_targeted_discovery_returns_the_bridge() {
        let reply = SearchGatewayResponse {
            ip_address: "192.168.1.213".to_string(),
            uuid: Uuid::from_bytes([0xA5; 16]),
            version: 1,
        }
        .encode();
        let (probe_socket, port) = fake_bridge(vec![reply]).await;

        probe_socket
            .send_to(SEARCH_GATEWAY_REQUEST, ("127.0.0.1", port))
            .await
            .unwrap();
        let bridges = collect(&probe_socket, true, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(bridges.len(), 1);
        assert_eq!(bridges[0].host(), "192.168.1.213");
        assert_eq!(bridges[0].uuid(), Uuid::from_bytes([0xA5; 16]));
        assert_eq!(bridges[0].version(), Some(1));
    }

    #[tokio::test]
    async fn test_replies_are_deduplicated_by_uuid() {
        let duplicated = SearchGatewayResponse {
            ip_address: "192.168.1.213".to_string(),
            uuid: Uuid::from_bytes([0xA5; 16]),
            version: 1,
        }
        .encode();
        let other = SearchGatewayResponse {
            ip_address: "192.168.1.214".to_string(),
            uuid: Uuid::from_bytes([0xA6; 16]),
            version: 1,
        }
        .encode();
        let (probe_socket, port) =
            fake_bridge(vec![duplicated.clone(), duplicated, other]).await;

        probe_socket
            .send_to(SEARCH_GATEWAY_REQUEST, ("127.0.0.1", port))
            .await
            .unwrap();
        let bridges = collect(&probe_socket, false, Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(bridges.len(), 2);
        assert_eq!(bridges[0].host(), "192.168.1.213");
        assert_eq!(bridges[1].host(), "192.168.1.214");
    }

    #[tokio::test]
    async fn test_malformed_replies_are_skipped() {
        let reply = SearchGatewayResponse {
            ip_address: "192.168.1.213".to_string(),
            uuid: Uuid::from_bytes([0xA5; 16]),
            version: 1,
        }
        .encode();
        let (probe_socket, port) = fake_bridge(vec![vec![0xFF, 0xFF, 0xFF], reply]).await;

        probe_socket
            .send_to(SEARCH_GATEWAY_REQUEST, ("127.0.0.1", port))
            .await
            .unwrap();
        let bridges = collect(&probe_socket, true, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(bridges.len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_returns_what_was_gathered() {
        let probe_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let bridges = collect(&probe_socket, false, Duration::from_millis(100))
            .await
            .unwrap();
        assert!(bridges.is_empty());
    }
}
