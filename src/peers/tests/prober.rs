use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use crate::error::SyncError;
use crate::peers::{ECHO_REPLY, LatencyProber, PeerTable, probe_latency};
use crate::state::{EventBus, EventFilter, NodeEvent};

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Accept one connection and answer its first line with `reply`
async fn one_shot_peer(reply: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "echo ping\n");
        reader
            .get_mut()
            .write_all(format!("{reply}\n").as_bytes())
            .await
            .unwrap();
    });
    addr
}

#[tokio::test]
async fn test_probe_latency_measures_echo() {
    let addr = one_shot_peer(ECHO_REPLY).await;
    let latency = probe_latency(addr, Duration::from_secs(2)).await.unwrap();
    assert!(latency < Duration::from_secs(1));
}

#[tokio::test]
async fn test_probe_latency_rejects_wrong_reply() {
    let addr = one_shot_peer("pong").await;
    let err = probe_latency(addr, Duration::from_secs(2))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::UnexpectedResponse { .. }));
}

#[tokio::test]
async fn test_probe_latency_times_out_on_silent_peer() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accepts but never answers
    let _hold = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(stream);
    });

    let err = probe_latency(addr, Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ConnectionTimeout { .. }));
}

#[tokio::test]
async fn test_beacon_adds_peer_and_records_latency() {
    let addr = one_shot_peer(ECHO_REPLY).await;
    let table = Arc::new(PeerTable::new(Duration::from_secs(10)));
    let events = EventBus::new();
    let mut peer_events = EventFilter::peer_events(&events);
    let prober = LatencyProber::new(table.clone(), addr.port(), Duration::from_secs(2), events);

    prober.on_beacon(LOCALHOST).await;

    assert_eq!(
        peer_events.recv().await,
        Some(NodeEvent::PeerDiscovered { ip: LOCALHOST })
    );
    let measured = tokio::time::timeout(Duration::from_secs(2), peer_events.recv())
        .await
        .unwrap();
    assert!(matches!(measured, Some(NodeEvent::LatencyMeasured { ip, .. }) if ip == LOCALHOST));

    let peer = table.get(LOCALHOST).await.unwrap();
    assert_eq!(peer.latency.len(), 1);
}

#[tokio::test]
async fn test_failed_probe_leaves_history_empty() {
    // Nothing listens on this port once the listener is dropped
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let table = Arc::new(PeerTable::new(Duration::from_secs(10)));
    let prober = LatencyProber::new(table.clone(), port, Duration::from_millis(200), EventBus::new());

    table.touch(LOCALHOST).await;
    prober.probe(LOCALHOST).await;

    let peer = table.get(LOCALHOST).await.unwrap();
    assert!(peer.latency.is_empty());
}
