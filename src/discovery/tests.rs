use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::watch;

use super::{BeaconListener, DiscoveryBeacon};
use crate::peers::{LatencyProber, PeerTable};
use crate::state::{EventBus, EventFilter, NodeEvent};
use crate::types::{NodeConfig, Role, Settings};

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

async fn beacon_sink() -> (UdpSocket, NodeConfig) {
    let sink = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let config = NodeConfig::builder()
        .display_name("wall-left")
        .ephemeral_localhost()
        .beacon_address(LOCALHOST)
        .discovery_port(sink.local_addr().unwrap().port())
        .beacon_interval(Duration::from_millis(20))
        .build();
    (sink, config)
}

#[tokio::test]
async fn test_slave_broadcasts_display_name() {
    let (sink, config) = beacon_sink().await;
    let (_role_tx, role) = watch::channel(Role::Slave);
    let (_settings_tx, settings) = watch::channel(Settings::default());

    let beacon = DiscoveryBeacon::start(&config, role, settings).await.unwrap();
    assert!(beacon.is_enabled());

    let mut buf = [0u8; 64];
    let (len, _) = tokio::time::timeout(Duration::from_secs(1), sink.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..len], b"wall-left");
}

#[tokio::test]
async fn test_beacon_uses_name_from_settings() {
    let (sink, config) = beacon_sink().await;
    let (_role_tx, role) = watch::channel(Role::Slave);
    let (settings_tx, settings) = watch::channel(Settings::default());
    let beacon = DiscoveryBeacon::start(&config, role, settings).await.unwrap();
    beacon.stop();

    settings_tx.send_modify(|s| s.display_name = "wall-center".to_string());
    // Stopping only cancels the schedule; a manual announce still sends
    assert!(beacon.announce().await);

    let mut buf = [0u8; 64];
    loop {
        let (len, _) = tokio::time::timeout(Duration::from_secs(1), sink.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        if &buf[..len] == b"wall-center" {
            break;
        }
        // Scheduled beacons sent before the rename carry the configured name
        assert_eq!(&buf[..len], b"wall-left");
    }
}

#[tokio::test]
async fn test_master_does_not_beacon() {
    let (sink, config) = beacon_sink().await;
    let (_role_tx, role) = watch::channel(Role::Master);
    let (_settings_tx, settings) = watch::channel(Settings::default());

    let beacon = DiscoveryBeacon::start(&config, role, settings).await.unwrap();
    assert!(!beacon.is_enabled());
    assert!(!beacon.announce().await);

    let mut buf = [0u8; 64];
    let received =
        tokio::time::timeout(Duration::from_millis(150), sink.recv_from(&mut buf)).await;
    assert!(received.is_err());
}

#[tokio::test]
async fn test_beacon_follows_role_and_setting_changes() {
    let (_sink, config) = beacon_sink().await;
    let (role_tx, role) = watch::channel(Role::Slave);
    let (settings_tx, settings) = watch::channel(Settings::default());

    let beacon = DiscoveryBeacon::start(&config, role, settings).await.unwrap();
    assert!(beacon.announce().await);

    role_tx.send_replace(Role::Master);
    assert!(!beacon.announce().await);

    role_tx.send_replace(Role::Slave);
    settings_tx.send_modify(|s| s.beacon_enabled = false);
    assert!(!beacon.announce().await);

    settings_tx.send_modify(|s| s.beacon_enabled = true);
    assert!(beacon.announce().await);

    beacon.stop();
    assert!(!beacon.is_enabled());
}

#[tokio::test]
async fn test_listener_registers_sender() {
    // A control port that accepts but never answers, so probes stay pending
    let control = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let table = Arc::new(PeerTable::new(Duration::from_secs(10)));
    let events = EventBus::new();
    let mut peer_events = EventFilter::peer_events(&events);
    let prober = LatencyProber::new(
        table.clone(),
        control.local_addr().unwrap().port(),
        Duration::from_millis(100),
        events,
    );

    let listener = BeaconListener::bind(SocketAddr::new(LOCALHOST, 0), prober)
        .await
        .unwrap();

    let slave = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    slave
        .send_to(b"wall-right", listener.local_addr())
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), peer_events.recv())
        .await
        .unwrap();
    assert_eq!(event, Some(NodeEvent::PeerDiscovered { ip: LOCALHOST }));
    assert!(table.contains(LOCALHOST).await);
}
