//! Example: Two displays of a video wall on one host
//!
//! Starts a slave and a master on localhost, lets the slave's beacon reach
//! the master, then plays a clip and prints what the master sees.
//!
//! Run with `RUST_LOG=wallsync=debug` to follow the corrections.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use wallsync::testing::SimulatedMedia;
use wallsync::{MediaController, Node, NodeConfig, Role, SyncAction};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let discovery_port = wallsync::types::DEFAULT_DISCOVERY_PORT;

    let slave_media = Arc::new(SimulatedMedia::new().with_duration(90.0));
    let slave = Node::start(
        NodeConfig::builder()
            .display_name("wall-right")
            .ephemeral_localhost()
            .discovery_port(discovery_port)
            .beacon_address("127.0.0.1".parse()?)
            .beacon_interval(Duration::from_millis(500))
            .build(),
        slave_media.clone(),
    )
    .await?;

    let master_media = Arc::new(SimulatedMedia::new().with_duration(90.0));
    let master = Node::start(
        NodeConfig::builder()
            .display_name("wall-left")
            .ephemeral_localhost()
            .discovery_port(discovery_port)
            .peer_ports(slave.control_addr().port(), slave.sync_addr().port())
            .role(Role::Master)
            .build(),
        master_media.clone(),
    )
    .await?;

    println!("Waiting for the slave's beacon...");
    while master.core().peers().is_empty().await {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    master.core().apply(SyncAction::Load("intro.mp4".into())).await?;
    master.core().apply(SyncAction::Play).await?;

    // Knock the slave off the timeline to watch it recover
    tokio::time::sleep(Duration::from_secs(1)).await;
    slave_media.set_position(slave_media.current_time() + 0.2);

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        println!(
            "master {:.3}s  slave {:.3}s  slave rate {:.4}",
            master_media.current_time(),
            slave_media.current_time(),
            slave_media.rate(),
        );
    }

    println!("{}", serde_json::to_string_pretty(&master.core().snapshot().await?)?);

    master.shutdown().await;
    slave.shutdown().await;
    Ok(())
}
