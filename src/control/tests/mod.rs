mod dispatcher;

use std::net::SocketAddr;

use super::{Connection, ConnectionKind};

fn test_connection() -> (Connection, tokio::sync::mpsc::UnboundedReceiver<String>) {
    let peer: SocketAddr = "192.168.1.20:40000".parse().unwrap();
    Connection::new(peer, ConnectionKind::Stream)
}
