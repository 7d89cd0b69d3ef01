//! Tokio runtime implementation

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};

use super::transport::Transport;
use crate::error::{Result, SyncError};

/// TCP connection helper with a connect timeout
///
/// # Errors
///
/// Returns `ConnectionTimeout` if the peer does not accept in time, or
/// `ConnectionFailed` if the connection is refused or reset.
pub async fn connect_tcp(addr: SocketAddr, timeout: Duration) -> Result<TcpStream> {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(SyncError::ConnectionFailed {
            addr,
            message: e.to_string(),
            source: Some(e),
        }),
        Err(_) => Err(SyncError::ConnectionTimeout { duration: timeout }),
    }
}

/// UDP socket helper
///
/// # Errors
///
/// Returns an I/O error if the socket cannot be bound.
pub async fn bind_udp(ip: IpAddr, port: u16) -> io::Result<UdpSocket> {
    UdpSocket::bind(SocketAddr::new(ip, port)).await
}

/// UDP socket helper with `SO_BROADCAST` enabled
///
/// # Errors
///
/// Returns an I/O error if the socket cannot be bound or configured.
pub async fn bind_broadcast_udp(ip: IpAddr) -> io::Result<UdpSocket> {
    let socket = bind_udp(ip, 0).await?;
    socket.set_broadcast(true)?;
    Ok(socket)
}

/// Spawn a blocking task
pub fn spawn_blocking<F, R>(f: F) -> tokio::task::JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
}

/// `Transport` backed by tokio sockets
pub struct TokioTransport {
    /// Shared socket for outbound datagrams
    udp: UdpSocket,
    /// Connect timeout for command delivery
    connect_timeout: Duration,
}

impl TokioTransport {
    /// Bind the outbound datagram socket
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the socket cannot be bound.
    pub async fn bind(ip: IpAddr, connect_timeout: Duration) -> io::Result<Self> {
        Ok(Self {
            udp: bind_udp(ip, 0).await?,
            connect_timeout,
        })
    }
}

#[async_trait]
impl Transport for TokioTransport {
    async fn send_command(&self, addr: SocketAddr, line: &str) -> Result<()> {
        let mut stream = connect_tcp(addr, self.connect_timeout).await?;
        let mut wire = String::with_capacity(line.len() + 1);
        wire.push_str(line);
        wire.push('\n');
        stream.write_all(wire.as_bytes()).await?;
        stream.shutdown().await?;
        Ok(())
    }

    async fn send_datagram(&self, addr: SocketAddr, payload: &[u8]) -> Result<()> {
        self.udp.send_to(payload, addr).await?;
        Ok(())
    }
}
