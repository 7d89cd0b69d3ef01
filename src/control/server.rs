//! TCP control server and UDP command listener

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use futures::SinkExt;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedWrite, LinesCodec};
use tokio_util::sync::CancellationToken;

use super::connection::{Connection, ConnectionKind};
use super::dispatcher::Dispatcher;
use crate::error::{Result, SyncError};

const READ_BUFFER_SIZE: usize = 4096;
/// Unterminated input beyond this is dispatched as is
const MAX_PENDING_LINE: usize = 64 * 1024;
const MAX_DATAGRAM_SIZE: usize = 2048;

/// Accept loop for TCP control connections
pub struct ControlServer {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
}

impl ControlServer {
    /// Bind and start accepting connections
    ///
    /// # Errors
    ///
    /// Returns `BindFailed` if the port cannot be bound.
    pub async fn bind(
        addr: SocketAddr,
        dispatcher: Arc<Dispatcher>,
        idle_timeout: Duration,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| SyncError::BindFailed {
                what: "control listener",
                port: addr.port(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();

        tracing::info!("Control server listening on {}", local_addr);

        let token = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, peer)) => {
                                let dispatcher = dispatcher.clone();
                                let token = token.child_token();
                                tokio::spawn(async move {
                                    serve_connection(stream, peer, dispatcher, idle_timeout, token).await;
                                });
                            }
                            Err(e) => {
                                tracing::error!("Accept error: {}", e);
                            }
                        }
                    }
                    () = token.cancelled() => {
                        break;
                    }
                }
            }
            tracing::debug!("Control server on {} stopped", local_addr);
        });

        Ok(Self {
            local_addr,
            shutdown,
        })
    }

    /// Address the server is bound to
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting and close open connections
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Handle a single control connection
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    idle_timeout: Duration,
    shutdown: CancellationToken,
) {
    tracing::debug!(%peer, "Control connection opened");

    let (mut reader, writer) = stream.into_split();
    let (conn, outbound) = Connection::new(peer, ConnectionKind::Stream);
    dispatcher.track(&conn).await;

    tokio::spawn(write_replies(writer, outbound, conn.closed_token(), shutdown.clone()));

    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
    loop {
        let read = tokio::select! {
            () = shutdown.cancelled() => break,
            read = tokio::time::timeout(idle_timeout, reader.read_buf(&mut buf)) => read,
        };

        match read {
            Ok(Ok(0)) => {
                tracing::debug!(%peer, "Control connection closed by peer");
                if !buf.is_empty() {
                    let tail = buf.split();
                    dispatcher.dispatch(&conn, &tail).await;
                }
                break;
            }
            Ok(Ok(_)) => {
                // Complete lines only; a partial command waits for its newline
                if let Some(end) = buf.iter().rposition(|&b| b == b'\n') {
                    let payload = buf.split_to(end + 1);
                    dispatcher.dispatch(&conn, &payload).await;
                } else if buf.len() >= MAX_PENDING_LINE {
                    tracing::warn!(%peer, len = buf.len(), "Dispatching unterminated input");
                    let payload = buf.split();
                    dispatcher.dispatch(&conn, &payload).await;
                }
            }
            Ok(Err(e)) => {
                tracing::debug!(%peer, "Control connection error: {}", e);
                break;
            }
            Err(_) => {
                tracing::debug!(%peer, "Control connection idle for {:?}", idle_timeout);
                break;
            }
        }
    }
    // Replies already queued are still flushed; handles held elsewhere
    // (e.g. a log stream) keep the write side open.
}

async fn write_replies(
    writer: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<String>,
    closed: CancellationToken,
    shutdown: CancellationToken,
) {
    let mut sink = FramedWrite::new(writer, LinesCodec::new());
    loop {
        let line = tokio::select! {
            () = shutdown.cancelled() => break,
            line = outbound.recv() => line,
        };
        let Some(line) = line else {
            break;
        };
        if let Err(e) = sink.send(line).await {
            tracing::debug!("Reply write failed: {}", e);
            break;
        }
    }
    closed.cancel();
}

/// Receive loop for commands arriving as UDP datagrams
///
/// Each datagram is one payload. Replies produced while it is dispatched
/// are sent back to the source address.
pub struct DatagramServer {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
}

impl DatagramServer {
    /// Bind and start receiving
    ///
    /// # Errors
    ///
    /// Returns `BindFailed` if the port cannot be bound.
    pub async fn bind(addr: SocketAddr, dispatcher: Arc<Dispatcher>) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| SyncError::BindFailed {
                what: "sync listener",
                port: addr.port(),
                source,
            })?;
        let local_addr = socket.local_addr()?;
        let shutdown = CancellationToken::new();

        tracing::info!("Sync listener bound on {}", local_addr);

        let token = shutdown.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; MAX_DATAGRAM_SIZE];
            loop {
                let received = tokio::select! {
                    () = token.cancelled() => break,
                    received = socket.recv_from(&mut buf) => received,
                };
                match received {
                    Ok((len, src)) => {
                        serve_datagram(&socket, &dispatcher, src, &buf[..len]).await;
                    }
                    Err(e) => {
                        // ICMP port unreachable from an earlier send shows up here on some platforms
                        tracing::debug!("Datagram receive error: {}", e);
                    }
                }
            }
        });

        Ok(Self {
            local_addr,
            shutdown,
        })
    }

    /// Address the listener is bound to
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop receiving
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for DatagramServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn serve_datagram(socket: &UdpSocket, dispatcher: &Dispatcher, src: SocketAddr, payload: &[u8]) {
    let (conn, mut outbound) = Connection::new(src, ConnectionKind::Datagram);
    dispatcher.dispatch(&conn, payload).await;
    conn.close();

    while let Ok(line) = outbound.try_recv() {
        if let Err(e) = socket.send_to(line.as_bytes(), src).await {
            tracing::debug!(%src, "Datagram reply failed: {}", e);
            break;
        }
    }
}
