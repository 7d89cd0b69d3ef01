use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

use crate::error::SyncError;
use crate::net::{TimerHandle, TokioTransport, Transport, bind_udp, connect_tcp};

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

#[tokio::test]
async fn test_tcp_connect_refused() {
    // Bind then drop to find a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = connect_tcp(addr, Duration::from_secs(1)).await;
    assert!(matches!(result, Err(SyncError::ConnectionFailed { .. })));
}

#[tokio::test]
async fn test_send_command_appends_newline() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = String::new();
        stream.read_to_string(&mut received).await.unwrap();
        received
    });

    let transport = TokioTransport::bind(LOCALHOST, Duration::from_secs(1))
        .await
        .unwrap();
    transport.send_command(addr, "play").await.unwrap();

    assert_eq!(server.await.unwrap(), "play\n");
}

#[tokio::test]
async fn test_send_datagram() {
    let receiver = bind_udp(LOCALHOST, 0).await.unwrap();
    let addr: SocketAddr = receiver.local_addr().unwrap();

    let transport = TokioTransport::bind(LOCALHOST, Duration::from_secs(1))
        .await
        .unwrap();
    transport
        .send_datagram(addr, b"seek_to_time 1.000")
        .await
        .unwrap();

    let mut buf = [0u8; 64];
    let (len, _) = tokio::time::timeout(Duration::from_secs(1), receiver.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..len], b"seek_to_time 1.000");
}

#[tokio::test(start_paused = true)]
async fn test_timer_fires_once() {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let timer = TimerHandle::after(Duration::from_secs(1), async move {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // Cancelling after the fact is harmless
    timer.cancel();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timer_cancelled_before_firing() {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let timer = TimerHandle::after(Duration::from_secs(1), async move {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    timer.cancel();
    assert!(timer.is_cancelled());
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_timer_stops_on_drop() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = ticks.clone();
    let timer = TimerHandle::every(Duration::from_millis(50), move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    tokio::time::sleep(Duration::from_millis(175)).await;
    let seen = ticks.load(Ordering::SeqCst);
    // Immediate first tick plus up to three periods
    assert!((3..=4).contains(&seen), "saw {seen} ticks");

    drop(timer);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), seen);
}
