//! Integration tests for the TCP transport.
//!
//! These tests spin up a real `TcpListener` on a random port and talk to
//! it through [`TcpConnector`], so bytes actually cross the loopback
//! interface.

use std::time::Duration;

use socha_transport::{Connection, Connector, TcpConnector, TransportError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Binds a listener on a random port and returns it with its port.
async fn listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let port = listener.local_addr().expect("local addr").port();
    (listener, port)
}

#[tokio::test]
async fn test_tcp_send_and_receive() {
    let (listener, port) = listener().await;
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("should accept");
        let mut buf = [0u8; 64];
        let n = socket.read(&mut buf).await.expect("server read");
        socket.write_all(b"<joined roomId=\"r\"/>").await.expect("server write");
        buf[..n].to_vec()
    });

    let mut conn = TcpConnector::new("127.0.0.1", port)
        .connect()
        .await
        .expect("should connect");
    assert!(conn.is_connected());
    assert!(conn.id().into_inner() > 0);

    conn.send(b"<protocol><join/>").await.expect("send should succeed");

    let mut received = Vec::new();
    for _ in 0..50 {
        received.extend(conn.receive_timeout(Duration::from_millis(100)).await);
        if !received.is_empty() {
            break;
        }
    }
    assert_eq!(received, b"<joined roomId=\"r\"/>");

    let seen_by_server = server.await.expect("server task");
    assert_eq!(seen_by_server, b"<protocol><join/>");
}

#[tokio::test]
async fn test_tcp_receive_timeout_returns_empty() {
    let (listener, port) = listener().await;
    let _server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.expect("should accept");
        // Hold the socket open without writing anything.
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(socket);
    });

    let mut conn = TcpConnector::new("127.0.0.1", port)
        .connect()
        .await
        .expect("should connect");

    let chunk = conn.receive_timeout(Duration::from_millis(20)).await;
    assert!(chunk.is_empty(), "a quiet server is not an error");
    assert!(conn.is_connected(), "a timeout must not close the connection");
}

#[tokio::test]
async fn test_tcp_peer_close_disconnects() {
    let (listener, port) = listener().await;
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.expect("should accept");
        drop(socket);
    });

    let mut conn = TcpConnector::new("127.0.0.1", port)
        .connect()
        .await
        .expect("should connect");
    server.await.expect("server task");

    for _ in 0..50 {
        conn.receive_timeout(Duration::from_millis(50)).await;
        if !conn.is_connected() {
            break;
        }
    }
    assert!(!conn.is_connected(), "peer close should close the connection");

    // Closed for good: reads stay empty and writes are refused.
    assert!(conn.receive_timeout(Duration::from_millis(10)).await.is_empty());
    assert!(matches!(
        conn.send(b"<close/>").await,
        Err(TransportError::NotConnected)
    ));
}

#[tokio::test]
async fn test_tcp_close_is_idempotent() {
    let (listener, port) = listener().await;
    let _server = tokio::spawn(async move {
        let _ = listener.accept().await;
    });

    let mut conn = TcpConnector::new("127.0.0.1", port)
        .connect()
        .await
        .expect("should connect");
    conn.close().await;
    conn.close().await;
    assert!(!conn.is_connected());
}

#[tokio::test]
async fn test_tcp_connect_refused() {
    // Grab a free port, then release it so nothing is listening.
    let (listener, port) = listener().await;
    drop(listener);

    let result = TcpConnector::new("127.0.0.1", port).connect().await;
    match result {
        Err(TransportError::Connect { addr, .. }) => {
            assert_eq!(addr, format!("127.0.0.1:{port}"));
        }
        Err(other) => panic!("expected Connect error, got {other}"),
        Ok(_) => panic!("connect should fail with nothing listening"),
    }
}
