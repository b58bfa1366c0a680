//! Integration tests for the facade: parsed arguments through to a real
//! TCP session.

use clap::Parser;
use socha::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Default)]
struct Quiet {
    joined: Vec<String>,
}

impl GameLogic for Quiet {
    type Move = RoomData;

    fn calculate_move(&mut self) -> Option<RoomData> {
        None
    }

    fn on_game_joined(&mut self, room_id: &RoomId) {
        self.joined.push(room_id.to_string());
    }
}

#[tokio::test]
async fn test_run_with_parsed_args() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
    let port = listener.local_addr().expect("local addr").port();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("should accept");
        let mut seen = String::new();
        let mut buf = [0u8; 256];
        while !seen.contains(r#"roomId="r1"/>"#) {
            let n = socket.read(&mut buf).await.expect("server read");
            assert!(n > 0, "client closed early");
            seen.push_str(&String::from_utf8_lossy(&buf[..n]));
        }
        socket
            .write_all(br#"<protocol><joined roomId="r1"/><left roomId="r1"/>"#)
            .await
            .expect("server write");
        seen
    });

    let port = port.to_string();
    let args = StartArgs::try_parse_from(["socha", "-h", "127.0.0.1", "-p", &port, "--room", "r1"])
        .expect("arguments should parse");
    let termination = socha::run(&args, Quiet::default())
        .await
        .expect("run should succeed");

    assert_eq!(termination, Termination::Left);
    assert_eq!(termination.exit_code(), 0);
    assert_eq!(
        server.await.expect("server task"),
        r#"<protocol><joinRoom roomId="r1"/>"#
    );
}

#[tokio::test]
async fn test_connect_failure_surfaces_as_facade_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
    let port = listener.local_addr().expect("local addr").port().to_string();
    drop(listener);

    let args = StartArgs::try_parse_from(["socha", "-h", "127.0.0.1", "-p", &port])
        .expect("arguments should parse");
    let err = socha::run(&args, Quiet::default()).await.unwrap_err();
    assert!(matches!(err, SochaError::Client(_)), "got {err:?}");
}
