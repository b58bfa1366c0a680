//! TCP transport implementation using `tokio::net::TcpStream`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::{Connection, ConnectionId, Connector, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Size of a single read from the socket.
const READ_CHUNK: usize = 16 * 1024;

/// A [`Connector`] that opens plain TCP connections to `host:port`.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
}

impl TcpConnector {
    /// Creates a connector for the given server address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the `host:port` string this connector dials.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Connector for TcpConnector {
    type Connection = TcpConnection;

    async fn connect(&mut self) -> Result<TcpConnection, TransportError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|source| TransportError::Connect {
                addr: self.addr(),
                source,
            })?;
        // Frames are small and latency matters more than throughput.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "could not set TCP_NODELAY");
        }

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::info!(%id, addr = %self.addr(), "connected to server");

        Ok(TcpConnection {
            id,
            stream: Some(stream),
        })
    }
}

/// A single TCP connection to the game server.
///
/// `stream` is `None` once the connection has been closed, by us or by
/// the peer.
pub struct TcpConnection {
    id: ConnectionId,
    stream: Option<TcpStream>,
}

/// What a single timed read produced.
enum ReadOutcome {
    Data(Vec<u8>),
    TimedOut,
    Closed,
    Failed(std::io::Error),
}

impl Connection for TcpConnection {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let result = match stream.write_all(data).await {
            Ok(()) => stream.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(id = %self.id, error = %e, "write failed, closing");
            self.close().await;
            return Err(TransportError::Write(e));
        }
        Ok(())
    }

    async fn receive_timeout(&mut self, timeout: Duration) -> Vec<u8> {
        let Some(stream) = self.stream.as_mut() else {
            return Vec::new();
        };

        let mut buf = vec![0u8; READ_CHUNK];
        let outcome = match tokio::time::timeout(timeout, stream.read(&mut buf)).await {
            Err(_) => ReadOutcome::TimedOut,
            Ok(Ok(0)) => ReadOutcome::Closed,
            Ok(Ok(n)) => {
                buf.truncate(n);
                ReadOutcome::Data(buf)
            }
            Ok(Err(e)) => ReadOutcome::Failed(e),
        };

        match outcome {
            ReadOutcome::Data(data) => {
                tracing::trace!(id = %self.id, bytes = data.len(), "received chunk");
                data
            }
            ReadOutcome::TimedOut => Vec::new(),
            ReadOutcome::Closed => {
                tracing::info!(id = %self.id, "server closed the connection");
                self.close().await;
                Vec::new()
            }
            ReadOutcome::Failed(e) => {
                tracing::warn!(id = %self.id, error = %e, "connection reset");
                self.close().await;
                Vec::new()
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::debug!(id = %self.id, error = %e, "shutdown failed");
            }
            tracing::info!(id = %self.id, "closed connection");
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
