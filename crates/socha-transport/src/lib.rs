//! Transport layer for the Software Challenge game client.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over
//! how the client reaches the game server, and the TCP implementation
//! ([`TcpConnector`], [`TcpConnection`]) used in production.
//!
//! The game server speaks a line-oriented XML stream over plain TCP. This
//! crate knows nothing about XML: it moves raw bytes and reports whether
//! the connection is still alive. Framing happens one layer up, in
//! `socha-protocol`.
//!
//! ```text
//! Transport (bytes) → Protocol (frames, messages) → Client (session)
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{TcpConnection, TcpConnector};

use std::fmt;
use std::time::Duration;

/// Opaque identifier for a connection, used to tell reconnects apart in
/// logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Opens connections to the game server.
///
/// The session client keeps one connector for its whole lifetime and asks
/// it for a fresh [`Connection`] on start and on every reconnect attempt.
pub trait Connector: 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Opens a new connection.
    ///
    /// # Errors
    /// Returns [`TransportError::Connect`] if the server refused the
    /// connection or could not be reached.
    async fn connect(&mut self) -> Result<Self::Connection, TransportError>;
}

/// A single, exclusively owned connection to the game server.
///
/// Methods take `&mut self`: exactly one reader and one writer (the
/// session loop) ever touch a connection.
pub trait Connection: 'static {
    /// Writes all of `data` to the server.
    ///
    /// # Errors
    /// [`TransportError::NotConnected`] if the connection was closed,
    /// [`TransportError::Write`] if the write itself failed.
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Returns whatever bytes arrive within `timeout`.
    ///
    /// An empty vector means "nothing yet" and is not an error. When the
    /// peer resets or closes the stream the connection closes itself and
    /// every later call returns empty immediately.
    async fn receive_timeout(&mut self, timeout: Duration) -> Vec<u8>;

    /// Closes the connection. Calling it again is a no-op.
    async fn close(&mut self);

    /// Returns `true` until the connection is closed by either side.
    fn is_connected(&self) -> bool;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
