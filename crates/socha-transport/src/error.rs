/// Errors that can occur in the transport layer.
///
/// Reading never produces an error: a receive timeout yields an empty
/// chunk and a reset peer closes the connection (observable through
/// [`Connection::is_connected`](crate::Connection::is_connected)).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening the TCP connection failed (refused, unreachable, bad host).
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing to the connection failed.
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    /// The connection is closed; nothing can be written to it.
    #[error("not connected")]
    NotConnected,
}
