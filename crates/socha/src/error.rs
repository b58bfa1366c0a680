//! Unified error type for the socha client SDK.

use socha_client::ClientError;
use socha_protocol::ProtocolError;
use socha_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `socha` facade you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SochaError {
    /// Connecting or writing to the game server failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session ended abnormally.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The log filter or log file could not be set up.
    #[error("logging setup failed: {0}")]
    Logging(String),
}
