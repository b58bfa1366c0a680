//! Error types for the session layer.

use socha_protocol::ProtocolError;
use socha_transport::TransportError;

/// Errors that end [`SessionClient::run`](crate::SessionClient::run)
/// abnormally.
///
/// Most trouble during a game is *not* an error here: undecodable frames
/// are logged and dropped, a server `errorpacket` ends the run with
/// [`Termination::ServerError`](crate::Termination::ServerError). What
/// remains are failures the client cannot work around.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The first connection could not be opened, or the join request
    /// could not be written.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Decoding failed. The session loop itself drops undecodable frames;
    /// this lets callers that drive the codec directly share one error
    /// type.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Every reconnect attempt failed.
    #[error("gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: ClientError = TransportError::NotConnected.into();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(err.to_string(), TransportError::NotConnected.to_string());
    }

    #[test]
    fn test_from_protocol_error() {
        let err: ClientError =
            ProtocolError::UnknownDiscriminator("bogus".into()).into();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_reconnect_exhausted_message() {
        let err = ClientError::ReconnectExhausted { attempts: 3 };
        assert_eq!(err.to_string(), "gave up reconnecting after 3 attempts");
    }
}
