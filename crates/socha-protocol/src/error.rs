//! Error types for the protocol layer.
//!
//! Framing has no error condition (an incomplete frame is simply not
//! returned yet), so everything here comes from turning a frame into a
//! typed message. The session loop logs these and drops the frame.

/// Errors that can occur while decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The frame is not well-formed XML, or a value has the wrong shape
    /// (a missing attribute, text where a number was expected).
    #[error("decode failed: {0}")]
    Decode(String),

    /// A `<data class="...">` payload carries a class the decode table
    /// does not know.
    #[error("unknown data class `{0}`")]
    UnknownDiscriminator(String),

    /// The frame's top-level element is not a message the client
    /// understands.
    #[error("unknown message <{0}>")]
    UnknownMessage(String),
}
