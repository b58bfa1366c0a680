//! Wire protocol for the Software Challenge game server.
//!
//! The server speaks XML over a plain TCP stream that never terminates:
//! the client opens with `<protocol>` and both sides then exchange
//! top-level elements for as long as the connection lives. This crate
//! turns that stream into typed messages and back:
//!
//! - **Framing** ([`FrameExtractor`]): cuts complete top-level elements
//!   out of a growing byte buffer.
//! - **XML tree** ([`Element`]): a small owned element tree, parsed and
//!   rendered with `quick-xml`.
//! - **Types** ([`InboundMessage`], [`OutboundMessage`], [`RoomPayload`],
//!   etc.): the messages themselves.
//! - **Codec** ([`Codec`] trait, [`XmlCodec`]): frame ⇄ message.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → FrameExtractor (frames) → Codec (InboundMessage) → Session
//! ```
//!
//! Nothing here touches a socket or knows about game rules. Game-specific
//! content (the board, the move) stays an [`Element`] for the game plugin
//! to interpret.

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod framing;
mod types;
mod xml;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{Codec, PayloadDecoder, ROOM_DECODERS, XmlCodec};
pub use error::ProtocolError;
pub use framing::FrameExtractor;
pub use types::{
    GameResult, InboundMessage, IntoRoomData, Memento, OutboundMessage,
    RoomData, RoomError, RoomId, RoomPayload, ScoreEntry, ScoreFragment,
    Slot, Welcome, Winner, class,
};
pub use xml::Element;

/// Sent once per connection before any other message.
pub const PROTOCOL_PREAMBLE: &[u8] = b"<protocol>";
