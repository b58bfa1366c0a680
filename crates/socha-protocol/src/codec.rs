//! Codec trait and the XML implementation.
//!
//! A codec turns one *frame* (a single complete top-level element, as cut
//! out by [`FrameExtractor`](crate::FrameExtractor)) into an
//! [`InboundMessage`], and an [`OutboundMessage`] into bytes.
//!
//! The session only talks to the [`Codec`] trait, so tests can swap in a
//! codec that never touches XML at all.
//!
//! # Room payload dispatch
//!
//! A `<room>` envelope's `<data>` child is dispatched on its `class`
//! attribute through a fixed table ([`ROOM_DECODERS`]). Game plugins add
//! their own classes with [`XmlCodec::with_room_classes`]; those decode to
//! [`RoomPayload::Other`] with the raw element attached. Any other class
//! is rejected with [`ProtocolError::UnknownDiscriminator`], so a typo in
//! a plugin shows up as a logged error instead of a silently ignored
//! message.

use std::collections::BTreeSet;

use crate::types::class;
use crate::{
    Element, GameResult, InboundMessage, Memento, OutboundMessage,
    ProtocolError, RoomData, RoomError, RoomId, RoomPayload, ScoreEntry,
    ScoreFragment, Welcome, Winner,
};

/// Converts frames to messages and messages to bytes.
///
/// `Send + Sync + 'static` so the session can keep it for the lifetime of
/// the connection and hand references to other tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes an outbound message. Encoding a well-typed message
    /// cannot fail.
    fn encode(&self, message: &OutboundMessage) -> Vec<u8>;

    /// Deserializes exactly one frame.
    ///
    /// # Errors
    /// - [`ProtocolError::Decode`]: malformed XML, missing or malformed
    ///   attributes.
    /// - [`ProtocolError::UnknownMessage`]: an unrecognized top-level tag.
    /// - [`ProtocolError::UnknownDiscriminator`]: an unrecognized
    ///   `<data class>`.
    fn decode(&self, frame: &[u8]) -> Result<InboundMessage, ProtocolError>;
}

// ---------------------------------------------------------------------------
// Decode table
// ---------------------------------------------------------------------------

/// Decodes a `<data>` element into a typed payload.
pub type PayloadDecoder = fn(&Element) -> Result<RoomPayload, ProtocolError>;

/// Built-in `class` discriminators and their decoders.
pub const ROOM_DECODERS: &[(&str, PayloadDecoder)] = &[
    (class::MOVE_REQUEST, decode_move_request),
    (class::MEMENTO, decode_memento),
    (class::RESULT, decode_result),
    (class::WELCOME, decode_welcome),
    (class::ERROR, decode_room_error),
];

fn decode_move_request(_: &Element) -> Result<RoomPayload, ProtocolError> {
    Ok(RoomPayload::MoveRequest)
}

fn decode_memento(data: &Element) -> Result<RoomPayload, ProtocolError> {
    let state = data.child("state").ok_or_else(|| {
        ProtocolError::Decode("memento without <state>".into())
    })?;
    Ok(RoomPayload::StateUpdate(Memento::from_state(state.clone())?))
}

fn decode_result(data: &Element) -> Result<RoomPayload, ProtocolError> {
    let definition = data
        .child("definition")
        .map(|def| {
            def.children_named("fragment")
                .map(|fragment| {
                    Ok::<_, ProtocolError>(ScoreFragment {
                        name: fragment.required_attr("name")?.to_string(),
                        aggregation: fragment
                            .child("aggregation")
                            .map(|a| a.text().trim().to_string()),
                        relevant_for_ranking: fragment
                            .child("relevantForRanking")
                            .map(Element::parse_text::<bool>)
                            .transpose()?,
                    })
                })
                .collect::<Result<Vec<_>, ProtocolError>>()
        })
        .transpose()?
        .unwrap_or_default();

    let scores = data
        .child("scores")
        .map(|scores| {
            scores
                .children_named("entry")
                .map(|entry| {
                    let player = entry.child("player");
                    let parts = entry
                        .child("score")
                        .map(|score| {
                            score
                                .children_named("part")
                                .map(Element::parse_text::<i64>)
                                .collect::<Result<Vec<_>, _>>()
                        })
                        .transpose()?
                        .unwrap_or_default();
                    Ok::<_, ProtocolError>(ScoreEntry {
                        team: player
                            .and_then(|p| p.attr("team"))
                            .map(str::to_string),
                        name: player
                            .and_then(|p| p.attr("name"))
                            .map(str::to_string),
                        parts,
                    })
                })
                .collect::<Result<Vec<_>, ProtocolError>>()
        })
        .transpose()?
        .unwrap_or_default();

    let winner = data
        .child("winner")
        .map(|w| {
            Ok::<_, ProtocolError>(Winner {
                team: w.required_attr("team")?.to_string(),
                regular: w.parse_attr("regular")?,
                reason: w.attr("reason").map(str::to_string),
            })
        })
        .transpose()?;

    Ok(RoomPayload::Result(GameResult {
        definition,
        scores,
        winner,
    }))
}

fn decode_welcome(data: &Element) -> Result<RoomPayload, ProtocolError> {
    // Servers have used both spellings over the seasons.
    let team = data
        .attr("color")
        .or_else(|| data.attr("name"))
        .ok_or_else(|| {
            ProtocolError::Decode("welcomeMessage without a team".into())
        })?;
    Ok(RoomPayload::Welcome(Welcome {
        team: team.to_string(),
    }))
}

fn decode_room_error(data: &Element) -> Result<RoomPayload, ProtocolError> {
    Ok(RoomPayload::Error(RoomError {
        message: data.attr("message").unwrap_or_default().to_string(),
        original: data.children.first().cloned(),
    }))
}

// ---------------------------------------------------------------------------
// XmlCodec
// ---------------------------------------------------------------------------

/// The codec the Software Challenge server speaks.
///
/// ## Example
///
/// ```rust
/// use socha_protocol::{Codec, InboundMessage, RoomPayload, XmlCodec};
///
/// let codec = XmlCodec::new().with_room_classes(["Advance"]);
///
/// let msg = codec
///     .decode(br#"<room roomId="r1"><data class="moveRequest"/></room>"#)
///     .unwrap();
/// assert!(matches!(
///     msg,
///     InboundMessage::Room { payload: RoomPayload::MoveRequest, .. }
/// ));
///
/// let game_msg = codec
///     .decode(br#"<room roomId="r1"><data class="Advance" distance="2"/></room>"#)
///     .unwrap();
/// assert!(matches!(
///     game_msg,
///     InboundMessage::Room { payload: RoomPayload::Other(_), .. }
/// ));
/// ```
#[derive(Debug, Clone, Default)]
pub struct XmlCodec {
    room_classes: BTreeSet<String>,
    raw_rooms: bool,
}

impl XmlCodec {
    /// A codec that only knows the built-in room classes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers game-specific `<data class>` values that should be passed
    /// through as [`RoomPayload::Other`].
    pub fn with_room_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.room_classes.extend(classes.into_iter().map(Into::into));
        self
    }

    /// Skips the class table: every `<data>` element decodes to
    /// [`RoomPayload::Other`], whatever its class. Used when no game
    /// plugin is loaded.
    pub fn with_raw_room_payloads(mut self) -> Self {
        self.raw_rooms = true;
        self
    }

    /// Returns `true` if `class` decodes to something other than
    /// [`ProtocolError::UnknownDiscriminator`].
    pub fn knows_class(&self, class: &str) -> bool {
        ROOM_DECODERS.iter().any(|(name, _)| *name == class)
            || self.room_classes.contains(class)
    }

    /// Decodes an already parsed top-level element.
    pub fn decode_element(
        &self,
        element: &Element,
    ) -> Result<InboundMessage, ProtocolError> {
        let room_id = || -> Result<RoomId, ProtocolError> {
            Ok(RoomId::from(element.required_attr("roomId")?))
        };

        match element.name.as_str() {
            "joined" => Ok(InboundMessage::Joined { room_id: room_id()? }),
            "left" => Ok(InboundMessage::Left { room_id: room_id()? }),
            "observed" => Ok(InboundMessage::Observed { room_id: room_id()? }),
            "prepared" => Ok(InboundMessage::Prepared {
                room_id: room_id()?,
                reservations: element
                    .children_named("reservation")
                    .map(|r| r.text().trim().to_string())
                    .collect(),
            }),
            "errorpacket" => Ok(InboundMessage::ErrorPacket {
                message: element.attr("message").unwrap_or_default().to_string(),
                original: element.children.first().cloned(),
            }),
            "room" => {
                let data = element.child("data").ok_or_else(|| {
                    ProtocolError::Decode("<room> without <data>".into())
                })?;
                Ok(InboundMessage::Room {
                    room_id: room_id()?,
                    payload: self.decode_payload(data)?,
                })
            }
            other => Err(ProtocolError::UnknownMessage(other.to_string())),
        }
    }

    /// Decodes a `<data>` element through the class table.
    pub fn decode_payload(
        &self,
        data: &Element,
    ) -> Result<RoomPayload, ProtocolError> {
        if self.raw_rooms {
            return Ok(RoomPayload::Other(RoomData::from_element(data.clone())));
        }
        let class = data.required_attr("class")?;

        if let Some((_, decode)) =
            ROOM_DECODERS.iter().find(|(name, _)| *name == class)
        {
            return decode(data);
        }
        if self.room_classes.contains(class) {
            return Ok(RoomPayload::Other(RoomData::from_element(data.clone())));
        }
        Err(ProtocolError::UnknownDiscriminator(class.to_string()))
    }
}

impl Codec for XmlCodec {
    fn encode(&self, message: &OutboundMessage) -> Vec<u8> {
        message.to_element().to_xml().into_bytes()
    }

    fn decode(&self, frame: &[u8]) -> Result<InboundMessage, ProtocolError> {
        let element = Element::parse(frame)?;
        self.decode_element(&element)
    }
}
