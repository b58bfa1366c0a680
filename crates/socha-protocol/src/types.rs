//! Message types for the Software Challenge wire protocol.
//!
//! Everything the server can send is an [`InboundMessage`]; everything the
//! client can send is an [`OutboundMessage`]. Per-game traffic is wrapped
//! in a `<room>` envelope whose `<data class="...">` child carries a
//! [`RoomPayload`].
//!
//! Each type knows how to render itself as an [`Element`]. Decoding lives
//! in the codec, which owns the `class` → payload table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Element, ProtocolError};

/// Discriminator values of the `class` attribute on `<data>`.
pub mod class {
    pub const MOVE_REQUEST: &str = "moveRequest";
    pub const MEMENTO: &str = "memento";
    pub const RESULT: &str = "result";
    pub const WELCOME: &str = "welcomeMessage";
    pub const ERROR: &str = "error";
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identifier of a server-side game room.
///
/// The server hands these out as opaque strings (usually UUIDs).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Room payloads
// ---------------------------------------------------------------------------

/// A raw `<data class="...">` element.
///
/// Used for everything game-specific: the move the client sends, and any
/// room message whose class is registered on the codec but has no typed
/// representation here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomData(Element);

impl RoomData {
    /// Creates `<data class="{class}"/>`.
    pub fn new(class: impl Into<String>) -> Self {
        Self(Element::new("data").with_attr("class", class))
    }

    /// Wraps an existing element. Its name is forced to `data`.
    pub fn from_element(mut element: Element) -> Self {
        element.name = "data".to_string();
        Self(element)
    }

    /// Builder: appends an attribute after `class`.
    pub fn with_attr(
        self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self(self.0.with_attr(key, value))
    }

    /// Builder: appends a child element.
    pub fn with_child(self, child: Element) -> Self {
        Self(self.0.with_child(child))
    }

    /// The `class` discriminator, or `""` when absent.
    pub fn class(&self) -> &str {
        self.0.attr("class").unwrap_or("")
    }

    pub fn element(&self) -> &Element {
        &self.0
    }

    pub fn into_element(self) -> Element {
        self.0
    }
}

/// Anything the game logic can hand back as a move.
///
/// Game plugins implement this for their move type; the session wraps the
/// result in a `<room>` envelope addressed to the requesting room.
pub trait IntoRoomData {
    fn into_room_data(self) -> RoomData;
}

impl IntoRoomData for RoomData {
    fn into_room_data(self) -> RoomData {
        self
    }
}

/// A game-state snapshot (`class="memento"`).
///
/// The board itself is game-specific and stays an [`Element`]; only the
/// turn counter is validated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memento {
    turn: u32,
    state: Element,
}

impl Memento {
    /// Builds a memento from a `<state>` element.
    ///
    /// # Errors
    /// [`ProtocolError::Decode`] if `turn` is missing or not a number.
    pub fn from_state(state: Element) -> Result<Self, ProtocolError> {
        let turn = state
            .parse_attr::<u32>("turn")?
            .ok_or_else(|| {
                ProtocolError::Decode(format!(
                    "<{}> is missing attribute `turn`",
                    state.name
                ))
            })?;
        Ok(Self { turn, state })
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// The raw `<state>` element for the game plugin to interpret.
    pub fn state(&self) -> &Element {
        &self.state
    }

    pub fn into_state(self) -> Element {
        self.state
    }

    fn to_element(&self) -> Element {
        Element::new("data")
            .with_attr("class", class::MEMENTO)
            .with_child(self.state.clone())
    }
}

/// One component of the scoring definition, e.g. "Siegpunkte" summed up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreFragment {
    pub name: String,
    pub aggregation: Option<String>,
    pub relevant_for_ranking: Option<bool>,
}

/// The scores of one team; `parts` lines up with the definition's
/// fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub team: Option<String>,
    pub name: Option<String>,
    pub parts: Vec<i64>,
}

/// Who won and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub team: String,
    pub regular: Option<bool>,
    pub reason: Option<String>,
}

/// The final outcome of a game (`class="result"`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameResult {
    pub definition: Vec<ScoreFragment>,
    pub scores: Vec<ScoreEntry>,
    /// `None` means the game ended in a draw.
    pub winner: Option<Winner>,
}

impl GameResult {
    fn to_element(&self) -> Element {
        let mut definition = Element::new("definition");
        for fragment in &self.definition {
            let mut el = Element::new("fragment").with_attr("name", &fragment.name);
            if let Some(aggregation) = &fragment.aggregation {
                el = el.with_child(Element::new("aggregation").with_text(aggregation));
            }
            if let Some(relevant) = fragment.relevant_for_ranking {
                el = el.with_child(
                    Element::new("relevantForRanking").with_text(relevant.to_string()),
                );
            }
            definition = definition.with_child(el);
        }

        let mut scores = Element::new("scores");
        for entry in &self.scores {
            let mut player = Element::new("player");
            if let Some(name) = &entry.name {
                player = player.with_attr("name", name);
            }
            if let Some(team) = &entry.team {
                player = player.with_attr("team", team);
            }
            let mut score = Element::new("score");
            for part in &entry.parts {
                score = score.with_child(Element::new("part").with_text(part.to_string()));
            }
            scores = scores.with_child(
                Element::new("entry").with_child(player).with_child(score),
            );
        }

        let mut data = Element::new("data")
            .with_attr("class", class::RESULT)
            .with_child(definition)
            .with_child(scores);
        if let Some(winner) = &self.winner {
            let mut el = Element::new("winner").with_attr("team", &winner.team);
            if let Some(regular) = winner.regular {
                el = el.with_attr("regular", regular.to_string());
            }
            if let Some(reason) = &winner.reason {
                el = el.with_attr("reason", reason);
            }
            data = data.with_child(el);
        }
        data
    }
}

/// Sent once after joining: tells the client which team it plays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Welcome {
    pub team: String,
}

/// A room-level error (`class="error"`), typically an illegal move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomError {
    pub message: String,
    /// The offending message as echoed by the server.
    pub original: Option<Element>,
}

/// The content of a `<room>` envelope, selected by the `class`
/// discriminator on its `<data>` child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomPayload {
    /// The server wants a move from this client.
    MoveRequest,
    /// A new game-state snapshot.
    StateUpdate(Memento),
    /// The game is over.
    Result(GameResult),
    Welcome(Welcome),
    Error(RoomError),
    /// A registered game-specific class, passed through untouched.
    Other(RoomData),
}

impl RoomPayload {
    /// The `class` discriminator this payload is sent with.
    pub fn class(&self) -> &str {
        match self {
            Self::MoveRequest => class::MOVE_REQUEST,
            Self::StateUpdate(_) => class::MEMENTO,
            Self::Result(_) => class::RESULT,
            Self::Welcome(_) => class::WELCOME,
            Self::Error(_) => class::ERROR,
            Self::Other(data) => data.class(),
        }
    }

    /// Renders the `<data>` element.
    pub fn to_element(&self) -> Element {
        match self {
            Self::MoveRequest => {
                Element::new("data").with_attr("class", class::MOVE_REQUEST)
            }
            Self::StateUpdate(memento) => memento.to_element(),
            Self::Result(result) => result.to_element(),
            Self::Welcome(welcome) => Element::new("data")
                .with_attr("class", class::WELCOME)
                .with_attr("color", &welcome.team),
            Self::Error(error) => {
                let mut el = Element::new("data")
                    .with_attr("class", class::ERROR)
                    .with_attr("message", &error.message);
                if let Some(original) = &error.original {
                    el = el.with_child(original.clone());
                }
                el
            }
            Self::Other(data) => data.element().clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Every top-level message the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundMessage {
    /// `<joined roomId="..."/>`: the join request succeeded.
    Joined { room_id: RoomId },
    /// `<left roomId="..."/>`: the server left the room; the connection
    /// is about to close.
    Left { room_id: RoomId },
    /// `<prepared>`: an administrator's `prepare` request created a room.
    Prepared {
        room_id: RoomId,
        reservations: Vec<String>,
    },
    /// `<observed roomId="..."/>`: an administrator now observes a room.
    Observed { room_id: RoomId },
    /// `<errorpacket>`: the server rejected a request and will close the
    /// connection.
    ErrorPacket {
        message: String,
        original: Option<Element>,
    },
    /// `<room roomId="...">`: per-game traffic.
    Room { room_id: RoomId, payload: RoomPayload },
}

impl InboundMessage {
    /// Renders the message as the server would send it.
    pub fn to_element(&self) -> Element {
        match self {
            Self::Joined { room_id } => {
                Element::new("joined").with_attr("roomId", room_id.as_str())
            }
            Self::Left { room_id } => {
                Element::new("left").with_attr("roomId", room_id.as_str())
            }
            Self::Prepared {
                room_id,
                reservations,
            } => reservations.iter().fold(
                Element::new("prepared").with_attr("roomId", room_id.as_str()),
                |el, code| el.with_child(Element::new("reservation").with_text(code)),
            ),
            Self::Observed { room_id } => {
                Element::new("observed").with_attr("roomId", room_id.as_str())
            }
            Self::ErrorPacket { message, original } => {
                let el = Element::new("errorpacket").with_attr("message", message);
                match original {
                    Some(original) => el.with_child(original.clone()),
                    None => el,
                }
            }
            Self::Room { room_id, payload } => Element::new("room")
                .with_attr("roomId", room_id.as_str())
                .with_child(payload.to_element()),
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A player slot in an administrator's `prepare` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub display_name: String,
    pub can_timeout: bool,
    pub reserved: bool,
}

/// Every message the client can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboundMessage {
    /// Join any open room, or have the server create one.
    Join,
    JoinRoom { room_id: RoomId },
    /// Join a prepared room with a reservation code.
    JoinPrepared { reservation: String },
    /// Authenticate as administrator. Not answered on success.
    Authenticate { password: String },
    Prepare {
        game_type: String,
        pause: bool,
        slots: Vec<Slot>,
    },
    Observe { room_id: RoomId },
    Pause { room_id: RoomId, pause: bool },
    /// Advance a paused game by one move.
    Step { room_id: RoomId },
    Cancel { room_id: RoomId },
    /// A move or other room message, addressed to `room_id`.
    RoomEnvelope { room_id: RoomId, payload: RoomData },
    /// Sent right before the client closes the connection.
    Close,
}

impl OutboundMessage {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::JoinRoom { .. } => "joinRoom",
            Self::JoinPrepared { .. } => "joinPrepared",
            Self::Authenticate { .. } => "authenticate",
            Self::Prepare { .. } => "prepare",
            Self::Observe { .. } => "observe",
            Self::Pause { .. } => "pause",
            Self::Step { .. } => "step",
            Self::Cancel { .. } => "cancel",
            Self::RoomEnvelope { .. } => "room",
            Self::Close => "close",
        }
    }

    /// Renders the message as an element.
    pub fn to_element(&self) -> Element {
        match self {
            Self::Join => Element::new("join"),
            Self::JoinRoom { room_id } => {
                Element::new("joinRoom").with_attr("roomId", room_id.as_str())
            }
            Self::JoinPrepared { reservation } => {
                Element::new("joinPrepared").with_attr("reservationCode", reservation)
            }
            Self::Authenticate { password } => {
                Element::new("authenticate").with_attr("password", password)
            }
            Self::Prepare {
                game_type,
                pause,
                slots,
            } => slots.iter().fold(
                Element::new("prepare")
                    .with_attr("gameType", game_type)
                    .with_attr("pause", pause.to_string()),
                |el, slot| {
                    el.with_child(
                        Element::new("slot")
                            .with_attr("displayName", &slot.display_name)
                            .with_attr("canTimeout", slot.can_timeout.to_string())
                            .with_attr("reserved", slot.reserved.to_string()),
                    )
                },
            ),
            Self::Observe { room_id } => {
                Element::new("observe").with_attr("roomId", room_id.as_str())
            }
            Self::Pause { room_id, pause } => Element::new("pause")
                .with_attr("roomId", room_id.as_str())
                .with_attr("pause", pause.to_string()),
            Self::Step { room_id } => {
                Element::new("step").with_attr("roomId", room_id.as_str())
            }
            Self::Cancel { room_id } => {
                Element::new("cancel").with_attr("roomId", room_id.as_str())
            }
            Self::RoomEnvelope { room_id, payload } => Element::new("room")
                .with_attr("roomId", room_id.as_str())
                .with_child(payload.element().clone()),
            Self::Close => Element::new("close"),
        }
    }
}
