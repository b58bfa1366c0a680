//! Client configuration.
//!
//! Everything the session needs to know before it opens a socket: where
//! the server is, how to join, and what to do when the server leaves.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use socha_protocol::{OutboundMessage, RoomId};

// ---------------------------------------------------------------------------
// JoinStrategy
// ---------------------------------------------------------------------------

/// How the client introduces itself after connecting.
///
/// Exactly one join frame is sent per connection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStrategy {
    /// Join a prepared room with a reservation code (tournament play).
    Reservation(String),
    /// Join a specific existing room.
    Room(RoomId),
    /// Authenticate as administrator to prepare and observe games.
    Admin { password: String },
    /// Join any open room, or let the server open one.
    #[default]
    Any,
}

impl JoinStrategy {
    /// Picks a strategy from the optional command-line values.
    ///
    /// First match wins: reservation, then room, then password. Every
    /// option that loses is logged as ignored.
    pub fn resolve(
        reservation: Option<String>,
        room: Option<String>,
        password: Option<String>,
    ) -> Self {
        let mut chosen: Option<JoinStrategy> = None;

        for (option, candidate) in [
            ("reservation", reservation.map(JoinStrategy::Reservation)),
            ("room", room.map(|id| JoinStrategy::Room(RoomId::from(id)))),
            (
                "password",
                password.map(|password| JoinStrategy::Admin { password }),
            ),
        ] {
            let Some(candidate) = candidate else {
                continue;
            };
            match &chosen {
                None => chosen = Some(candidate),
                Some(winner) => tracing::warn!(
                    ignored = option,
                    using = winner.kind(),
                    "conflicting join options, ignoring one"
                ),
            }
        }

        chosen.unwrap_or_default()
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reservation(_) => "reservation",
            Self::Room(_) => "room",
            Self::Admin { .. } => "admin",
            Self::Any => "any",
        }
    }

    /// The join frame this strategy sends.
    pub fn message(&self) -> OutboundMessage {
        match self {
            Self::Reservation(code) => OutboundMessage::JoinPrepared {
                reservation: code.clone(),
            },
            Self::Room(room_id) => OutboundMessage::JoinRoom {
                room_id: room_id.clone(),
            },
            Self::Admin { password } => OutboundMessage::Authenticate {
                password: password.clone(),
            },
            Self::Any => OutboundMessage::Join,
        }
    }
}

// ---------------------------------------------------------------------------
// ReconnectPolicy
// ---------------------------------------------------------------------------

/// Bounded retry policy used after the server leaves with
/// `auto_reconnect` enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Number of connect attempts before giving up.
    pub attempts: u32,
    /// Pause between two attempts. There is no pause before the first.
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Connection and lifecycle settings for a [`SessionClient`](crate::SessionClient).
///
/// Start from `ClientConfig::default()` and override what you need:
///
/// ```rust
/// use socha_client::{ClientConfig, JoinStrategy};
///
/// let config = ClientConfig {
///     join: JoinStrategy::Reservation("abc123".into()),
///     auto_reconnect: true,
///     ..ClientConfig::default()
/// };
/// assert_eq!(config.port, 13050);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub join: JoinStrategy,
    /// Keep running after the server leaves, calling `while_disconnected`
    /// until shut down.
    pub survive: bool,
    /// Reconnect and re-join after the server leaves. Ignored when
    /// `survive` is set.
    pub auto_reconnect: bool,
    /// Deliver every room message raw to `on_room_message`, without
    /// moves, history, or typed payloads.
    pub headless: bool,
    /// How long one receive waits before the loop re-checks shutdown and
    /// connection state.
    pub receive_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 13050,
            join: JoinStrategy::Any,
            survive: false,
            auto_reconnect: false,
            headless: false,
            receive_timeout: Duration::from_millis(100),
            reconnect: ReconnectPolicy::default(),
        }
    }
}
