//! The `GameLogic` trait: the extension point for players.
//!
//! A player implements [`GameLogic`] and hands it to a
//! [`SessionClient`](crate::SessionClient). The session owns the socket
//! and the protocol; the logic only answers move requests and reacts to
//! what the server tells it.
//!
//! Only [`calculate_move`](GameLogic::calculate_move) is required. A
//! client that never answers is disqualified by the server, so there is
//! no sensible default for it. Everything else defaults to a no-op.

use socha_protocol::{GameResult, IntoRoomData, Memento, RoomId, RoomPayload};

use crate::{ClientContext, WaitSignal};

/// The decision-making side of a game client.
///
/// Callbacks run one at a time on the session loop (or, for
/// [`while_waiting`](Self::while_waiting), on a blocking worker while the
/// loop is idle), so `&mut self` is never shared.
///
/// `Send + 'static` because the logic is moved into the blocking worker
/// between messages.
pub trait GameLogic: Send + 'static {
    /// The move type. Rendered into the `<data>` element of the reply.
    type Move: IntoRoomData;

    /// Picks the next move. Called once per move request.
    ///
    /// May block for as long as it likes; the server enforces its own
    /// time limit. Returning `None` sends nothing, and the server will
    /// eventually time the turn out.
    fn calculate_move(&mut self) -> Option<Self::Move>;

    /// A new game state arrived. It is already recorded in the history.
    fn on_update(&mut self, _state: &Memento) {}

    /// The game ended.
    fn on_game_over(&mut self, _result: &GameResult) {}

    /// The server rejected a request and is about to close the
    /// connection.
    fn on_error(&mut self, _message: &str) {}

    /// Any room message that is not a move request, state, or result:
    /// welcome messages, room errors, registered game classes, and in
    /// headless mode every room message.
    fn on_room_message(&mut self, _payload: &RoomPayload) {}

    /// The join request succeeded.
    fn on_game_joined(&mut self, _room_id: &RoomId) {}

    /// The server left the room, or the connection dropped.
    fn on_game_left(&mut self) {}

    /// An administrator session just authenticated. Use `ctx` to prepare
    /// games.
    fn on_create_game(&mut self, _ctx: &mut ClientContext<'_>) {}

    /// A `prepare` request succeeded.
    fn on_game_prepared(
        &mut self,
        _ctx: &mut ClientContext<'_>,
        _room_id: &RoomId,
        _reservations: &[String],
    ) {
    }

    /// An `observe` request succeeded.
    fn on_game_observed(&mut self, _ctx: &mut ClientContext<'_>, _room_id: &RoomId) {}

    /// Called repeatedly in survive mode after the server has left.
    /// Call [`ClientContext::reconnect`] to join again or
    /// [`ClientContext::stop`] to end the session.
    fn while_disconnected(&mut self, _ctx: &mut ClientContext<'_>) {}

    /// Called after every dispatched message while the session waits for
    /// the next one. Check `signal` and return once it is cancelled.
    fn while_waiting(&mut self, _signal: &WaitSignal) {}

    /// Game-specific `<data class>` values the codec should accept, e.g.
    /// the move classes the server echoes back.
    ///
    /// Default: none.
    fn room_classes() -> Vec<String>
    where
        Self: Sized,
    {
        Vec::new()
    }
}
