//! The handle game logic uses to talk back to the session.
//!
//! Callbacks that may want to act (administrator callbacks,
//! `while_disconnected`) receive a [`ClientContext`]. Requests are queued
//! and carried out by the session once the callback returns, so logic
//! never touches the socket directly.

use socha_protocol::{OutboundMessage, RoomId, Slot};

use crate::History;

/// A request queued by game logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Send(OutboundMessage),
    Stop,
    Reconnect,
}

/// Command outbox and read-only view of the session, valid for one
/// callback.
#[derive(Debug)]
pub struct ClientContext<'a> {
    history: &'a History,
    commands: Vec<Command>,
}

impl<'a> ClientContext<'a> {
    pub(crate) fn new(history: &'a History) -> Self {
        Self {
            history,
            commands: Vec::new(),
        }
    }

    /// Games recorded by this session so far.
    pub fn history(&self) -> &History {
        self.history
    }

    /// Asks the server to prepare a game. Requires an administrator
    /// session.
    pub fn prepare(
        &mut self,
        game_type: impl Into<String>,
        pause: bool,
        slots: Vec<Slot>,
    ) {
        self.send(OutboundMessage::Prepare {
            game_type: game_type.into(),
            pause,
            slots,
        });
    }

    pub fn observe(&mut self, room_id: RoomId) {
        self.send(OutboundMessage::Observe { room_id });
    }

    pub fn pause(&mut self, room_id: RoomId, pause: bool) {
        self.send(OutboundMessage::Pause { room_id, pause });
    }

    /// Lets a paused game advance by one move.
    pub fn step(&mut self, room_id: RoomId) {
        self.send(OutboundMessage::Step { room_id });
    }

    pub fn cancel(&mut self, room_id: RoomId) {
        self.send(OutboundMessage::Cancel { room_id });
    }

    /// Queues an arbitrary message.
    pub fn send(&mut self, message: OutboundMessage) {
        self.commands.push(Command::Send(message));
    }

    /// Ends the session: the client sends `<close/>` and stops.
    pub fn stop(&mut self) {
        self.commands.push(Command::Stop);
    }

    /// Reconnects and re-joins with the configured strategy. Only honoured
    /// from `while_disconnected`.
    pub fn reconnect(&mut self) {
        self.commands.push(Command::Reconnect);
    }

    pub(crate) fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}
