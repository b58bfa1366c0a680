//! Per-session game history.
//!
//! One entry per game joined in this process, each an append-only list of
//! the updates the server sent for that game. The history belongs to the
//! [`SessionClient`](crate::SessionClient) that recorded it; game logic
//! reads it through [`ClientContext::history`](crate::ClientContext::history).

use serde::Serialize;
use socha_protocol::{GameResult, Memento};

/// One recorded server update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Update {
    /// A game-state snapshot.
    State(Memento),
    /// The final result; normally the last update of a game.
    Result(GameResult),
    /// A server-reported error for this game.
    Error(String),
}

/// Games played by one session, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct History {
    games: Vec<Vec<Update>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new, empty game entry. Called once per join.
    pub fn open_game(&mut self) {
        self.games.push(Vec::new());
    }

    /// Appends to the current game, opening one if none exists yet.
    pub fn push(&mut self, update: Update) {
        if self.games.is_empty() {
            self.open_game();
        }
        if let Some(game) = self.games.last_mut() {
            game.push(update);
        }
    }

    /// All games, oldest first.
    pub fn games(&self) -> &[Vec<Update>] {
        &self.games
    }

    /// Updates of the game currently being played.
    pub fn current(&self) -> Option<&[Update]> {
        self.games.last().map(Vec::as_slice)
    }

    /// The most recent game-state snapshot of the current game.
    pub fn last_state(&self) -> Option<&Memento> {
        self.current()?.iter().rev().find_map(|update| match update {
            Update::State(memento) => Some(memento),
            _ => None,
        })
    }

    /// The result of the current game, if it has ended.
    pub fn result(&self) -> Option<&GameResult> {
        self.current()?.iter().rev().find_map(|update| match update {
            Update::Result(result) => Some(result),
            _ => None,
        })
    }

    /// Number of games recorded.
    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}
