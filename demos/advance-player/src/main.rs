use socha::prelude::*;

// ---------------------------------------------------------------------------
// Moves
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Move {
    Advance { distance: u32 },
    FallBack,
}

impl IntoRoomData for Move {
    fn into_room_data(self) -> RoomData {
        match self {
            Move::Advance { distance } => {
                RoomData::new("Advance").with_attr("distance", distance.to_string())
            }
            Move::FallBack => RoomData::new("FallBack"),
        }
    }
}

// ---------------------------------------------------------------------------
// Game logic
// ---------------------------------------------------------------------------

/// Advances one field per turn and falls back every fifth turn.
#[derive(Default)]
struct AdvancePlayer {
    team: Option<String>,
    turn: u32,
    games: u32,
}

impl GameLogic for AdvancePlayer {
    type Move = Move;

    fn on_room_message(&mut self, payload: &RoomPayload) {
        if let RoomPayload::Welcome(welcome) = payload {
            tracing::info!(team = %welcome.team, "playing");
            self.team = Some(welcome.team.clone());
        }
    }

    fn on_update(&mut self, state: &Memento) {
        self.turn = state.turn();
    }

    fn calculate_move(&mut self) -> Option<Move> {
        if self.turn % 5 == 4 {
            Some(Move::FallBack)
        } else {
            Some(Move::Advance { distance: 1 })
        }
    }

    fn on_game_over(&mut self, result: &GameResult) {
        self.games += 1;
        let won = match (&result.winner, &self.team) {
            (Some(winner), Some(team)) => winner.team == *team,
            _ => false,
        };
        tracing::info!(games = self.games, won, "game over");
    }

    fn room_classes() -> Vec<String> {
        vec!["Advance".into(), "FallBack".into()]
    }
}

#[tokio::main]
async fn main() {
    match socha::start(AdvancePlayer::default()).await {
        Ok(termination) => std::process::exit(termination.exit_code()),
        Err(e) => {
            eprintln!("advance-player: {e}");
            std::process::exit(1);
        }
    }
}
