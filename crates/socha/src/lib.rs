//! # Socha
//!
//! Client SDK for Software Challenge game servers.
//!
//! A player implements a single [`GameLogic`] trait; the SDK handles the
//! TCP connection, the XML protocol, joining a game, and the session
//! lifecycle (leave, survive, reconnect).
//!
//! ```text
//!   start()
//!     │  StartArgs ──▶ ClientConfig
//!     ▼
//!   SessionClient ──▶ XmlCodec ──▶ TcpConnection ──▶ game server
//!     │
//!     ▼
//!   GameLogic callbacks (calculate_move, on_update, on_game_over, …)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use socha::prelude::*;
//!
//! struct Player {
//!     turn: u32,
//! }
//!
//! impl GameLogic for Player {
//!     type Move = RoomData;
//!
//!     fn on_update(&mut self, state: &Memento) {
//!         self.turn = state.turn();
//!     }
//!
//!     fn calculate_move(&mut self) -> Option<RoomData> {
//!         Some(RoomData::new("FallBack"))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SochaError> {
//!     let termination = socha::start(Player { turn: 0 }).await?;
//!     std::process::exit(termination.exit_code());
//! }
//! ```

mod error;
pub mod starter;

pub use error::SochaError;
pub use starter::{StartArgs, init_logging, run, start};

pub use socha_client as client;
pub use socha_protocol as protocol;
pub use socha_transport as transport;

/// Everything a player implementation usually needs.
pub mod prelude {
    pub use crate::SochaError;
    pub use crate::starter::{StartArgs, start};
    pub use socha_client::{
        ClientConfig, ClientContext, GameLogic, History, JoinStrategy, SessionClient,
        ShutdownHandle, Termination, Update, WaitSignal,
    };
    pub use socha_protocol::{
        Element, GameResult, IntoRoomData, Memento, RoomData, RoomId, RoomPayload, Slot,
    };
}
