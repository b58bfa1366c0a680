//! Session client for the Software Challenge game server.
//!
//! This crate runs one player's side of a game:
//!
//! 1. **Connect and join** with the configured [`JoinStrategy`]
//! 2. **Dispatch** every server message to your [`GameLogic`]
//! 3. **Answer move requests** with the move your logic calculates
//! 4. **Handle the end**: stop, survive, or reconnect ([`ClientConfig`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Your GameLogic (above)  ← callbacks, one at a time
//!     ↕
//! Client Layer (this crate)  ← state machine, history, reconnects
//!     ↕
//! Protocol Layer (below)  ← frames, InboundMessage / OutboundMessage
//!     ↕
//! Transport Layer  ← TCP bytes
//! ```

mod client;
mod config;
mod context;
mod error;
mod history;
mod logic;
mod waiting;

pub use client::{ClientState, SessionClient, ShutdownHandle, Termination};
pub use config::{ClientConfig, JoinStrategy, ReconnectPolicy};
pub use context::ClientContext;
pub use error::ClientError;
pub use history::{History, Update};
pub use logic::GameLogic;
pub use waiting::WaitSignal;
