//! Shared helpers for session tests.
//!
//! - [`ScriptedConnector`]: an in-memory connector whose connections
//!   replay a fixed list of server frames and record everything the client
//!   writes.
//! - [`Recorder`]: a game logic that logs every callback as a short
//!   string, so tests can assert on the order of events.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use socha_client::{ClientContext, GameLogic, WaitSignal};
use socha_protocol::{GameResult, Memento, RoomData, RoomId, RoomPayload, Slot};
use socha_transport::{Connection, ConnectionId, Connector, TransportError};

// ---------------------------------------------------------------------------
// Scripted transport
// ---------------------------------------------------------------------------

/// One thing the scripted server does when the client receives.
pub enum Step {
    /// Deliver these bytes.
    Bytes(Vec<u8>),
    /// Drop the connection from the server side.
    Drop,
    /// Stay quiet for this long, then deliver nothing.
    Pause(Duration),
}

pub fn frame(xml: &str) -> Step {
    Step::Bytes(xml.as_bytes().to_vec())
}

/// Everything observed on the wire, across all connections.
#[derive(Debug, Default)]
pub struct Wire {
    pub connect_attempts: u32,
    pub connections: u32,
    pub closes: u32,
    /// `(connection number, bytes)` for every send, in order.
    pub sent: Vec<(u32, String)>,
}

impl Wire {
    pub fn sent_on(&self, connection: u32) -> Vec<&str> {
        self.sent
            .iter()
            .filter(|(n, _)| *n == connection)
            .map(|(_, s)| s.as_str())
            .collect()
    }

    pub fn all_sent(&self) -> Vec<&str> {
        self.sent.iter().map(|(_, s)| s.as_str()).collect()
    }
}

/// Hands out scripted connections in order; `None` entries refuse.
#[derive(Default)]
pub struct ScriptedConnector {
    scripts: VecDeque<Option<Vec<Step>>>,
    wire: Arc<Mutex<Wire>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next connect succeeds and replays `steps`.
    pub fn accept(mut self, steps: Vec<Step>) -> Self {
        self.scripts.push_back(Some(steps));
        self
    }

    /// The next connect is refused. Connects beyond the script are
    /// refused too.
    pub fn refuse(mut self) -> Self {
        self.scripts.push_back(None);
        self
    }

    pub fn wire(&self) -> Arc<Mutex<Wire>> {
        Arc::clone(&self.wire)
    }
}

impl Connector for ScriptedConnector {
    type Connection = ScriptedConnection;

    async fn connect(&mut self) -> Result<ScriptedConnection, TransportError> {
        let mut wire = self.wire.lock().unwrap();
        wire.connect_attempts += 1;
        match self.scripts.pop_front().flatten() {
            Some(steps) => {
                wire.connections += 1;
                Ok(ScriptedConnection {
                    number: wire.connections,
                    steps: steps.into(),
                    connected: true,
                    wire: Arc::clone(&self.wire),
                })
            }
            None => Err(TransportError::Connect {
                addr: "scripted".into(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            }),
        }
    }
}

pub struct ScriptedConnection {
    number: u32,
    steps: VecDeque<Step>,
    connected: bool,
    wire: Arc<Mutex<Wire>>,
}

impl Connection for ScriptedConnection {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.wire
            .lock()
            .unwrap()
            .sent
            .push((self.number, String::from_utf8_lossy(data).into_owned()));
        Ok(())
    }

    async fn receive_timeout(&mut self, timeout: Duration) -> Vec<u8> {
        if self.connected {
            match self.steps.pop_front() {
                Some(Step::Bytes(bytes)) => return bytes,
                Some(Step::Drop) => {
                    self.connected = false;
                    return Vec::new();
                }
                Some(Step::Pause(quiet)) => {
                    tokio::time::sleep(quiet).await;
                    return Vec::new();
                }
                None => {}
            }
        }
        // A quiet server: the receive window elapses.
        tokio::time::sleep(timeout).await;
        Vec::new()
    }

    async fn close(&mut self) {
        self.connected = false;
        self.wire.lock().unwrap().closes += 1;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn id(&self) -> ConnectionId {
        ConnectionId::new(u64::from(self.number))
    }
}

// ---------------------------------------------------------------------------
// Recording logic
// ---------------------------------------------------------------------------

/// Game logic that records each callback.
#[derive(Default)]
pub struct Recorder {
    pub events: Vec<String>,
    /// Answers for upcoming move requests; when empty, a default move.
    pub moves: VecDeque<Option<RoomData>>,
    /// Queue a `prepare` request when authenticated as administrator.
    pub prepare_on_create: bool,
    /// Stop the session once a game is prepared.
    pub stop_on_prepared: bool,
    /// In survive mode, act on this `while_disconnected` call.
    pub act_after_disconnected: Option<u32>,
    /// Reconnect (instead of stopping) when acting.
    pub reconnect_when_acting: bool,
    pub disconnected_calls: u32,
    /// Spin in `while_waiting` until signalled, recording start and end.
    pub spin_while_waiting: bool,
}

pub fn default_move() -> RoomData {
    RoomData::new("Advance").with_attr("distance", "1")
}

impl GameLogic for Recorder {
    type Move = RoomData;

    fn calculate_move(&mut self) -> Option<RoomData> {
        self.events.push("calculate_move".into());
        self.moves.pop_front().unwrap_or_else(|| Some(default_move()))
    }

    fn on_update(&mut self, state: &Memento) {
        self.events.push(format!("update:{}", state.turn()));
    }

    fn on_game_over(&mut self, result: &GameResult) {
        let winner = result.winner.as_ref().map_or("draw", |w| w.team.as_str());
        self.events.push(format!("game_over:{winner}"));
    }

    fn on_error(&mut self, message: &str) {
        self.events.push(format!("error:{message}"));
    }

    fn on_room_message(&mut self, payload: &RoomPayload) {
        self.events.push(format!("room:{}", payload.class()));
    }

    fn on_game_joined(&mut self, room_id: &RoomId) {
        self.events.push(format!("joined:{room_id}"));
    }

    fn on_game_left(&mut self) {
        self.events.push("left".into());
    }

    fn on_create_game(&mut self, ctx: &mut ClientContext<'_>) {
        self.events.push("create_game".into());
        if self.prepare_on_create {
            let slot = |name: &str| Slot {
                display_name: name.into(),
                can_timeout: true,
                reserved: true,
            };
            ctx.prepare("swc_2025_hase_und_igel", false, vec![slot("one"), slot("two")]);
        }
    }

    fn on_game_prepared(
        &mut self,
        ctx: &mut ClientContext<'_>,
        room_id: &RoomId,
        reservations: &[String],
    ) {
        self.events
            .push(format!("prepared:{room_id}:{}", reservations.join(",")));
        if self.stop_on_prepared {
            ctx.stop();
        }
    }

    fn on_game_observed(&mut self, _ctx: &mut ClientContext<'_>, room_id: &RoomId) {
        self.events.push(format!("observed:{room_id}"));
    }

    fn while_disconnected(&mut self, ctx: &mut ClientContext<'_>) {
        self.disconnected_calls += 1;
        if self.act_after_disconnected == Some(self.disconnected_calls) {
            if self.reconnect_when_acting {
                ctx.reconnect();
            } else {
                ctx.stop();
            }
        }
    }

    fn while_waiting(&mut self, signal: &WaitSignal) {
        if !self.spin_while_waiting {
            return;
        }
        self.events.push("waiting".into());
        while !signal.is_cancelled() {
            std::thread::sleep(Duration::from_millis(1));
        }
        self.events.push("signalled".into());
    }

    fn room_classes() -> Vec<String> {
        vec!["Advance".into()]
    }
}
