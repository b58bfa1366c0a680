//! The session client: join, dispatch loop, disconnect handling.
//!
//! [`SessionClient`] owns the connection, the frame buffer, and the
//! history, and drives the game logic through one loop:
//!
//! ```text
//!  Disconnected ─→ Connecting ─→ Joining ─→ Active ─┬─→ Disconnecting ─→ Terminated
//!                      ↑                            │         │
//!                      └──────── Reconnecting ←─────┘←────────┘ (auto_reconnect)
//! ```
//!
//! Each iteration checks for shutdown, then for a lost connection, then
//! pulls at most one frame and dispatches it. A receive that finds
//! nothing times out after `receive_timeout`, so the loop never blocks
//! indefinitely.

use std::sync::Arc;
use std::time::Instant;

use socha_protocol::{
    Codec, FrameExtractor, InboundMessage, IntoRoomData, OutboundMessage,
    PROTOCOL_PREAMBLE, RoomId, RoomPayload, XmlCodec,
};
use socha_transport::{Connection, Connector, TcpConnector, TransportError};
use tokio::sync::{Mutex, watch};

use crate::context::Command;
use crate::waiting::Waiter;
use crate::{
    ClientConfig, ClientContext, ClientError, GameLogic, History, JoinStrategy,
    Update,
};

// ---------------------------------------------------------------------------
// ClientState / Termination
// ---------------------------------------------------------------------------

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    /// The join frame is out; waiting for `joined`, `prepared` or
    /// `observed`.
    Joining,
    Active,
    /// The server left or the connection dropped; deciding what next.
    Disconnecting,
    Reconnecting,
    Terminated,
}

/// Why [`SessionClient::run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The server left the room and nothing asked to stay.
    Left,
    /// Shut down through a [`ShutdownHandle`] or [`ClientContext::stop`].
    Shutdown,
    /// The server sent an `errorpacket`.
    ServerError(String),
    /// Every reconnect attempt failed.
    ReconnectExhausted,
}

impl Termination {
    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Left | Self::Shutdown => 0,
            Self::ServerError(_) | Self::ReconnectExhausted => 1,
        }
    }
}

/// Stops a running session from outside the loop.
///
/// The session notices at the top of its next iteration (at most one
/// `receive_timeout` later), sends `<close/>` and closes the socket.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }
}

/// What the loop does after handling something.
enum Flow {
    Continue,
    Stop(Termination),
}

// ---------------------------------------------------------------------------
// SessionClient
// ---------------------------------------------------------------------------

/// A game client session.
///
/// ## Example
///
/// ```rust,no_run
/// use socha_client::{ClientConfig, GameLogic, SessionClient};
/// use socha_protocol::RoomData;
///
/// struct Passive;
///
/// impl GameLogic for Passive {
///     type Move = RoomData;
///     fn calculate_move(&mut self) -> Option<RoomData> {
///         Some(RoomData::new("FallBack"))
///     }
/// }
///
/// # async fn run() -> Result<(), socha_client::ClientError> {
/// let mut client = SessionClient::new(ClientConfig::default(), Passive);
/// let outcome = client.run().await?;
/// std::process::exit(outcome.exit_code());
/// # }
/// ```
pub struct SessionClient<G: GameLogic, C: Connector = TcpConnector> {
    config: ClientConfig,
    connector: C,
    connection: Option<C::Connection>,
    codec: XmlCodec,
    frames: FrameExtractor,
    logic: Arc<Mutex<G>>,
    history: History,
    state: ClientState,
    /// Whether `<protocol>` went out on the current connection.
    sent_preamble: bool,
    waiter: Waiter,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<G: GameLogic> SessionClient<G, TcpConnector> {
    /// Creates a client that connects over TCP to `config.host:config.port`.
    pub fn new(config: ClientConfig, logic: G) -> Self {
        let connector = TcpConnector::new(config.host.clone(), config.port);
        Self::with_connector(config, connector, logic)
    }
}

impl<G: GameLogic, C: Connector> SessionClient<G, C> {
    /// Creates a client that opens its connections through `connector`.
    pub fn with_connector(config: ClientConfig, connector: C, logic: G) -> Self {
        let codec = if config.headless {
            XmlCodec::new().with_raw_room_payloads()
        } else {
            XmlCodec::new().with_room_classes(G::room_classes())
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            connector,
            connection: None,
            codec,
            frames: FrameExtractor::new(),
            logic: Arc::new(Mutex::new(logic)),
            history: History::new(),
            state: ClientState::Disconnected,
            sent_preamble: false,
            waiter: Waiter::default(),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// Returns a handle that stops [`run`](Self::run) from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Shared access to the game logic, e.g. to inspect it after a run.
    pub fn logic(&self) -> Arc<Mutex<G>> {
        Arc::clone(&self.logic)
    }

    /// Connects, joins, and processes server messages until the session
    /// ends.
    ///
    /// # Errors
    /// Fails if the first connection cannot be opened or the join frame
    /// cannot be sent. With `auto_reconnect` the first connection is
    /// retried like a reconnect, and [`ClientError::ReconnectExhausted`]
    /// is returned when that fails too. Everything after a successful
    /// join ends in a [`Termination`].
    pub async fn run(&mut self) -> Result<Termination, ClientError> {
        if let Err(e) = self.connect_and_join().await {
            if !self.config.auto_reconnect {
                tracing::error!(error = %e, "could not connect to the game server");
                self.finish();
                return Err(e);
            }
            tracing::warn!(error = %e, "first connection failed, retrying");
            self.close_connection().await;
            if let Err(e) = self.reconnect().await {
                self.finish();
                return Err(e);
            }
        }

        loop {
            if self.shutdown_requested() {
                return Ok(self.shut_down().await);
            }

            if !self.is_connected() {
                tracing::warn!("connection lost without <left>");
                match self.left().await {
                    Flow::Continue => continue,
                    Flow::Stop(outcome) => return Ok(outcome),
                }
            }

            let Some(frame) = self.next_frame().await else {
                continue;
            };
            self.waiter.cancel();
            tracing::debug!(frame = %String::from_utf8_lossy(&frame), "received");

            let message = match self.codec.decode(&frame) {
                Ok(message) => message,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        frame = %String::from_utf8_lossy(&frame),
                        "dropping undecodable frame"
                    );
                    continue;
                }
            };

            if let Flow::Stop(outcome) = self.dispatch(message).await {
                return Ok(outcome);
            }
            if self.is_connected() {
                self.waiter.spawn(Arc::clone(&self.logic));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Connection
    // -----------------------------------------------------------------------

    /// Opens a fresh connection and sends the join frame.
    async fn connect_and_join(&mut self) -> Result<(), ClientError> {
        self.transition(ClientState::Connecting);
        let connection = self.connector.connect().await?;
        tracing::info!(
            conn = %connection.id(),
            host = %self.config.host,
            port = self.config.port,
            "connected"
        );
        self.connection = Some(connection);
        self.sent_preamble = false;
        self.frames.clear();
        self.join().await
    }

    async fn join(&mut self) -> Result<(), ClientError> {
        self.transition(ClientState::Joining);
        self.history.open_game();

        let message = self.config.join.message();
        self.send(&message).await?;
        tracing::info!(strategy = self.config.join.kind(), "join request sent");

        if matches!(self.config.join, JoinStrategy::Admin { .. }) {
            let commands = self
                .with_context(|logic, ctx| logic.on_create_game(ctx))
                .await;
            self.apply(commands, false).await;
        }
        Ok(())
    }

    /// Encodes and writes one message, prefixed with `<protocol>` if it is
    /// the first on this connection.
    async fn send(&mut self, message: &OutboundMessage) -> Result<(), TransportError> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(TransportError::NotConnected)?;

        let mut bytes = Vec::new();
        if !self.sent_preamble {
            bytes.extend_from_slice(PROTOCOL_PREAMBLE);
        }
        bytes.extend(self.codec.encode(message));

        tracing::debug!(
            conn = %connection.id(),
            kind = message.kind(),
            frame = %String::from_utf8_lossy(&bytes),
            "sending"
        );
        connection.send(&bytes).await?;
        self.sent_preamble = true;
        Ok(())
    }

    /// Returns a buffered frame, or receives once and tries again.
    async fn next_frame(&mut self) -> Option<Vec<u8>> {
        if let Some(frame) = self.frames.next_frame() {
            return Some(frame);
        }
        let connection = self.connection.as_mut()?;
        let chunk = connection.receive_timeout(self.config.receive_timeout).await;
        if chunk.is_empty() {
            return None;
        }
        self.frames.push(&chunk);
        self.frames.next_frame()
    }

    fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| c.is_connected())
    }

    async fn close_connection(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            tracing::debug!(conn = %connection.id(), "closing connection");
            connection.close().await;
        }
        // Whatever is left belongs to the old stream.
        self.frames.clear();
    }

    /// Sends `<close/>` if still connected, then closes.
    async fn close_gracefully(&mut self) {
        if self.is_connected() {
            if let Err(e) = self.send(&OutboundMessage::Close).await {
                tracing::debug!(error = %e, "could not send <close/>");
            }
        }
        self.close_connection().await;
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    async fn dispatch(&mut self, message: InboundMessage) -> Flow {
        match message {
            InboundMessage::Joined { room_id } => {
                self.transition(ClientState::Active);
                tracing::info!(%room_id, "joined room");
                self.logic.lock().await.on_game_joined(&room_id);
                Flow::Continue
            }
            InboundMessage::Prepared {
                room_id,
                reservations,
            } => {
                self.transition(ClientState::Active);
                tracing::info!(%room_id, reservations = reservations.len(), "game prepared");
                let commands = self
                    .with_context(|logic, ctx| {
                        logic.on_game_prepared(ctx, &room_id, &reservations)
                    })
                    .await;
                self.apply(commands, false).await;
                Flow::Continue
            }
            InboundMessage::Observed { room_id } => {
                self.transition(ClientState::Active);
                tracing::info!(%room_id, "observing room");
                let commands = self
                    .with_context(|logic, ctx| logic.on_game_observed(ctx, &room_id))
                    .await;
                self.apply(commands, false).await;
                Flow::Continue
            }
            InboundMessage::Left { room_id } => {
                tracing::info!(%room_id, "server left the room");
                self.left().await
            }
            InboundMessage::ErrorPacket { message, original } => {
                tracing::error!(
                    %message,
                    original = %original.as_ref().map(|o| o.to_xml()).unwrap_or_default(),
                    "server sent an error"
                );
                self.logic.lock().await.on_error(&message);
                self.history.push(Update::Error(message.clone()));
                self.transition(ClientState::Disconnecting);
                self.close_gracefully().await;
                self.finish();
                Flow::Stop(Termination::ServerError(message))
            }
            InboundMessage::Room { room_id, payload } => {
                self.on_room(room_id, payload).await;
                Flow::Continue
            }
        }
    }

    async fn on_room(&mut self, room_id: RoomId, payload: RoomPayload) {
        let shared = Arc::clone(&self.logic);
        let mut logic = shared.lock().await;

        match &payload {
            RoomPayload::MoveRequest => {
                tracing::debug!(%room_id, "move requested");
                let started = Instant::now();
                let chosen = logic.calculate_move();
                drop(logic);
                let elapsed_ms =
                    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

                let Some(chosen) = chosen else {
                    tracing::error!(%room_id, elapsed_ms, "no move calculated, nothing sent");
                    return;
                };
                let reply = OutboundMessage::RoomEnvelope {
                    room_id: room_id.clone(),
                    payload: chosen.into_room_data(),
                };
                match self.send(&reply).await {
                    Ok(()) => tracing::info!(%room_id, elapsed_ms, "move sent"),
                    Err(e) => tracing::warn!(%room_id, error = %e, "could not send move"),
                }
            }
            RoomPayload::StateUpdate(memento) => {
                tracing::debug!(%room_id, turn = memento.turn(), "state update");
                self.history.push(Update::State(memento.clone()));
                logic.on_update(memento);
            }
            RoomPayload::Result(result) => {
                tracing::info!(
                    %room_id,
                    winner = result.winner.as_ref().map_or("draw", |w| w.team.as_str()),
                    "game over"
                );
                self.history.push(Update::Result(result.clone()));
                logic.on_game_over(result);
            }
            RoomPayload::Welcome(welcome) => {
                tracing::info!(%room_id, team = %welcome.team, "welcome");
                logic.on_room_message(&payload);
            }
            RoomPayload::Error(error) => {
                tracing::warn!(%room_id, message = %error.message, "room error");
                self.history.push(Update::Error(error.message.clone()));
                logic.on_room_message(&payload);
            }
            RoomPayload::Other(_) => logic.on_room_message(&payload),
        }
    }

    // -----------------------------------------------------------------------
    // Leaving, surviving, reconnecting
    // -----------------------------------------------------------------------

    /// Handles the end of a game, whether announced by `<left>` or by the
    /// connection dropping.
    async fn left(&mut self) -> Flow {
        // A drop can arrive while `while_waiting` still holds the logic.
        self.waiter.cancel();
        self.logic.lock().await.on_game_left();
        self.transition(ClientState::Disconnecting);
        self.close_connection().await;

        if self.config.survive {
            return self.survive().await;
        }
        if self.config.auto_reconnect {
            return match self.reconnect().await {
                Ok(()) => Flow::Continue,
                Err(e) => {
                    tracing::error!(error = %e, "stopping");
                    self.finish();
                    Flow::Stop(Termination::ReconnectExhausted)
                }
            };
        }
        self.finish();
        Flow::Stop(Termination::Left)
    }

    /// Keeps calling `while_disconnected` until shut down or asked to
    /// reconnect.
    async fn survive(&mut self) -> Flow {
        tracing::info!("surviving until shut down");
        loop {
            if self.shutdown_requested() {
                return Flow::Stop(self.shut_down().await);
            }

            let commands = self
                .with_context(|logic, ctx| logic.while_disconnected(ctx))
                .await;
            if self.apply(commands, true).await {
                match self.reconnect().await {
                    Ok(()) => return Flow::Continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "still disconnected");
                        self.transition(ClientState::Disconnecting);
                    }
                }
            }
            if self.shutdown_requested() {
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.receive_timeout) => {}
                _ = self.shutdown_rx.changed() => {}
            }
        }
    }

    /// Connects and re-joins with the original strategy, up to
    /// `reconnect.attempts` times.
    async fn reconnect(&mut self) -> Result<(), ClientError> {
        self.transition(ClientState::Reconnecting);
        let policy = self.config.reconnect.clone();

        for attempt in 1..=policy.attempts {
            if attempt > 1 {
                tokio::time::sleep(policy.delay).await;
            }
            tracing::info!(attempt, of = policy.attempts, "reconnecting");
            match self.connect_and_join().await {
                Ok(()) => {
                    tracing::info!(attempt, "reconnected");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "reconnect attempt failed");
                    self.close_connection().await;
                    self.transition(ClientState::Reconnecting);
                }
            }
        }

        Err(ClientError::ReconnectExhausted {
            attempts: policy.attempts,
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Runs a callback that receives a [`ClientContext`] and returns what
    /// it queued.
    async fn with_context<F>(&self, callback: F) -> Vec<Command>
    where
        F: FnOnce(&mut G, &mut ClientContext<'_>),
    {
        let mut logic = self.logic.lock().await;
        let mut ctx = ClientContext::new(&self.history);
        callback(&mut *logic, &mut ctx);
        ctx.into_commands()
    }

    /// Carries out queued commands. Returns `true` if a reconnect was
    /// requested and `allow_reconnect` is set.
    async fn apply(&mut self, commands: Vec<Command>, allow_reconnect: bool) -> bool {
        let mut reconnect = false;
        for command in commands {
            match command {
                Command::Send(message) => {
                    if let Err(e) = self.send(&message).await {
                        tracing::warn!(
                            kind = message.kind(),
                            error = %e,
                            "could not send queued message"
                        );
                    }
                }
                Command::Stop => {
                    tracing::info!("stop requested by game logic");
                    self.shutdown_tx.send_replace(true);
                }
                Command::Reconnect if allow_reconnect => reconnect = true,
                Command::Reconnect => {
                    tracing::warn!("reconnect requested while connected, ignoring");
                }
            }
        }
        reconnect
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    async fn shut_down(&mut self) -> Termination {
        tracing::info!("shutting down");
        self.transition(ClientState::Disconnecting);
        self.close_gracefully().await;
        self.finish();
        Termination::Shutdown
    }

    fn finish(&mut self) {
        self.waiter.cancel();
        self.transition(ClientState::Terminated);
    }

    fn transition(&mut self, next: ClientState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "state change");
            self.state = next;
        }
    }
}
