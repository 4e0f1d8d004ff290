//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Player commands and clock ticks are both consumed by the same
//! `select!` loop, so everything that mutates a room happens one event
//! at a time. Outside code only ever holds a [`RoomHandle`].

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use typeclaim_clock::{ClockEpoch, ClockTick, CountdownClock};
use typeclaim_protocol::{
    GameSnapshot, GameStatus, Player, PlayerId, Recipient, RoomCode, ServerEvent,
};

use crate::state::{ClockDirective, Effects, Room, RoomEvent};
use crate::{RoomConfig, RoomError};

/// Channel sender for delivering events to a player's connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<Player, RoomError>>,
    },

    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<LeaveOutcome, RoomError>>,
    },

    /// Start, select or claim. Nothing to reply: failures are silent.
    Input { event: RoomEvent },

    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },

    GetSnapshot {
        reply: oneshot::Sender<GameSnapshot>,
    },

    Shutdown,
}

/// What happened to the room when a player left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// The room closed and its actor has stopped. The registry should
    /// forget it.
    pub closed: bool,
}

/// Room metadata (not the game itself).
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub status: GameStatus,
    pub player_count: usize,
    pub max_players: usize,
    pub created_at: Instant,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running room actor.
///
/// Cheap to clone. Once the actor has stopped, every method returns
/// [`RoomError::Unavailable`].
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    created_at: Instant,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Adds a player. `sender` receives every event addressed to them,
    /// starting with `gameCreated` or `gameJoined`.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: impl Into<String>,
        sender: PlayerSender,
    ) -> Result<Player, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            player_id,
            name: name.into(),
            sender,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes a player.
    pub async fn leave(&self, player_id: PlayerId) -> Result<LeaveOutcome, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Leave {
            player_id,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Asks to start the game (fire-and-forget).
    pub async fn start(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.input(RoomEvent::Start { player_id }).await
    }

    /// Announces a territory selection (fire-and-forget).
    pub async fn select(
        &self,
        player_id: PlayerId,
        territory_id: impl Into<String>,
    ) -> Result<(), RoomError> {
        self.input(RoomEvent::Select {
            player_id,
            territory_id: territory_id.into(),
        })
        .await
    }

    /// Submits a claim (fire-and-forget). The outcome arrives as a
    /// `territoryClaimed` broadcast, or not at all.
    pub async fn claim(
        &self,
        player_id: PlayerId,
        territory_id: impl Into<String>,
        typing_speed: f64,
    ) -> Result<(), RoomError> {
        self.input(RoomEvent::Claim {
            player_id,
            territory_id: territory_id.into(),
            typing_speed,
        })
        .await
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    pub async fn snapshot(&self) -> Result<GameSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::GetSnapshot { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    /// Like [`shutdown`](Self::shutdown), for callers that cannot await.
    /// If the channel is full the request is dropped; the actor still
    /// stops once every handle is gone.
    pub fn request_shutdown(&self) {
        if self.sender.try_send(RoomCommand::Shutdown).is_err() {
            tracing::debug!(room = %self.code, "shutdown request not delivered");
        }
    }

    async fn input(&self, event: RoomEvent) -> Result<(), RoomError> {
        self.send(RoomCommand::Input { event }).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code.clone())
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct RoomActor {
    room: Room,
    /// Per-player outbound channels.
    senders: HashMap<PlayerId, PlayerSender>,
    clock: CountdownClock,
    /// The clock run this room started, if a game is on.
    clock_epoch: Option<ClockEpoch>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop until the room closes, is shut down, or every
    /// handle is dropped.
    async fn run(mut self) {
        tracing::info!(room = %self.room.code(), "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if self.handle_command(cmd) {
                        break;
                    }
                }
                tick = self.clock.wait_for_tick() => {
                    if self.handle_tick(tick) {
                        break;
                    }
                }
            }
        }

        self.clock.stop();
        tracing::info!(room = %self.room.code(), "room actor stopped");
    }

    /// Returns `true` when the actor should stop.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                player_id,
                name,
                sender,
                reply,
            } => {
                let result = self.handle_join(player_id, name, sender);
                let _ = reply.send(result);
                false
            }
            RoomCommand::Leave { player_id, reply } => {
                let result = self.handle_leave(player_id);
                let closed = matches!(result, Ok(LeaveOutcome { closed: true }));
                let _ = reply.send(result);
                closed
            }
            RoomCommand::Input { event } => match self.room.apply(event) {
                Ok(effects) => self.run_effects(effects),
                Err(e) => {
                    tracing::debug!(room = %self.room.code(), error = %e, "input rejected");
                    false
                }
            },
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
                false
            }
            RoomCommand::GetSnapshot { reply } => {
                let _ = reply.send(self.room.snapshot());
                false
            }
            RoomCommand::Shutdown => {
                tracing::info!(room = %self.room.code(), "room shutting down");
                true
            }
        }
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<Player, RoomError> {
        let effects = self.room.apply(RoomEvent::Join { player_id, name })?;
        self.senders.insert(player_id, sender);
        self.run_effects(effects);
        self.room
            .player(player_id)
            .cloned()
            .ok_or_else(|| RoomError::NotInRoom(player_id, self.room.code().clone()))
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> Result<LeaveOutcome, RoomError> {
        let effects = self.room.apply(RoomEvent::Leave { player_id })?;
        self.senders.remove(&player_id);
        let closed = self.run_effects(effects);
        Ok(LeaveOutcome { closed })
    }

    fn handle_tick(&mut self, tick: ClockTick) -> bool {
        if self.clock_epoch != Some(tick.epoch) {
            tracing::warn!(
                room = %self.room.code(),
                epoch = %tick.epoch,
                "tick from a stale clock run, ignoring"
            );
            return false;
        }
        if tick.expired {
            // The clock already stopped itself; this run is over.
            self.clock_epoch = None;
        }
        match self.room.apply(RoomEvent::Tick {
            remaining: tick.remaining,
        }) {
            Ok(effects) => self.run_effects(effects),
            Err(e) => {
                tracing::warn!(room = %self.room.code(), error = %e, "tick rejected");
                false
            }
        }
    }

    /// Applies a transition's clock directive and delivers its messages.
    /// Returns `effects.closed`.
    fn run_effects(&mut self, effects: Effects) -> bool {
        match effects.clock {
            Some(ClockDirective::Start(periods)) => {
                self.clock_epoch = Some(self.clock.start(periods));
            }
            Some(ClockDirective::Stop) => {
                self.clock.stop();
                self.clock_epoch = None;
            }
            None => {}
        }
        self.dispatch(effects.messages);
        effects.closed
    }

    /// Delivers each message to the current members its recipient covers.
    fn dispatch(&self, messages: Vec<(Recipient, ServerEvent)>) {
        for (recipient, event) in messages {
            for player in self.room.players() {
                if recipient.includes(player.id) {
                    self.send_to(player.id, event.clone());
                }
            }
        }
    }

    /// Sends an event to a single player. Silently drops it if the
    /// player's connection is gone.
    fn send_to(&self, player_id: PlayerId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(event);
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.room.code().clone(),
            status: self.room.status(),
            player_count: self.room.players().len(),
            max_players: self.room.config().max_players,
            created_at: self.room.created_at(),
        }
    }
}

/// Spawns a room actor task and returns a handle to it.
///
/// The command channel is bounded by `config.command_buffer`; senders
/// wait when it is full.
pub(crate) fn spawn_room(code: RoomCode, config: RoomConfig) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
    let clock = CountdownClock::new(config.clock_config());
    let room = Room::new(code.clone(), config);
    let created_at = room.created_at();

    let actor = RoomActor {
        room,
        senders: HashMap::new(),
        clock,
        clock_epoch: None,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    RoomHandle {
        code,
        created_at,
        sender: tx,
    }
}
