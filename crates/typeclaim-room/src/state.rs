//! The room state machine.
//!
//! [`Room`] holds everything about one game and never touches a channel
//! or a timer. Each call to [`Room::apply`] takes one [`RoomEvent`] and
//! returns [`Effects`]: the events to deliver, what to do with the clock,
//! and whether the room is finished. The actor turns those into I/O.
//!
//! Transitions are picked by matching on `(status, event)`, so every
//! combination the room does not handle falls into one place and is
//! logged and ignored.

use std::time::Instant;

use tracing::{debug, info, warn};
use typeclaim_protocol::{
    GameEndedReason, GameOverReason, GameSnapshot, GameStatus, Player, PlayerId, Recipient,
    RoomCode, ServerEvent, Territory,
};

use crate::claim::{self, ClaimOutcome};
use crate::config::{MAX_NAME_LEN, palette_color};
use crate::{RoomConfig, RoomError, catalog};

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// Everything that can happen to a room.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// A player asks to enter. The first player in becomes host.
    Join { player_id: PlayerId, name: String },
    /// A player left or disconnected.
    Leave { player_id: PlayerId },
    /// A player asks to start the game. Only the host may.
    Start { player_id: PlayerId },
    /// Advisory territory selection.
    Select {
        player_id: PlayerId,
        territory_id: String,
    },
    /// A finished phrase.
    Claim {
        player_id: PlayerId,
        territory_id: String,
        typing_speed: f64,
    },
    /// One clock period elapsed; `remaining` periods are left.
    Tick { remaining: u32 },
}

impl RoomEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Start { .. } => "start",
            Self::Select { .. } => "select",
            Self::Claim { .. } => "claim",
            Self::Tick { .. } => "tick",
        }
    }
}

/// What the owner of the clock should do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockDirective {
    /// Start counting down from this many periods.
    Start(u32),
    /// Stop the clock. Harmless if it already stopped itself.
    Stop,
}

/// The result of one transition.
#[derive(Debug, Default)]
pub struct Effects {
    /// Events to deliver, in order, addressed against the players who
    /// are in the room *after* the transition.
    pub messages: Vec<(Recipient, ServerEvent)>,
    pub clock: Option<ClockDirective>,
    /// The room has no reason to exist any more.
    pub closed: bool,
}

impl Effects {
    fn push(&mut self, to: Recipient, event: ServerEvent) {
        self.messages.push((to, event));
    }
}

/// Trims a display name and checks its length.
pub fn validate_player_name(raw: &str) -> Result<String, RoomError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(RoomError::InvalidName { max: MAX_NAME_LEN });
    }
    Ok(name.to_string())
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One game room.
#[derive(Debug)]
pub struct Room {
    code: RoomCode,
    status: GameStatus,
    players: Vec<Player>,
    territories: Vec<Territory>,
    time_remaining: u32,
    created_at: Instant,
    config: RoomConfig,
}

impl Room {
    /// A waiting room with no players and a full, unowned territory set.
    pub fn new(code: RoomCode, config: RoomConfig) -> Self {
        Self {
            code,
            status: GameStatus::Waiting,
            players: Vec::new(),
            territories: catalog::territories(),
            time_remaining: config.game_duration_secs,
            created_at: Instant::now(),
            config,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Players in join order. The host is always exactly one of them.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn territories(&self) -> &[Territory] {
        &self.territories
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// The full state as clients see it.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            game_id: self.code.clone(),
            status: self.status,
            players: self.players.clone(),
            territories: self.territories.clone(),
            time_remaining: self.time_remaining,
        }
    }

    /// Applies one event.
    ///
    /// Only admission failures come back as `Err`. Anything else the room
    /// cannot act on (a non-host start, a claim after the game ended, a
    /// tick with no game running) is a no-op with empty effects.
    pub fn apply(&mut self, event: RoomEvent) -> Result<Effects, RoomError> {
        use GameStatus::{Playing, Waiting};

        match (self.status, event) {
            (Waiting, RoomEvent::Join { player_id, name }) => self.join(player_id, &name),
            (_, RoomEvent::Join { .. }) => Err(RoomError::NotWaiting(self.code.clone())),

            (_, RoomEvent::Leave { player_id }) => self.leave(player_id),

            (Waiting, RoomEvent::Start { player_id }) => Ok(self.start(player_id)),

            (Playing, RoomEvent::Select {
                player_id,
                territory_id,
            }) => Ok(self.select(player_id, &territory_id)),

            (Playing, RoomEvent::Claim {
                player_id,
                territory_id,
                typing_speed,
            }) => Ok(self.claim(player_id, &territory_id, typing_speed)),

            (Playing, RoomEvent::Tick { remaining }) => Ok(self.tick(remaining)),
            (status, RoomEvent::Tick { remaining }) => {
                warn!(room = %self.code, %status, remaining, "clock tick outside a running game, ignoring");
                Ok(Effects::default())
            }

            (status, event) => {
                debug!(room = %self.code, %status, event = event.name(), "event not valid in this status, ignoring");
                Ok(Effects::default())
            }
        }
    }

    // -- transitions --------------------------------------------------------

    fn join(&mut self, player_id: PlayerId, raw_name: &str) -> Result<Effects, RoomError> {
        let name = validate_player_name(raw_name)?;
        if self.player(player_id).is_some() {
            return Err(RoomError::AlreadyInRoom(player_id, self.code.clone()));
        }
        if self.players.len() >= self.config.max_players {
            return Err(RoomError::RoomFull(self.code.clone()));
        }
        let lowered = name.to_lowercase();
        if self.players.iter().any(|p| p.name.to_lowercase() == lowered) {
            return Err(RoomError::NameTaken(name));
        }

        let is_host = self.players.is_empty();
        let player = Player::new(player_id, name, palette_color(self.players.len()), is_host);
        self.players.push(player.clone());
        info!(
            room = %self.code,
            %player_id,
            name = %player.name,
            is_host,
            players = self.players.len(),
            "player joined"
        );

        let mut effects = Effects::default();
        if is_host {
            effects.push(
                Recipient::Player(player_id),
                ServerEvent::GameCreated {
                    game_id: self.code.clone(),
                    player,
                    game: self.snapshot(),
                },
            );
        } else {
            effects.push(
                Recipient::Player(player_id),
                ServerEvent::GameJoined {
                    game_id: self.code.clone(),
                    player: player.clone(),
                    game: self.snapshot(),
                },
            );
            effects.push(
                Recipient::AllExcept(player_id),
                ServerEvent::PlayerJoined {
                    game_id: self.code.clone(),
                    player,
                    players: self.players.clone(),
                },
            );
        }
        Ok(effects)
    }

    fn leave(&mut self, player_id: PlayerId) -> Result<Effects, RoomError> {
        let Some(index) = self.players.iter().position(|p| p.id == player_id) else {
            return Err(RoomError::NotInRoom(player_id, self.code.clone()));
        };
        let departed = self.players.remove(index);
        info!(
            room = %self.code,
            %player_id,
            status = %self.status,
            players = self.players.len(),
            "player left"
        );

        let mut effects = Effects::default();

        // A room whose host never started it is abandoned outright.
        if departed.is_host && self.status == GameStatus::Waiting {
            if !self.players.is_empty() {
                effects.push(
                    Recipient::All,
                    ServerEvent::GameEnded {
                        reason: GameEndedReason::HostLeft,
                    },
                );
            }
            info!(room = %self.code, "host left before start, closing room");
            effects.closed = true;
            return Ok(effects);
        }

        if self.players.is_empty() {
            if self.status == GameStatus::Playing && self.transition(GameStatus::Ended) {
                effects.clock = Some(ClockDirective::Stop);
            }
            effects.closed = true;
            return Ok(effects);
        }

        effects.push(
            Recipient::All,
            ServerEvent::PlayerLeft {
                player_id,
                player_name: departed.name,
                players: self.players.clone(),
            },
        );

        if departed.is_host {
            let heir = &mut self.players[0];
            heir.is_host = true;
            info!(room = %self.code, player_id = %heir.id, "host promoted");
            effects.push(
                Recipient::All,
                ServerEvent::NewHost {
                    player_id: heir.id,
                    player_name: heir.name.clone(),
                },
            );
        }

        if self.status == GameStatus::Playing && self.players.len() <= 1 {
            self.finish(GameOverReason::OpponentsLeft, &mut effects);
        }

        Ok(effects)
    }

    fn start(&mut self, player_id: PlayerId) -> Effects {
        if !self.player(player_id).is_some_and(|p| p.is_host) {
            debug!(room = %self.code, %player_id, "start from non-host, ignoring");
            return Effects::default();
        }

        if self.territories.is_empty() {
            warn!(room = %self.code, "territory set missing at start, reloading catalog");
            self.territories = catalog::territories();
        }
        if !self.transition(GameStatus::Playing) {
            return Effects::default();
        }
        self.time_remaining = self.config.game_duration_secs;
        info!(
            room = %self.code,
            players = self.players.len(),
            duration = self.time_remaining,
            "game started"
        );

        let mut effects = Effects::default();
        effects.clock = Some(ClockDirective::Start(self.time_remaining));
        effects.push(
            Recipient::All,
            ServerEvent::GameStarted {
                game: self.snapshot(),
            },
        );
        effects
    }

    fn select(&mut self, player_id: PlayerId, territory_id: &str) -> Effects {
        let Some(player) = self.player(player_id) else {
            debug!(room = %self.code, %player_id, "select from non-member, ignoring");
            return Effects::default();
        };
        let Some(territory) = self.territories.iter().find(|t| t.id == territory_id) else {
            debug!(room = %self.code, %player_id, territory_id, "select of unknown territory, ignoring");
            return Effects::default();
        };
        if territory.is_claimed() {
            debug!(room = %self.code, %player_id, territory_id, "select of owned territory, ignoring");
            return Effects::default();
        }

        let mut effects = Effects::default();
        effects.push(
            Recipient::Player(player_id),
            ServerEvent::TerritorySelected {
                territory_id: territory.id.clone(),
            },
        );
        effects.push(
            Recipient::AllExcept(player_id),
            ServerEvent::TerritoryAttempt {
                territory_id: territory.id.clone(),
                player_id,
                player_name: player.name.clone(),
            },
        );
        effects
    }

    fn claim(&mut self, player_id: PlayerId, territory_id: &str, typing_speed: f64) -> Effects {
        let outcome = claim::resolve_claim(
            &mut self.players,
            &mut self.territories,
            player_id,
            territory_id,
            typing_speed,
        );
        let mut effects = Effects::default();
        if !outcome.is_claimed() {
            debug!(room = %self.code, %player_id, territory_id, ?outcome, "claim rejected");
            return effects;
        }

        let Some(claimant) = self.player(player_id) else {
            return effects;
        };
        info!(room = %self.code, %player_id, territory_id, score = claimant.score, "territory claimed");
        effects.push(
            Recipient::All,
            ServerEvent::TerritoryClaimed {
                territory_id: territory_id.to_string(),
                player_id,
                player_name: claimant.name.clone(),
                player_color: claimant.color.clone(),
                players: self.players.clone(),
            },
        );

        if claim::all_claimed(&self.territories) {
            self.finish(GameOverReason::AllClaimed, &mut effects);
        }
        effects
    }

    fn tick(&mut self, remaining: u32) -> Effects {
        self.time_remaining = remaining;
        let mut effects = Effects::default();
        effects.push(
            Recipient::All,
            ServerEvent::TimerUpdate {
                time_remaining: remaining,
            },
        );

        if remaining == 0 {
            self.finish(GameOverReason::TimeUp, &mut effects);
        }
        effects
    }

    /// Ends the running game: stops the clock and broadcasts the ranking.
    fn finish(&mut self, reason: GameOverReason, effects: &mut Effects) {
        if !self.transition(GameStatus::Ended) {
            return;
        }
        effects.clock = Some(ClockDirective::Stop);
        info!(room = %self.code, ?reason, "game over");
        effects.push(
            Recipient::All,
            ServerEvent::GameOver {
                reason,
                players: claim::rank_players(&self.players),
            },
        );
    }

    /// The only place `status` changes. Backward or skipping moves are
    /// refused and logged; the room keeps its current status.
    fn transition(&mut self, to: GameStatus) -> bool {
        if !self.status.can_transition_to(to) {
            warn!(room = %self.code, from = %self.status, %to, "illegal status transition, ignoring");
            return false;
        }
        debug!(room = %self.code, from = %self.status, %to, "status changed");
        self.status = to;
        true
    }
}

// =========================================================================
// Tests
// =========================================================================
