//! Named events exchanged over a connection.
//!
//! Every frame is one event, adjacently tagged:
//!
//! ```json
//! { "event": "joinGame", "data": { "gameId": "K7XQ2M", "playerName": "Ada" } }
//! ```
//!
//! Event names and payload fields are camelCase so browser code can use
//! them as-is.

use serde::{Deserialize, Serialize};

use crate::{GameSnapshot, Player, PlayerId, RoomCode};

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Events a client may send.
///
/// `game_id` stays a raw string here: codes typed by people arrive in any
/// case and with stray whitespace, and a bad code is an admission error
/// for the room layer to report, not a malformed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Open a new room with the sender as host.
    CreateGame { player_name: String },

    /// Enter an existing room that hasn't started yet.
    JoinGame { game_id: String, player_name: String },

    /// Host only: begin the game and start the clock.
    StartGame { game_id: String },

    /// Advisory: "I'm typing for this territory". Reserves nothing.
    SelectTerritory { game_id: String, territory_id: String },

    /// "I finished typing this territory's phrase."
    ///
    /// `typing_speed` is the client's own measurement in characters per
    /// minute and is taken at face value.
    ClaimTerritory {
        game_id: String,
        territory_id: String,
        typing_speed: f64,
    },

    /// Leave the current room without closing the connection.
    LeaveGame { game_id: String },

    /// Queue for an automatically assembled room.
    FindMatch { player_name: String },

    /// Leave the matchmaking queue. Sent without a payload.
    CancelMatchmaking,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Why a game finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameOverReason {
    /// The clock reached zero.
    TimeUp,
    /// Every territory has an owner.
    AllClaimed,
    /// Everybody else disconnected mid-game.
    OpponentsLeft,
}

/// Why a room was torn down before its game could run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameEndedReason {
    /// The host left while the room was still waiting.
    HostLeft,
}

/// Events the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// To the creator: the room exists and they host it.
    GameCreated {
        game_id: RoomCode,
        player: Player,
        game: GameSnapshot,
    },

    /// To a joiner: admission succeeded, here is the room.
    GameJoined {
        game_id: RoomCode,
        player: Player,
        game: GameSnapshot,
    },

    /// To existing members: someone new is in.
    PlayerJoined {
        game_id: RoomCode,
        player: Player,
        players: Vec<Player>,
    },

    /// To everyone: the clock is running.
    GameStarted { game: GameSnapshot },

    /// To everyone, once per second while playing.
    TimerUpdate { time_remaining: u32 },

    /// To the selecting player only.
    TerritorySelected { territory_id: String },

    /// To everyone but the selecting player.
    TerritoryAttempt {
        territory_id: String,
        player_id: PlayerId,
        player_name: String,
    },

    /// To everyone: a territory changed hands for good.
    TerritoryClaimed {
        territory_id: String,
        player_id: PlayerId,
        player_name: String,
        player_color: String,
        players: Vec<Player>,
    },

    /// To everyone: final standings, best first.
    GameOver {
        reason: GameOverReason,
        players: Vec<Player>,
    },

    /// To remaining members.
    PlayerLeft {
        player_id: PlayerId,
        player_name: String,
        players: Vec<Player>,
    },

    /// To everyone: host privileges moved.
    NewHost {
        player_id: PlayerId,
        player_name: String,
    },

    /// To remaining members: the room is gone.
    GameEnded { reason: GameEndedReason },

    /// To the sender of `findMatch`: you are queued.
    MatchmakingStatus { players_waiting: usize },

    /// To one connection: a request was refused.
    Error { message: String },
}

impl ServerEvent {
    /// Shorthand for an [`ServerEvent::Error`] with the given text.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
