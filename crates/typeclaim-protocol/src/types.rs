//! Core protocol types: identities, addressing, and the snapshot shapes
//! that clients render.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Equal to the owning connection's id, so it lives exactly as long as
/// the socket. It doubles as the ownership token on territories.
///
/// `#[serde(transparent)]` keeps it a plain number on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A six-symbol room code such as `K7XQ2M`.
///
/// Always stored uppercase and drawn from [`RoomCode::ALPHABET`], which
/// leaves out glyphs that are easy to misread (`I`, `O`, `0`, `1`).
/// Construct one with [`RoomCode::parse`]; deserialization goes through
/// the same check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Symbols a code may contain.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

    /// Number of symbols in a code.
    pub const LEN: usize = 6;

    /// Normalizes user input into a code: surrounding whitespace is
    /// trimmed and letters are uppercased.
    ///
    /// Returns `None` if the result is not exactly [`Self::LEN`] symbols
    /// from [`Self::ALPHABET`].
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = input.trim().to_ascii_uppercase();
        let valid = normalized.len() == Self::LEN
            && normalized.bytes().all(|b| Self::ALPHABET.contains(&b));
        valid.then_some(Self(normalized))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RoomCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid room code {raw:?}")))
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive an event?
// ---------------------------------------------------------------------------

/// Addressing for an outbound event inside a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every player in the room.
    All,

    /// One specific player.
    Player(PlayerId),

    /// Everyone except the given player. Used for "X is going for
    /// Europe" notices that the actor already knows about.
    AllExcept(PlayerId),
}

impl Recipient {
    /// Returns `true` if `player` should receive an event sent to `self`.
    pub fn includes(&self, player: PlayerId) -> bool {
        match self {
            Self::All => true,
            Self::Player(target) => *target == player,
            Self::AllExcept(excluded) => *excluded != player,
        }
    }
}

// ---------------------------------------------------------------------------
// GameStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a room's game.
///
/// Transitions only move forward:
///
/// ```text
/// Waiting → Playing → Ended
/// ```
///
/// A room in `Waiting` may also be torn down directly (host left before
/// the start); that is the registry's business, not a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Playing,
    Ended,
}

impl GameStatus {
    /// The only status this one may move to, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::Playing),
            Self::Playing => Some(Self::Ended),
            Self::Ended => None,
        }
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Playing => write!(f, "playing"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// A player as every client sees them.
///
/// `score` and `avg_typing_speed` are derived values; the room recomputes
/// them from territory ownership and `typing_speeds` after every claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// CSS hex color, assigned from the palette by join order.
    pub color: String,
    pub is_host: bool,
    /// Number of territories currently owned.
    pub score: u32,
    /// Characters per minute, one sample per successful claim.
    pub typing_speeds: Vec<u32>,
    /// Rounded mean of `typing_speeds`, 0 when there are none.
    pub avg_typing_speed: u32,
}

impl Player {
    /// A fresh player with no claims.
    pub fn new(id: PlayerId, name: impl Into<String>, color: impl Into<String>, is_host: bool) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
            is_host,
            score: 0,
            typing_speeds: Vec::new(),
            avg_typing_speed: 0,
        }
    }
}

/// A contested map region.
///
/// `id`, `name` and `phrase` come from the static catalog. `owner` goes
/// from `None` to `Some(player)` at most once per game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Territory {
    pub id: String,
    pub name: String,
    /// The exact text a player must type to claim this territory.
    pub phrase: String,
    pub owner: Option<PlayerId>,
}

impl Territory {
    /// Returns `true` once someone owns this territory.
    pub fn is_claimed(&self) -> bool {
        self.owner.is_some()
    }
}

/// Full room state sent on create, join, and start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub game_id: RoomCode,
    pub status: GameStatus,
    pub players: Vec<Player>,
    pub territories: Vec<Territory>,
    pub time_remaining: u32,
}

// =========================================================================
// Tests
// =========================================================================
