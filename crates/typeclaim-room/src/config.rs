//! Room and matchmaking configuration.

use std::time::Duration;

use typeclaim_clock::ClockConfig;

/// Player colors, handed out by join order.
pub const PALETTE: [&str; 6] = [
    "#e74c3c", "#3498db", "#2ecc71", "#9b59b6", "#f39c12", "#1abc9c",
];

/// Longest accepted display name, in characters.
pub const MAX_NAME_LEN: usize = 15;

/// Returns the color for the player who joins when `index` players are
/// already present.
pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration shared by every room a registry creates.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Maximum players allowed in the room.
    pub max_players: usize,

    /// Length of a game, in clock periods (seconds by default).
    pub game_duration_secs: u32,

    /// Length of one clock period. Only tests shorten this.
    pub tick_period: Duration,

    /// Capacity of each room actor's command channel.
    pub command_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 6,
            game_duration_secs: 180,
            tick_period: Duration::from_secs(1),
            command_buffer: 64,
        }
    }
}

impl RoomConfig {
    /// Clock settings derived from this config.
    pub fn clock_config(&self) -> ClockConfig {
        ClockConfig {
            period: self.tick_period,
        }
    }
}

// ---------------------------------------------------------------------------
// MatchmakingConfig
// ---------------------------------------------------------------------------

/// Configuration for the matchmaking queue.
#[derive(Debug, Clone)]
pub struct MatchmakingConfig {
    /// How many queued players make up one match.
    pub match_size: usize,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self { match_size: 2 }
    }
}
