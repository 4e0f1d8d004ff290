//! Server configuration.

use std::time::Duration;

use typeclaim_room::{MatchmakingConfig, RoomConfig};

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// How often each connection is pinged.
    pub ping_interval: Duration,
    /// A connection that sends no frame at all for this long, pongs
    /// included, is treated as dead and dropped.
    pub idle_timeout: Duration,
    pub room: RoomConfig,
    pub matchmaking: MatchmakingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            ping_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
            room: RoomConfig::default(),
            matchmaking: MatchmakingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads overrides from the process environment on top of the
    /// defaults.
    ///
    /// | variable | field |
    /// |---|---|
    /// | `TYPECLAIM_BIND` | `bind_addr` |
    /// | `TYPECLAIM_GAME_SECS` | `room.game_duration_secs` |
    /// | `TYPECLAIM_MATCH_SIZE` | `matchmaking.match_size` |
    /// | `TYPECLAIM_PING_INTERVAL_SECS` | `ping_interval` |
    /// | `TYPECLAIM_IDLE_TIMEOUT_SECS` | `idle_timeout` |
    ///
    /// Unparseable or out-of-range values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("TYPECLAIM_BIND") {
            if addr.trim().is_empty() {
                tracing::warn!("TYPECLAIM_BIND is empty, using default");
            } else {
                config.bind_addr = addr.trim().to_string();
            }
        }

        if let Some(secs) = parse_in_range::<u32>(&lookup, "TYPECLAIM_GAME_SECS", 1, 3600) {
            config.room.game_duration_secs = secs;
        }

        if let Some(size) = parse_in_range::<usize>(
            &lookup,
            "TYPECLAIM_MATCH_SIZE",
            2,
            config.room.max_players,
        ) {
            config.matchmaking.match_size = size;
        }

        if let Some(secs) = parse_in_range::<u64>(&lookup, "TYPECLAIM_PING_INTERVAL_SECS", 1, 3600)
        {
            config.ping_interval = Duration::from_secs(secs);
        }

        if let Some(secs) = parse_in_range::<u64>(&lookup, "TYPECLAIM_IDLE_TIMEOUT_SECS", 1, 86_400)
        {
            config.idle_timeout = Duration::from_secs(secs);
        }

        if config.idle_timeout <= config.ping_interval {
            tracing::warn!(
                ping_interval = ?config.ping_interval,
                idle_timeout = ?config.idle_timeout,
                "idle timeout should exceed the ping interval, live peers may be dropped"
            );
        }

        config
    }
}

fn parse_in_range<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    min: T,
    max: T,
) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) if value >= min && value <= max => Some(value),
        Ok(_) => {
            tracing::warn!("{key} must be {min}-{max}, using default");
            None
        }
        Err(_) => {
            tracing::warn!("Invalid {key} '{raw}', using default");
            None
        }
    }
}
