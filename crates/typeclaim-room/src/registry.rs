//! Room registry: allocates room codes, tracks live rooms, and remembers
//! which room each player is in.
//!
//! Every method is synchronous. The server keeps the registry behind a
//! lock and must not hold that lock while awaiting a room: clone the
//! [`RoomHandle`], release the lock, then talk to the room.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use typeclaim_protocol::{PlayerId, RoomCode};

use crate::actor::spawn_room;
use crate::{RoomConfig, RoomError, RoomHandle};

/// Draws one random code. May collide with a live room.
pub fn random_room_code<R: Rng>(rng: &mut R) -> Option<RoomCode> {
    let alphabet = RoomCode::ALPHABET;
    let candidate: String = (0..RoomCode::LEN)
        .map(|_| char::from(alphabet[rng.random_range(0..alphabet.len())]))
        .collect();
    RoomCode::parse(&candidate)
}

/// All live rooms, plus the player → room index.
///
/// A player is in at most one room at a time.
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, RoomHandle>,
    player_rooms: HashMap<PlayerId, RoomCode>,
    config: RoomConfig,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Creates a waiting room under a fresh code and spawns its actor.
    pub fn create_room(&mut self) -> RoomHandle {
        self.create_room_with(&mut rand::rng())
    }

    /// [`create_room`](Self::create_room) with a caller-supplied RNG.
    ///
    /// A code that is already live is not an error; another one is drawn.
    pub fn create_room_with<R: Rng>(&mut self, rng: &mut R) -> RoomHandle {
        let code = loop {
            match random_room_code(rng) {
                Some(code) if !self.rooms.contains_key(&code) => break code,
                Some(code) => tracing::debug!(%code, "room code collision, drawing again"),
                None => {}
            }
        };

        let handle = spawn_room(code.clone(), self.config.clone());
        self.rooms.insert(code.clone(), handle.clone());
        tracing::info!(room = %code, rooms = self.rooms.len(), "room created");
        handle
    }

    /// Looks up a room by a code as the user typed it.
    pub fn get(&self, code: &str) -> Result<RoomHandle, RoomError> {
        RoomCode::parse(code)
            .and_then(|parsed| self.rooms.get(&parsed))
            .cloned()
            .ok_or_else(|| RoomError::NotFound(code.trim().to_string()))
    }

    pub fn handle(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.get(code).cloned()
    }

    /// Forgets a room and everyone bound to it, and asks its actor to
    /// stop. Unknown codes are a no-op.
    pub fn destroy_room(&mut self, code: &RoomCode) -> Option<RoomHandle> {
        let handle = self.rooms.remove(code)?;
        self.player_rooms.retain(|_, room| room != code);
        handle.request_shutdown();
        tracing::info!(room = %code, rooms = self.rooms.len(), "room destroyed");
        Some(handle)
    }

    /// Records that `player_id` is now in `code`. Refused, returning
    /// `false`, when the room is no longer registered.
    pub fn bind_player(&mut self, player_id: PlayerId, code: RoomCode) -> bool {
        if !self.rooms.contains_key(&code) {
            tracing::debug!(%player_id, room = %code, "room already destroyed, not binding");
            return false;
        }
        if let Some(previous) = self.player_rooms.insert(player_id, code) {
            tracing::warn!(%player_id, room = %previous, "player was still bound to another room");
        }
        true
    }

    pub fn unbind_player(&mut self, player_id: PlayerId) -> Option<RoomCode> {
        self.player_rooms.remove(&player_id)
    }

    pub fn player_room(&self, player_id: PlayerId) -> Option<&RoomCode> {
        self.player_rooms.get(&player_id)
    }

    /// Rooms created at least `max_age` ago. Nothing is removed; the
    /// caller decides what to do with them.
    pub fn stale_rooms(&self, max_age: Duration) -> Vec<RoomCode> {
        self.rooms
            .values()
            .filter(|handle| handle.created_at().elapsed() >= max_age)
            .map(|handle| handle.code().clone())
            .collect()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
