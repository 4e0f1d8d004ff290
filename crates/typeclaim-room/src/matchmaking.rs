//! Matchmaking queue: players waiting to be grouped into a new room.
//!
//! The queue only decides *who* plays together. Creating the room and
//! joining the group into it is the caller's job, done in queue order
//! so the first player queued becomes host.

use std::collections::{HashSet, VecDeque};

use typeclaim_protocol::PlayerId;

use crate::state::validate_player_name;
use crate::{MatchmakingConfig, PlayerSender, RoomError};

/// A player waiting for a match.
#[derive(Debug, Clone)]
pub struct QueuedPlayer {
    pub player_id: PlayerId,
    /// Already trimmed and length-checked.
    pub name: String,
    /// Where the room should deliver this player's events once matched.
    pub sender: PlayerSender,
}

/// FIFO of players waiting for a match.
pub struct MatchmakingQueue {
    queue: VecDeque<QueuedPlayer>,
    config: MatchmakingConfig,
}

impl MatchmakingQueue {
    pub fn new(config: MatchmakingConfig) -> Self {
        if config.match_size < 2 {
            tracing::warn!(match_size = config.match_size, "match size below 2, matches will be solo");
        }
        Self {
            queue: VecDeque::new(),
            config,
        }
    }

    /// Adds a player to the back of the queue and returns how many are
    /// waiting.
    ///
    /// Queuing twice is a no-op: the player keeps their place and their
    /// original name.
    pub fn enqueue(
        &mut self,
        player_id: PlayerId,
        name: &str,
        sender: PlayerSender,
    ) -> Result<usize, RoomError> {
        let name = validate_player_name(name)?;
        if self.contains(player_id) {
            tracing::debug!(%player_id, "already queued");
            return Ok(self.queue.len());
        }
        self.queue.push_back(QueuedPlayer {
            player_id,
            name,
            sender,
        });
        tracing::info!(%player_id, waiting = self.queue.len(), "player queued for match");
        Ok(self.queue.len())
    }

    /// Removes a player from the queue. Returns `true` if they were in it.
    pub fn cancel(&mut self, player_id: PlayerId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|entry| entry.player_id != player_id);
        let removed = self.queue.len() != before;
        if removed {
            tracing::info!(%player_id, waiting = self.queue.len(), "player left match queue");
        }
        removed
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.queue.iter().any(|entry| entry.player_id == player_id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Takes the next group, if one can be formed.
    ///
    /// Walks the queue front to back, picking players whose names differ
    /// (ignoring case) from everyone already picked. Skipped players keep
    /// their place for the next group. The returned group is in queue
    /// order.
    pub fn take_match(&mut self) -> Option<Vec<QueuedPlayer>> {
        let size = self.config.match_size.max(1);
        let mut names = HashSet::new();
        let mut picked = Vec::with_capacity(size);

        for (index, entry) in self.queue.iter().enumerate() {
            if names.insert(entry.name.to_lowercase()) {
                picked.push(index);
                if picked.len() == size {
                    break;
                }
            }
        }
        if picked.len() < size {
            return None;
        }

        // Remove back to front so earlier indices stay valid.
        let mut group: Vec<QueuedPlayer> = picked
            .iter()
            .rev()
            .filter_map(|&index| self.queue.remove(index))
            .collect();
        group.reverse();

        tracing::info!(
            players = group.len(),
            waiting = self.queue.len(),
            "match formed"
        );
        Some(group)
    }
}

impl Default for MatchmakingQueue {
    fn default() -> Self {
        Self::new(MatchmakingConfig::default())
    }
}
