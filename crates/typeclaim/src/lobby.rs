//! Membership operations: creating, joining and leaving rooms, and
//! matchmaking.
//!
//! Lock order is always matchmaking queue, then registry. The registry
//! lock is never held across an await on a room; handles are cloned out
//! first.

use typeclaim_protocol::{Codec, PlayerId, RoomCode, ServerEvent};
use typeclaim_room::{PlayerSender, QueuedPlayer, RoomError, RoomHandle, validate_player_name};

use crate::server::ServerState;

impl<C: Codec> ServerState<C> {
    /// Opens a room with the player as host. Any room the player was in
    /// is left first.
    pub(crate) async fn create_game(
        &self,
        player_id: PlayerId,
        name: &str,
        sender: &PlayerSender,
    ) -> Result<RoomCode, RoomError> {
        let name = validate_player_name(name)?;
        self.matchmaking.lock().await.cancel(player_id);
        self.leave_current(player_id).await;

        let handle = self.registry.lock().await.create_room();
        if let Err(e) = self.enter(&handle, player_id, &name, sender.clone()).await {
            self.registry.lock().await.destroy_room(handle.code());
            return Err(e);
        }
        Ok(handle.code().clone())
    }

    /// Joins the room `code` as typed by the player.
    ///
    /// The target is looked up before the current room is left, so a
    /// mistyped code does not cost the player their seat.
    pub(crate) async fn join_game(
        &self,
        player_id: PlayerId,
        code: &str,
        name: &str,
        sender: &PlayerSender,
    ) -> Result<RoomCode, RoomError> {
        self.matchmaking.lock().await.cancel(player_id);

        let handle = {
            let registry = self.registry.lock().await;
            let handle = registry.get(code)?;
            if registry.player_room(player_id) == Some(handle.code()) {
                return Err(RoomError::AlreadyInRoom(player_id, handle.code().clone()));
            }
            handle
        };

        self.leave_current(player_id).await;
        self.enter(&handle, player_id, name, sender.clone()).await?;
        Ok(handle.code().clone())
    }

    /// Leaves whatever room the player is in. Safe to call when they are
    /// in none.
    pub(crate) async fn leave_current(&self, player_id: PlayerId) {
        let (code, handle) = {
            let mut registry = self.registry.lock().await;
            let Some(code) = registry.unbind_player(player_id) else {
                return;
            };
            let handle = registry.handle(&code);
            (code, handle)
        };
        let Some(handle) = handle else {
            return;
        };

        match handle.leave(player_id).await {
            Ok(outcome) if outcome.closed => {
                self.registry.lock().await.destroy_room(&code);
            }
            Ok(_) => {}
            Err(RoomError::Unavailable(_)) => {
                tracing::warn!(room = %code, %player_id, "room actor gone during leave");
                self.registry.lock().await.destroy_room(&code);
            }
            Err(e) => {
                tracing::debug!(room = %code, %player_id, error = %e, "leave failed");
            }
        }
    }

    /// Handles `leaveGame`. Dropped unless `game_id` names the room the
    /// player is actually in.
    pub(crate) async fn leave_game(&self, player_id: PlayerId, game_id: &str) {
        if self.current_room(player_id, game_id).await.is_some() {
            self.leave_current(player_id).await;
        }
    }

    /// The player's room handle, if `game_id` matches the room they are
    /// in. Anything else is a stale reference.
    pub(crate) async fn current_room(
        &self,
        player_id: PlayerId,
        game_id: &str,
    ) -> Option<RoomHandle> {
        let registry = self.registry.lock().await;
        let code = registry.player_room(player_id)?;
        if RoomCode::parse(game_id).as_ref() != Some(code) {
            tracing::debug!(%player_id, room = %code, game_id, "event for another room, dropping");
            return None;
        }
        registry.handle(code)
    }

    /// Queues the player for a match and, if a group is ready, starts it.
    /// The player is told how many are waiting.
    pub(crate) async fn find_match(
        &self,
        player_id: PlayerId,
        name: &str,
        sender: &PlayerSender,
    ) -> Result<(), RoomError> {
        let name = validate_player_name(name)?;
        self.leave_current(player_id).await;

        let mut queue = self.matchmaking.lock().await;
        let waiting = queue.enqueue(player_id, &name, sender.clone())?;
        let _ = sender.send(ServerEvent::MatchmakingStatus {
            players_waiting: waiting,
        });

        // The queue stays locked until every member is bound, so nobody
        // in the group can create or join elsewhere halfway through.
        if let Some(group) = queue.take_match() {
            self.start_match(group).await;
        }
        Ok(())
    }

    pub(crate) async fn cancel_match(&self, player_id: PlayerId) {
        self.matchmaking.lock().await.cancel(player_id);
    }

    /// Everything that has to happen when a connection goes away.
    pub(crate) async fn disconnect(&self, player_id: PlayerId) {
        self.matchmaking.lock().await.cancel(player_id);
        self.leave_current(player_id).await;
        tracing::info!(%player_id, "player disconnected");
    }

    /// Creates a room for a formed group and joins its members in queue
    /// order, which makes the first one host.
    async fn start_match(&self, group: Vec<QueuedPlayer>) {
        let handle = self.registry.lock().await.create_room();
        tracing::info!(room = %handle.code(), players = group.len(), "starting matched room");

        for entry in group {
            let result = self
                .enter(&handle, entry.player_id, &entry.name, entry.sender.clone())
                .await;
            if let Err(e) = result {
                tracing::warn!(
                    room = %handle.code(),
                    player_id = %entry.player_id,
                    error = %e,
                    "matched player could not join"
                );
                let _ = entry.sender.send(ServerEvent::error(e.to_string()));
            }
        }
    }

    /// Joins `handle` and records the binding. A dead room is forgotten
    /// and reported as not found.
    ///
    /// The room may close between the join reply and the binding (its
    /// host left). The player has then already been told the game ended,
    /// so the join still counts as done and nothing is bound.
    async fn enter(
        &self,
        handle: &RoomHandle,
        player_id: PlayerId,
        name: &str,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        match handle.join(player_id, name, sender).await {
            Ok(_) => {
                self.registry
                    .lock()
                    .await
                    .bind_player(player_id, handle.code().clone());
                Ok(())
            }
            Err(RoomError::Unavailable(code)) => {
                self.registry.lock().await.destroy_room(&code);
                Err(RoomError::NotFound(code.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}
