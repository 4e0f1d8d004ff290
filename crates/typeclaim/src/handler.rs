//! Per-connection handler: decode events and route them.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Spawn a writer task that drains the player's outbound channel
//!   2. Loop: receive frames → decode `ClientEvent` → dispatch, pinging
//!      the peer on a fixed interval in between
//!   3. On exit, leave the room and the matchmaking queue
//!
//! A player may stay silent indefinitely (queued, or waiting in a lobby)
//! as long as their socket answers pings. Only a peer that sends no frame
//! at all for `idle_timeout` is dropped.
//!
//! Rooms and the handler share one outbound channel per player, so
//! error replies and room broadcasts reach the client in the order they
//! were produced.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use typeclaim_protocol::{ClientEvent, Codec, PlayerId, ServerEvent};
use typeclaim_room::{PlayerSender, RoomError};
use typeclaim_transport::{Connection, WebSocketConnection};

use crate::TypeclaimError;
use crate::server::ServerState;

/// Drop guard that cleans up after a player when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async locks.
struct DisconnectGuard<C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<C>>,
    writer: tokio::task::JoinHandle<()>,
}

impl<C: Codec> Drop for DisconnectGuard<C> {
    fn drop(&mut self) {
        self.writer.abort();
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.disconnect(player_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), TypeclaimError> {
    let conn = Arc::new(conn);
    let player_id = PlayerId(conn.id().into_inner());
    tracing::debug!(conn_id = %conn.id(), %player_id, "handling new connection");

    let (sender, outbound) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&state), outbound));
    let _guard = DisconnectGuard {
        player_id,
        state: Arc::clone(&state),
        writer,
    };

    let mut keepalive = tokio::time::interval(state.ping_interval);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    keepalive.tick().await;

    loop {
        let frame = tokio::select! {
            frame = conn.recv() => frame,
            _ = keepalive.tick() => {
                if conn.idle_for() >= state.idle_timeout {
                    tracing::info!(%player_id, "peer stopped answering, dropping connection");
                    break;
                }
                if let Err(e) = conn.ping().await {
                    tracing::debug!(%player_id, error = %e, "ping failed");
                    break;
                }
                continue;
            }
        };

        let data = match frame {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "failed to decode event");
                send_error(&sender, format!("Invalid message: {e}"));
                continue;
            }
        };

        dispatch(&state, player_id, &sender, event).await;
    }

    // _guard drops here → room leave and queue cancel fire.
    let _ = conn.close().await;
    Ok(())
}

/// Routes one client event.
async fn dispatch<C: Codec>(
    state: &ServerState<C>,
    player_id: PlayerId,
    sender: &PlayerSender,
    event: ClientEvent,
) {
    match event {
        ClientEvent::CreateGame { player_name } => {
            if let Err(e) = state.create_game(player_id, &player_name, sender).await {
                reject(sender, player_id, e);
            }
        }

        ClientEvent::JoinGame {
            game_id,
            player_name,
        } => {
            if let Err(e) = state
                .join_game(player_id, &game_id, &player_name, sender)
                .await
            {
                reject(sender, player_id, e);
            }
        }

        ClientEvent::StartGame { game_id } => {
            if let Some(room) = state.current_room(player_id, &game_id).await {
                forward(state, room.start(player_id).await).await;
            }
        }

        ClientEvent::SelectTerritory {
            game_id,
            territory_id,
        } => {
            if let Some(room) = state.current_room(player_id, &game_id).await {
                forward(state, room.select(player_id, territory_id).await).await;
            }
        }

        ClientEvent::ClaimTerritory {
            game_id,
            territory_id,
            typing_speed,
        } => {
            if let Some(room) = state.current_room(player_id, &game_id).await {
                forward(state, room.claim(player_id, territory_id, typing_speed).await).await;
            }
        }

        ClientEvent::LeaveGame { game_id } => {
            state.leave_game(player_id, &game_id).await;
        }

        ClientEvent::FindMatch { player_name } => {
            if let Err(e) = state.find_match(player_id, &player_name, sender).await {
                reject(sender, player_id, e);
            }
        }

        ClientEvent::CancelMatchmaking => {
            state.cancel_match(player_id).await;
        }
    }
}

/// Handles the result of a fire-and-forget room command. The only
/// failure is a dead actor, which is forgotten.
async fn forward<C: Codec>(state: &ServerState<C>, result: Result<(), RoomError>) {
    if let Err(RoomError::Unavailable(code)) = result {
        tracing::warn!(room = %code, "room actor gone, removing");
        state.registry.lock().await.destroy_room(&code);
    }
}

/// Reports a refused request to the requesting player only. Anything
/// that is not an admission refusal reads as a missing game.
fn reject(sender: &PlayerSender, player_id: PlayerId, error: RoomError) {
    let message = if error.is_admission() {
        tracing::debug!(%player_id, %error, "request rejected");
        error.to_string()
    } else {
        tracing::warn!(%player_id, %error, "request failed");
        RoomError::NotFound(String::new()).to_string()
    };
    send_error(sender, message);
}

fn send_error(sender: &PlayerSender, message: impl Into<String>) {
    let _ = sender.send(ServerEvent::error(message));
}

/// Encodes and writes outbound events until the channel closes or the
/// socket fails.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut outbound: mpsc::UnboundedReceiver<ServerEvent>,
) {
    while let Some(event) = outbound.recv().await {
        let bytes = match state.codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(conn_id = %conn.id(), error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
            break;
        }
    }
}
