//! End-to-end tests: a real server on a random port, driven by
//! tokio-tungstenite clients speaking JSON events.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;
use typeclaim::prelude::*;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(3);

/// Starts a server on a random port and returns the address.
async fn start_server_with(config: ServerConfig) -> String {
    let server = TypeclaimServer::builder()
        .config(config)
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn start_server() -> String {
    start_server_with(ServerConfig::default()).await
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data });
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .expect("send");
}

/// Next event from the server, as `{"event": ..., "data": ...}`.
async fn next_event(ws: &mut ClientWs) -> Value {
    loop {
        let msg = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("recv error");
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).expect("server sent JSON"),
            Message::Binary(bytes) => return serde_json::from_slice(&bytes).expect("server sent JSON"),
            _ => continue,
        }
    }
}

/// Reads events until one named `name` arrives; returns its payload.
async fn expect_event(ws: &mut ClientWs, name: &str) -> Value {
    for _ in 0..50 {
        let event = next_event(ws).await;
        if event["event"] == name {
            return event["data"].clone();
        }
    }
    panic!("never received {name}");
}

/// Asserts the very next event is `name`; returns its payload.
async fn expect_next(ws: &mut ClientWs, name: &str) -> Value {
    let event = next_event(ws).await;
    assert_eq!(event["event"], name, "unexpected event {event}");
    event["data"].clone()
}

/// Keeps reading for `dur`, as a browser tab does, and asserts no event
/// arrives. Pings are answered by the client library along the way.
async fn stay_quiet(ws: &mut ClientWs, dur: Duration) {
    let result = tokio::time::timeout(dur, next_event(ws)).await;
    assert!(result.is_err(), "expected silence, got {result:?}");
}

async fn expect_silence(ws: &mut ClientWs) {
    stay_quiet(ws, Duration::from_millis(200)).await;
}

/// Fast keepalive: pings every 100 ms, dead after 400 ms without a frame.
fn keepalive_config() -> ServerConfig {
    ServerConfig {
        ping_interval: Duration::from_millis(100),
        idle_timeout: Duration::from_millis(400),
        ..ServerConfig::default()
    }
}

/// Host creates a room; returns the host socket and the room code.
async fn create(addr: &str, name: &str) -> (ClientWs, String) {
    let mut ws = connect(addr).await;
    send(&mut ws, "createGame", json!({ "playerName": name })).await;
    let data = expect_next(&mut ws, "gameCreated").await;
    let code = data["gameId"].as_str().expect("gameId").to_string();
    (ws, code)
}

async fn join(addr: &str, code: &str, name: &str) -> ClientWs {
    let mut ws = connect(addr).await;
    send(&mut ws, "joinGame", json!({ "gameId": code, "playerName": name })).await;
    expect_next(&mut ws, "gameJoined").await;
    ws
}

// =========================================================================
// Create and join
// =========================================================================

#[tokio::test]
async fn test_create_game_returns_code_and_host() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    send(&mut ws, "createGame", json!({ "playerName": "  Ada " })).await;

    let data = expect_next(&mut ws, "gameCreated").await;
    let code = data["gameId"].as_str().unwrap();
    assert_eq!(code.len(), 6);
    assert!(RoomCode::parse(code).is_some());
    assert_eq!(data["player"]["name"], "Ada");
    assert_eq!(data["player"]["isHost"], true);
    assert_eq!(data["player"]["color"], "#e74c3c");
    assert_eq!(data["game"]["status"], "waiting");
    assert_eq!(data["game"]["territories"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_join_game_lowercase_code_notifies_host() {
    let addr = start_server().await;
    let (mut host, code) = create(&addr, "Ada").await;

    let mut guest = connect(&addr).await;
    send(
        &mut guest,
        "joinGame",
        json!({ "gameId": code.to_lowercase(), "playerName": "Bo" }),
    )
    .await;
    let joined = expect_next(&mut guest, "gameJoined").await;
    assert_eq!(joined["gameId"], code.as_str());
    assert_eq!(joined["player"]["isHost"], false);
    assert_eq!(joined["game"]["players"].as_array().unwrap().len(), 2);

    let notice = expect_next(&mut host, "playerJoined").await;
    assert_eq!(notice["player"]["name"], "Bo");
    assert_eq!(notice["players"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_join_game_unknown_code_error() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    send(&mut ws, "joinGame", json!({ "gameId": "ZZZZZZ", "playerName": "Ada" })).await;
    let error = expect_next(&mut ws, "error").await;
    assert_eq!(error["message"], "Game not found");
}

#[tokio::test]
async fn test_join_game_duplicate_name_error_only_to_requester() {
    let addr = start_server().await;
    let (mut host, code) = create(&addr, "Alice").await;

    let mut other = connect(&addr).await;
    send(&mut other, "joinGame", json!({ "gameId": code, "playerName": "alice" })).await;
    let error = expect_next(&mut other, "error").await;
    assert!(error["message"].as_str().unwrap().contains("already taken"));
    expect_silence(&mut host).await;
}

#[tokio::test]
async fn test_join_game_full_room_error() {
    let addr = start_server().await;
    let (_host, code) = create(&addr, "A").await;
    let mut guests = Vec::new();
    for name in ["B", "C", "D", "E", "F"] {
        guests.push(join(&addr, &code, name).await);
    }

    let mut seventh = connect(&addr).await;
    send(&mut seventh, "joinGame", json!({ "gameId": code, "playerName": "G" })).await;
    let error = expect_next(&mut seventh, "error").await;
    assert_eq!(error["message"], "Game is full");
}

#[tokio::test]
async fn test_join_game_own_room_again_error() {
    let addr = start_server().await;
    let (mut host, code) = create(&addr, "Ada").await;
    send(&mut host, "joinGame", json!({ "gameId": code, "playerName": "Ada" })).await;
    let error = expect_next(&mut host, "error").await;
    assert_eq!(error["message"], format!("You are already in game {code}"));
}

#[tokio::test]
async fn test_create_game_empty_name_error() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    send(&mut ws, "createGame", json!({ "playerName": "   " })).await;
    let error = expect_next(&mut ws, "error").await;
    assert!(error["message"].as_str().unwrap().starts_with("Name must be"));
}

#[tokio::test]
async fn test_invalid_frame_reports_error_and_keeps_connection() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::Text("not json".to_string().into())).await.expect("send");
    let error = expect_next(&mut ws, "error").await;
    assert!(error["message"].as_str().unwrap().starts_with("Invalid message"));

    send(&mut ws, "createGame", json!({ "playerName": "Ada" })).await;
    expect_next(&mut ws, "gameCreated").await;
}

// =========================================================================
// Playing
// =========================================================================

#[tokio::test]
async fn test_start_game_non_host_ignored_host_starts() {
    let addr = start_server().await;
    let (mut host, code) = create(&addr, "Ada").await;
    let mut guest = join(&addr, &code, "Bo").await;
    expect_next(&mut host, "playerJoined").await;

    send(&mut guest, "startGame", json!({ "gameId": code })).await;
    expect_silence(&mut host).await;

    send(&mut host, "startGame", json!({ "gameId": code })).await;
    let started = expect_next(&mut host, "gameStarted").await;
    assert_eq!(started["game"]["status"], "playing");
    assert_eq!(started["game"]["timeRemaining"], 180);
    expect_next(&mut guest, "gameStarted").await;
}

#[tokio::test]
async fn test_start_game_wrong_code_dropped() {
    let addr = start_server().await;
    let (mut host, _code) = create(&addr, "Ada").await;
    send(&mut host, "startGame", json!({ "gameId": "ZZZZZZ" })).await;
    expect_silence(&mut host).await;
}

#[tokio::test]
async fn test_claim_territory_first_claim_wins() {
    let addr = start_server().await;
    let (mut host, code) = create(&addr, "Ada").await;
    let mut guest = join(&addr, &code, "Bo").await;
    expect_next(&mut host, "playerJoined").await;
    send(&mut host, "startGame", json!({ "gameId": code })).await;
    expect_next(&mut host, "gameStarted").await;
    expect_next(&mut guest, "gameStarted").await;

    send(
        &mut guest,
        "claimTerritory",
        json!({ "gameId": code, "territoryId": "asia", "typingSpeed": 240.4 }),
    )
    .await;
    let claimed = expect_event(&mut host, "territoryClaimed").await;
    assert_eq!(claimed["territoryId"], "asia");
    assert_eq!(claimed["playerName"], "Bo");
    assert_eq!(claimed["playerColor"], "#3498db");
    let bo = &claimed["players"][1];
    assert_eq!(bo["score"], 1);
    assert_eq!(bo["typingSpeeds"], json!([240]));
    assert_eq!(bo["avgTypingSpeed"], 240);
    expect_event(&mut guest, "territoryClaimed").await;

    // A late claim on the same territory is a silent no-op.
    send(
        &mut host,
        "claimTerritory",
        json!({ "gameId": code, "territoryId": "asia", "typingSpeed": 500 }),
    )
    .await;
    send(
        &mut host,
        "selectTerritory",
        json!({ "gameId": code, "territoryId": "europe" }),
    )
    .await;
    let next = expect_next(&mut host, "territorySelected").await;
    assert_eq!(next["territoryId"], "europe");
    let attempt = expect_event(&mut guest, "territoryAttempt").await;
    assert_eq!(attempt["playerName"], "Ada");
}

#[tokio::test]
async fn test_timer_counts_down_to_time_up() {
    let mut config = ServerConfig::default();
    config.room = RoomConfig {
        game_duration_secs: 2,
        tick_period: Duration::from_millis(150),
        ..RoomConfig::default()
    };
    let addr = start_server_with(config).await;
    let (mut host, code) = create(&addr, "Ada").await;
    let mut guest = join(&addr, &code, "Bo").await;
    expect_next(&mut host, "playerJoined").await;

    send(&mut host, "startGame", json!({ "gameId": code })).await;
    expect_next(&mut guest, "gameStarted").await;
    send(
        &mut guest,
        "claimTerritory",
        json!({ "gameId": code, "territoryId": "africa", "typingSpeed": 100 }),
    )
    .await;

    let mut timer = Vec::new();
    let mut claimed = false;
    let over = loop {
        let event = next_event(&mut guest).await;
        match event["event"].as_str() {
            Some("timerUpdate") => timer.push(event["data"]["timeRemaining"].clone()),
            Some("territoryClaimed") => claimed = true,
            Some("gameOver") => break event["data"].clone(),
            other => panic!("unexpected event {other:?}"),
        }
    };
    assert!(claimed);
    assert_eq!(timer, vec![json!(1), json!(0)]);
    assert_eq!(over["reason"], "timeUp");
    assert_eq!(over["players"][0]["name"], "Bo");
    assert_eq!(over["players"][1]["name"], "Ada");
    expect_silence(&mut guest).await;
}

// =========================================================================
// Leaving and disconnects
// =========================================================================

#[tokio::test]
async fn test_host_disconnect_while_waiting_ends_game() {
    let addr = start_server().await;
    let (host, code) = create(&addr, "Ada").await;
    let mut guest = join(&addr, &code, "Bo").await;

    drop(host);
    let ended = expect_next(&mut guest, "gameEnded").await;
    assert_eq!(ended["reason"], "hostLeft");

    let mut late = connect(&addr).await;
    send(&mut late, "joinGame", json!({ "gameId": code, "playerName": "Cy" })).await;
    let error = expect_next(&mut late, "error").await;
    assert_eq!(error["message"], "Game not found");
}

#[tokio::test]
async fn test_host_disconnect_mid_game_promotes_then_opponents_left() {
    let addr = start_server().await;
    let (mut host, code) = create(&addr, "A").await;
    let mut b = join(&addr, &code, "B").await;
    let mut c = join(&addr, &code, "C").await;
    send(&mut host, "startGame", json!({ "gameId": code })).await;
    expect_event(&mut b, "gameStarted").await;
    expect_event(&mut c, "gameStarted").await;

    drop(host);
    let left = expect_event(&mut c, "playerLeft").await;
    assert_eq!(left["playerName"], "A");
    let new_host = expect_next(&mut c, "newHost").await;
    assert_eq!(new_host["playerName"], "B");

    drop(b);
    expect_event(&mut c, "playerLeft").await;
    let promoted = expect_next(&mut c, "newHost").await;
    assert_eq!(promoted["playerName"], "C");
    let over = expect_next(&mut c, "gameOver").await;
    assert_eq!(over["reason"], "opponentsLeft");
    assert_eq!(over["players"].as_array().unwrap().len(), 1);
    assert_eq!(over["players"][0]["name"], "C");
}

#[tokio::test]
async fn test_leave_game_notifies_others() {
    let addr = start_server().await;
    let (mut host, code) = create(&addr, "Ada").await;
    let mut guest = join(&addr, &code, "Bo").await;
    expect_next(&mut host, "playerJoined").await;

    send(&mut guest, "leaveGame", json!({ "gameId": code })).await;
    let left = expect_next(&mut host, "playerLeft").await;
    assert_eq!(left["playerName"], "Bo");
    assert_eq!(left["players"].as_array().unwrap().len(), 1);

    // The same connection can join again afterwards.
    send(&mut guest, "joinGame", json!({ "gameId": code, "playerName": "Bo" })).await;
    expect_next(&mut guest, "gameJoined").await;
}

#[tokio::test]
async fn test_create_game_while_in_room_leaves_previous() {
    let addr = start_server().await;
    let (mut host, code) = create(&addr, "Ada").await;
    let mut guest = join(&addr, &code, "Bo").await;
    expect_next(&mut host, "playerJoined").await;

    send(&mut guest, "createGame", json!({ "playerName": "Bo" })).await;
    let created = expect_next(&mut guest, "gameCreated").await;
    assert_ne!(created["gameId"], code.as_str());
    let left = expect_next(&mut host, "playerLeft").await;
    assert_eq!(left["playerName"], "Bo");
}

// =========================================================================
// Keepalive
// =========================================================================

#[tokio::test]
async fn test_quiet_lobby_outlives_idle_timeout() {
    let addr = start_server_with(keepalive_config()).await;
    let (mut host, code) = create(&addr, "Ada").await;
    let mut guest = join(&addr, &code, "Bo").await;
    expect_next(&mut host, "playerJoined").await;

    // Both wait for friends, sending nothing, for twice the idle timeout.
    tokio::join!(
        stay_quiet(&mut host, Duration::from_millis(900)),
        stay_quiet(&mut guest, Duration::from_millis(900)),
    );

    let _late = join(&addr, &code, "Cy").await;
    let notice = expect_next(&mut host, "playerJoined").await;
    assert_eq!(notice["players"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_unresponsive_client_leaves_queue() {
    let addr = start_server_with(keepalive_config()).await;
    let mut ada = connect(&addr).await;
    send(&mut ada, "findMatch", json!({ "playerName": "Ada" })).await;
    expect_next(&mut ada, "matchmakingStatus").await;

    // Never polled, so the server's pings go unanswered.
    tokio::time::sleep(Duration::from_millis(900)).await;

    let mut bo = connect(&addr).await;
    send(&mut bo, "findMatch", json!({ "playerName": "Bo" })).await;
    let status = expect_next(&mut bo, "matchmakingStatus").await;
    assert_eq!(status["playersWaiting"], 1);
}

// =========================================================================
// Matchmaking
// =========================================================================

#[tokio::test]
async fn test_find_match_quiet_player_still_matched() {
    let addr = start_server_with(keepalive_config()).await;
    let mut ada = connect(&addr).await;
    send(&mut ada, "findMatch", json!({ "playerName": "Ada" })).await;
    expect_next(&mut ada, "matchmakingStatus").await;

    stay_quiet(&mut ada, Duration::from_millis(900)).await;

    let mut bo = connect(&addr).await;
    send(&mut bo, "findMatch", json!({ "playerName": "Bo" })).await;
    let status = expect_next(&mut bo, "matchmakingStatus").await;
    assert_eq!(status["playersWaiting"], 2);
    let created = expect_next(&mut ada, "gameCreated").await;
    assert_eq!(created["player"]["name"], "Ada");
    expect_next(&mut bo, "gameJoined").await;
}

#[tokio::test]
async fn test_find_match_pairs_two_players() {
    let addr = start_server().await;
    let mut first = connect(&addr).await;
    let mut second = connect(&addr).await;

    send(&mut first, "findMatch", json!({ "playerName": "Ada" })).await;
    let status = expect_next(&mut first, "matchmakingStatus").await;
    assert_eq!(status["playersWaiting"], 1);

    send(&mut second, "findMatch", json!({ "playerName": "Bo" })).await;
    let status = expect_next(&mut second, "matchmakingStatus").await;
    assert_eq!(status["playersWaiting"], 2);

    let created = expect_next(&mut first, "gameCreated").await;
    assert_eq!(created["player"]["isHost"], true);
    let joined = expect_next(&mut second, "gameJoined").await;
    assert_eq!(joined["gameId"], created["gameId"]);
    expect_next(&mut first, "playerJoined").await;

    // The matched host can start the game.
    let code = created["gameId"].as_str().unwrap().to_string();
    send(&mut first, "startGame", json!({ "gameId": code })).await;
    expect_next(&mut second, "gameStarted").await;
}

#[tokio::test]
async fn test_find_match_twice_is_idempotent() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    send(&mut ws, "findMatch", json!({ "playerName": "Ada" })).await;
    expect_next(&mut ws, "matchmakingStatus").await;
    send(&mut ws, "findMatch", json!({ "playerName": "Ada" })).await;
    let status = expect_next(&mut ws, "matchmakingStatus").await;
    assert_eq!(status["playersWaiting"], 1);
    expect_silence(&mut ws).await;
}

#[tokio::test]
async fn test_cancel_matchmaking_removes_from_queue() {
    let addr = start_server().await;
    let mut first = connect(&addr).await;
    send(&mut first, "findMatch", json!({ "playerName": "Ada" })).await;
    expect_next(&mut first, "matchmakingStatus").await;
    first
        .send(Message::Text(json!({ "event": "cancelMatchmaking" }).to_string().into()))
        .await
        .expect("send");
    // Let the cancel land before the next player queues.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut second = connect(&addr).await;
    send(&mut second, "findMatch", json!({ "playerName": "Bo" })).await;
    let status = expect_next(&mut second, "matchmakingStatus").await;
    assert_eq!(status["playersWaiting"], 1);
    expect_silence(&mut first).await;
}

#[tokio::test]
async fn test_find_match_same_name_waits_for_next_player() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;
    let mut other_alice = connect(&addr).await;
    let mut bob = connect(&addr).await;

    send(&mut alice, "findMatch", json!({ "playerName": "Alice" })).await;
    expect_next(&mut alice, "matchmakingStatus").await;
    send(&mut other_alice, "findMatch", json!({ "playerName": "ALICE" })).await;
    expect_next(&mut other_alice, "matchmakingStatus").await;
    expect_silence(&mut alice).await;

    send(&mut bob, "findMatch", json!({ "playerName": "Bob" })).await;
    expect_next(&mut bob, "matchmakingStatus").await;
    expect_next(&mut alice, "gameCreated").await;
    expect_next(&mut bob, "gameJoined").await;
    expect_silence(&mut other_alice).await;
}
