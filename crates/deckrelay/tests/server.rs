//! End-to-end tests: real WebSocket clients against a running relay.
//!
//! Frames on one socket are handled in order, so a client's own
//! request/response pairs need no synchronization. Cross-client
//! ordering (e.g. "alice must be identified before bob joins") is
//! enforced by polling the room's info until it reflects the expected
//! number of identified sessions.

use std::time::Duration;

use deckrelay::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

// =========================================================================
// Helpers
// =========================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Starts a server on a random port and returns its address and a
/// handle to the room.
async fn start_server() -> (String, RoomHandle) {
    init_tracing();

    let server = RelayServer::builder()
        .bind("127.0.0.1:0")
        .room_id("table-1")
        .build(MemoryStore::new())
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let room = server.room();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    (addr, room)
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!(
        "ws://{addr}/websocket"
    ))
    .await
    .expect("should connect");
    ws
}

async fn send_text(ws: &mut ClientWs, text: &str) {
    ws.send(Message::text(text)).await.expect("send should succeed");
}

/// Receives the next text frame as JSON, with a timeout so a missing
/// message fails the test instead of hanging it.
async fn recv_json(ws: &mut ClientWs) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(1), ws.next())
        .await
        .expect("timed out waiting for a message")
        .expect("stream should not end")
        .expect("recv should succeed");
    match msg {
        Message::Text(text) => {
            serde_json::from_str(text.as_str()).expect("should be JSON")
        }
        other => panic!("expected text frame, got {other:?}"),
    }
}

/// Connects and identifies as `name`.
async fn join(addr: &str, name: &str) -> ClientWs {
    let mut ws = connect(addr).await;
    send_text(&mut ws, &format!(r#"{{"id":"{name}"}}"#)).await;
    ws
}

/// Polls until the room reports `count` identified sessions.
async fn wait_identified(room: &RoomHandle, count: usize) {
    for _ in 0..100 {
        let info = room.info().await.expect("room should be running");
        if info.identified == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("room never reached {count} identified sessions");
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_join_notifies_existing_clients() {
    let (addr, room) = start_server().await;

    let mut alice = join(&addr, "alice").await;
    wait_identified(&room, 1).await;

    let _bob = join(&addr, "bob").await;

    let notice = recv_json(&mut alice).await;
    assert_eq!(notice["joined"], "bob");
}

#[tokio::test]
async fn test_missing_first_id_is_rejected_and_closed() {
    let (addr, _room) = start_server().await;

    let mut ws = connect(&addr).await;
    send_text(&mut ws, "{}").await;

    let error = recv_json(&mut ws).await;
    assert_eq!(error["error"], "First message missing session ID");

    // Next frame is the close handshake with the protocol-level code.
    let msg = tokio::time::timeout(Duration::from_secs(1), ws.next())
        .await
        .expect("timed out waiting for close")
        .expect("stream should not end")
        .expect("recv should succeed");
    match msg {
        Message::Close(Some(frame)) => {
            assert_eq!(u16::from(frame.code), close_code::MISSING_ID);
        }
        other => panic!("expected close frame, got {other:?}"),
    }
}

#[tokio::test]
async fn test_update_fans_out_to_everyone() {
    let (addr, room) = start_server().await;

    let mut alice = join(&addr, "alice").await;
    wait_identified(&room, 1).await;
    let mut bob = join(&addr, "bob").await;

    // Receiving the join notice also means bob is identified.
    assert_eq!(recv_json(&mut alice).await["joined"], "bob");

    send_text(
        &mut alice,
        &json!({"id": "alice", "version": 1, "state": {"turn": "bob"}})
            .to_string(),
    )
    .await;

    // The accepted state goes to every identified session, sender
    // included, with the room id echoed.
    for ws in [&mut alice, &mut bob] {
        let state = recv_json(ws).await;
        assert_eq!(state["id"], "table-1");
        assert_eq!(state["version"], 1);
        assert_eq!(state["state"]["turn"], "bob");
    }
}

#[tokio::test]
async fn test_late_joiner_receives_current_state_first() {
    let (addr, room) = start_server().await;

    let mut alice = join(&addr, "alice").await;
    send_text(
        &mut alice,
        &json!({"id": "alice", "version": 3, "state": {"round": 3}})
            .to_string(),
    )
    .await;
    // The broadcast back to alice doubles as an acceptance barrier.
    assert_eq!(recv_json(&mut alice).await["version"], 3);
    wait_identified(&room, 1).await;

    let mut bob = join(&addr, "bob").await;
    let snapshot = recv_json(&mut bob).await;
    assert_eq!(snapshot["version"], 3);
    assert_eq!(snapshot["state"]["round"], 3);

    assert_eq!(recv_json(&mut alice).await["joined"], "bob");
}

#[tokio::test]
async fn test_out_of_order_update_is_echoed_to_sender_only() {
    let (addr, _room) = start_server().await;

    let mut alice = join(&addr, "alice").await;
    send_text(
        &mut alice,
        &json!({"id": "alice", "version": 2, "state": {}}).to_string(),
    )
    .await;
    assert_eq!(recv_json(&mut alice).await["version"], 2);

    send_text(
        &mut alice,
        &json!({"id": "alice", "version": 1, "state": {"x": 1}}).to_string(),
    )
    .await;

    let rejection = recv_json(&mut alice).await;
    assert_eq!(rejection["error"], "Message out of order");
    assert_eq!(rejection["gameState"]["version"], 2);
}

#[tokio::test]
async fn test_disconnect_broadcasts_quit() {
    let (addr, room) = start_server().await;

    let mut alice = join(&addr, "alice").await;
    wait_identified(&room, 1).await;
    let mut bob = join(&addr, "bob").await;
    assert_eq!(recv_json(&mut alice).await["joined"], "bob");

    bob.close(None).await.expect("close should succeed");

    let notice = recv_json(&mut alice).await;
    assert_eq!(notice["quit"], "bob");
}

#[tokio::test]
async fn test_wrong_path_gets_404() {
    let (addr, _room) = start_server().await;

    let result =
        tokio_tungstenite::connect_async(format!("ws://{addr}/nope")).await;
    assert!(result.is_err(), "non-/websocket path should be refused");
}

#[tokio::test]
async fn test_session_id_mismatch_keeps_session_alive() {
    let (addr, _room) = start_server().await;

    let mut alice = join(&addr, "alice").await;

    send_text(
        &mut alice,
        &json!({"id": "mallory", "version": 1, "state": {}}).to_string(),
    )
    .await;
    assert_eq!(recv_json(&mut alice).await["error"], "Session ID incorrect");

    // Still connected and able to update under the right id.
    send_text(
        &mut alice,
        &json!({"id": "alice", "version": 1, "state": {}}).to_string(),
    )
    .await;
    assert_eq!(recv_json(&mut alice).await["version"], 1);
}
