//! End-to-end tests: a real server on a random port, driven by real
//! tokio-tungstenite clients speaking the JSON wire protocol.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use noxo::{
    AnonymousIdentity, ClientEvent, NoxoServerBuilder, RoomConfig, ServerEvent, Status,
    Symbol,
};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns its address.
async fn start_server() -> String {
    let server = NoxoServerBuilder::new()
        .bind("127.0.0.1:0")
        .config(RoomConfig::default())
        .build(AnonymousIdentity)
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

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

fn encode(event: &ClientEvent) -> Message {
    Message::Text(serde_json::to_string(event).unwrap().into())
}

fn decode(msg: Message) -> ServerEvent {
    serde_json::from_slice(&msg.into_data()).expect("server event should parse")
}

async fn recv_event(ws: &mut ClientWs) -> ServerEvent {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for event")
        .expect("stream should not end")
        .expect("frame should be ok");
    decode(msg)
}

/// Sends `Hello` and waits for `Welcome`.
async fn hello(ws: &mut ClientWs, token: &str) {
    ws.send(encode(&ClientEvent::Hello {
        token: token.into(),
    }))
    .await
    .unwrap();
    match recv_event(ws).await {
        ServerEvent::Welcome { .. } => {}
        other => panic!("expected Welcome, got {other:?}"),
    }
}

async fn send_join(ws: &mut ClientWs, room: &str, name: &str, symbol: Symbol, private: bool) {
    ws.send(encode(&ClientEvent::JoinRoom {
        room: room.into(),
        name: name.into(),
        symbol,
        avatar: None,
        private,
    }))
    .await
    .unwrap();
}

async fn send_move(ws: &mut ClientWs, room: &str, index: usize, symbol: Symbol) {
    ws.send(encode(&ClientEvent::MakeMove {
        room: room.into(),
        index,
        symbol,
    }))
    .await
    .unwrap();
}

/// Connects, identifies, and joins — draining the join-time events
/// (`JoinSuccess` + `RoomUpdate`, plus `GameStart` for the second seat).
async fn join_drained(addr: &str, token: &str, room: &str, symbol: Symbol) -> ClientWs {
    let mut ws = connect(addr).await;
    hello(&mut ws, token).await;
    send_join(&mut ws, room, token, symbol, false).await;
    match recv_event(&mut ws).await {
        ServerEvent::JoinSuccess { .. } => {}
        other => panic!("expected JoinSuccess, got {other:?}"),
    }
    match recv_event(&mut ws).await {
        ServerEvent::RoomUpdate { .. } => {}
        other => panic!("expected RoomUpdate, got {other:?}"),
    }
    if symbol == Symbol::O {
        match recv_event(&mut ws).await {
            ServerEvent::GameStart { .. } => {}
            other => panic!("expected GameStart, got {other:?}"),
        }
    }
    ws
}

/// Seats Alice (X) and Bob (O) in `room` with all join events drained on
/// both sockets.
async fn seated_pair(addr: &str, room: &str) -> (ClientWs, ClientWs) {
    let mut alice = join_drained(addr, "Alice", room, Symbol::X).await;
    let bob = join_drained(addr, "Bob", room, Symbol::O).await;
    // Alice sees Bob arrive and the game start.
    match recv_event(&mut alice).await {
        ServerEvent::RoomUpdate { .. } => {}
        other => panic!("expected RoomUpdate, got {other:?}"),
    }
    match recv_event(&mut alice).await {
        ServerEvent::GameStart { .. } => {}
        other => panic!("expected GameStart, got {other:?}"),
    }
    (alice, bob)
}

/// Plays one accepted move and drains the `MoveUpdate` on both sockets.
async fn play(
    sender: &mut ClientWs,
    other: &mut ClientWs,
    room: &str,
    index: usize,
    symbol: Symbol,
) {
    send_move(sender, room, index, symbol).await;
    for ws in [sender, other] {
        match recv_event(ws).await {
            ServerEvent::MoveUpdate { .. } => {}
            other => panic!("expected MoveUpdate, got {other:?}"),
        }
    }
}

// =========================================================================
// Identification
// =========================================================================

#[tokio::test]
async fn test_hello_gets_welcome() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, "Alice").await;
}

#[tokio::test]
async fn test_event_before_hello_is_rejected() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send_join(&mut ws, "r1", "Alice", Symbol::X, false).await;

    match recv_event(&mut ws).await {
        ServerEvent::Error { message } => assert!(message.contains("Hello")),
        other => panic!("expected Error, got {other:?}"),
    }
}

// =========================================================================
// Joining
// =========================================================================

#[tokio::test]
async fn test_first_join_creates_waiting_room() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, "Alice").await;
    send_join(&mut ws, "r1", "Alice", Symbol::X, false).await;

    match recv_event(&mut ws).await {
        ServerEvent::JoinSuccess { symbol, snapshot } => {
            assert_eq!(symbol, Symbol::X);
            assert_eq!(snapshot.game.status, Status::Waiting);
            assert_eq!(snapshot.players.len(), 1);
            assert_eq!(snapshot.players[0].name, "Alice");
        }
        other => panic!("expected JoinSuccess, got {other:?}"),
    }
}

#[tokio::test]
async fn test_second_join_starts_game_for_both() {
    let addr = start_server().await;
    let mut alice = join_drained(&addr, "Alice", "r1", Symbol::X).await;

    let mut bob = connect(&addr).await;
    hello(&mut bob, "Bob").await;
    send_join(&mut bob, "r1", "Bob", Symbol::O, false).await;

    match recv_event(&mut bob).await {
        ServerEvent::JoinSuccess { snapshot, .. } => {
            assert_eq!(snapshot.game.status, Status::Active);
            assert_eq!(snapshot.game.current_turn, Symbol::X);
            assert_eq!(snapshot.players.len(), 2);
        }
        other => panic!("expected JoinSuccess, got {other:?}"),
    }

    // Alice sees the roster change, then the start.
    match recv_event(&mut alice).await {
        ServerEvent::RoomUpdate { snapshot } => {
            assert_eq!(snapshot.players.len(), 2);
        }
        other => panic!("expected RoomUpdate, got {other:?}"),
    }
    match recv_event(&mut alice).await {
        ServerEvent::GameStart { snapshot } => {
            assert_eq!(snapshot.game.status, Status::Active);
            assert_eq!(snapshot.game.current_turn, Symbol::X);
        }
        other => panic!("expected GameStart, got {other:?}"),
    }
}

#[tokio::test]
async fn test_third_join_gets_room_full() {
    let addr = start_server().await;
    let _pair = seated_pair(&addr, "r1").await;

    let mut eve = connect(&addr).await;
    hello(&mut eve, "Eve").await;
    send_join(&mut eve, "r1", "Eve", Symbol::X, false).await;

    match recv_event(&mut eve).await {
        ServerEvent::RoomFull { room } => assert_eq!(room, "r1".into()),
        other => panic!("expected RoomFull, got {other:?}"),
    }
}

#[tokio::test]
async fn test_duplicate_symbol_gets_symbol_taken() {
    let addr = start_server().await;
    let _alice = join_drained(&addr, "Alice", "r1", Symbol::X).await;

    let mut bob = connect(&addr).await;
    hello(&mut bob, "Bob").await;
    send_join(&mut bob, "r1", "Bob", Symbol::X, false).await;

    match recv_event(&mut bob).await {
        ServerEvent::SymbolTaken { room } => assert_eq!(room, "r1".into()),
        other => panic!("expected SymbolTaken, got {other:?}"),
    }
}

#[tokio::test]
async fn test_oversized_name_is_rejected_before_joining() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, "Alice").await;

    send_join(&mut ws, "r1", &"x".repeat(21), Symbol::X, false).await;
    match recv_event(&mut ws).await {
        ServerEvent::Error { message } => assert!(message.contains("name")),
        other => panic!("expected Error, got {other:?}"),
    }

    // The room was never created — a fresh join still sees a waiting room.
    send_join(&mut ws, "r1", "Alice", Symbol::X, false).await;
    assert!(matches!(
        recv_event(&mut ws).await,
        ServerEvent::JoinSuccess { .. }
    ));
}

#[tokio::test]
async fn test_oversized_room_id_is_rejected() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, "Alice").await;

    send_join(&mut ws, &"r".repeat(11), "Alice", Symbol::X, false).await;
    match recv_event(&mut ws).await {
        ServerEvent::Error { message } => assert!(message.contains("room id")),
        other => panic!("expected Error, got {other:?}"),
    }
}

// =========================================================================
// Gameplay
// =========================================================================

#[tokio::test]
async fn test_move_updates_board_and_occupied_cell_is_rejected() {
    let addr = start_server().await;
    let (mut alice, mut bob) = seated_pair(&addr, "r1").await;

    // X takes the corner.
    send_move(&mut alice, "r1", 0, Symbol::X).await;
    for ws in [&mut alice, &mut bob] {
        match recv_event(ws).await {
            ServerEvent::MoveUpdate {
                index,
                symbol,
                snapshot,
            } => {
                assert_eq!(index, 0);
                assert_eq!(symbol, Symbol::X);
                assert_eq!(snapshot.game.board[0], Some(Symbol::X));
                assert_eq!(snapshot.game.current_turn, Symbol::O);
            }
            other => panic!("expected MoveUpdate, got {other:?}"),
        }
    }

    // O tries the same cell — rejected to O alone, board unchanged.
    send_move(&mut bob, "r1", 0, Symbol::O).await;
    match recv_event(&mut bob).await {
        ServerEvent::Error { message } => assert!(message.contains("occupied")),
        other => panic!("expected Error, got {other:?}"),
    }

    // O can still play a free cell.
    send_move(&mut bob, "r1", 3, Symbol::O).await;
    assert!(matches!(
        recv_event(&mut bob).await,
        ServerEvent::MoveUpdate { .. }
    ));
}

#[tokio::test]
async fn test_top_row_win_broadcasts_game_end() {
    let addr = start_server().await;
    let (mut alice, mut bob) = seated_pair(&addr, "r1").await;

    play(&mut alice, &mut bob, "r1", 0, Symbol::X).await;
    play(&mut bob, &mut alice, "r1", 3, Symbol::O).await;
    play(&mut alice, &mut bob, "r1", 1, Symbol::X).await;
    play(&mut bob, &mut alice, "r1", 4, Symbol::O).await;

    // The winning move produces GameEnd for both.
    send_move(&mut alice, "r1", 2, Symbol::X).await;
    for ws in [&mut alice, &mut bob] {
        match recv_event(ws).await {
            ServerEvent::GameEnd { snapshot } => {
                assert_eq!(snapshot.game.status, Status::Finished);
                assert_eq!(snapshot.game.winner, Some(noxo::Outcome::X));
            }
            other => panic!("expected GameEnd, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_move_without_membership_gets_scoped_error() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, "Alice").await;

    send_move(&mut ws, "r1", 0, Symbol::X).await;
    match recv_event(&mut ws).await {
        ServerEvent::Error { message } => assert!(message.contains("not a member")),
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reset_after_win_restarts_game() {
    let addr = start_server().await;
    let (mut alice, mut bob) = seated_pair(&addr, "r1").await;

    play(&mut alice, &mut bob, "r1", 0, Symbol::X).await;
    play(&mut bob, &mut alice, "r1", 3, Symbol::O).await;
    play(&mut alice, &mut bob, "r1", 1, Symbol::X).await;
    play(&mut bob, &mut alice, "r1", 4, Symbol::O).await;
    send_move(&mut alice, "r1", 2, Symbol::X).await;
    let _ = recv_event(&mut alice).await; // GameEnd
    let _ = recv_event(&mut bob).await;

    // O resets — no turn restriction on reset.
    bob.send(encode(&ClientEvent::ResetGame { room: "r1".into() }))
        .await
        .unwrap();
    for ws in [&mut alice, &mut bob] {
        match recv_event(ws).await {
            ServerEvent::GameReset { snapshot } => {
                assert_eq!(snapshot.game.status, Status::Active);
                assert_eq!(snapshot.game.move_count, 0);
                assert!(snapshot.game.board.iter().all(|c| c.is_none()));
            }
            other => panic!("expected GameReset, got {other:?}"),
        }
    }
}

// =========================================================================
// Departure
// =========================================================================

#[tokio::test]
async fn test_disconnect_mid_game_broadcasts_player_left() {
    let addr = start_server().await;
    let (mut alice, mut bob) = seated_pair(&addr, "r1").await;

    play(&mut alice, &mut bob, "r1", 0, Symbol::X).await;

    // Bob's socket drops mid-game.
    bob.close(None).await.unwrap();
    drop(bob);

    match recv_event(&mut alice).await {
        ServerEvent::PlayerLeft { snapshot } => {
            assert_eq!(snapshot.game.status, Status::Finished);
            assert!(snapshot.game.winner.is_none());
            assert_eq!(snapshot.players.len(), 1);
            assert_eq!(snapshot.players[0].name, "Alice");
        }
        other => panic!("expected PlayerLeft, got {other:?}"),
    }
}

#[tokio::test]
async fn test_explicit_leave_keeps_connection_usable() {
    let addr = start_server().await;
    let mut ws = join_drained(&addr, "Alice", "r1", Symbol::X).await;

    ws.send(encode(&ClientEvent::Leave { room: "r1".into() }))
        .await
        .unwrap();

    // The same connection can join again; the old room emptied and was
    // deleted, so this is a fresh waiting room.
    send_join(&mut ws, "r1", "Alice", Symbol::O, false).await;
    match recv_event(&mut ws).await {
        ServerEvent::JoinSuccess { symbol, snapshot } => {
            assert_eq!(symbol, Symbol::O);
            assert_eq!(snapshot.game.status, Status::Waiting);
            assert_eq!(snapshot.players.len(), 1);
        }
        other => panic!("expected JoinSuccess, got {other:?}"),
    }
}

// =========================================================================
// Chat
// =========================================================================

#[tokio::test]
async fn test_chat_limit_drops_oversize_and_delivers_exact_limit() {
    let addr = start_server().await;
    let (mut alice, mut bob) = seated_pair(&addr, "r1").await;

    // 101 characters: dropped silently.
    alice
        .send(encode(&ClientEvent::Chat {
            room: "r1".into(),
            message: "a".repeat(101),
        }))
        .await
        .unwrap();

    // 100 characters: broadcast to both with a generated id.
    let exact = "b".repeat(100);
    alice
        .send(encode(&ClientEvent::Chat {
            room: "r1".into(),
            message: exact.clone(),
        }))
        .await
        .unwrap();

    for ws in [&mut alice, &mut bob] {
        match recv_event(ws).await {
            ServerEvent::Chat {
                id, name, message, ..
            } => {
                assert!(!id.is_empty());
                assert_eq!(name, "Alice");
                assert_eq!(message, exact, "oversize message should have been dropped");
            }
            other => panic!("expected Chat, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_chat_ids_are_unique_per_message() {
    let addr = start_server().await;
    let (mut alice, _bob) = seated_pair(&addr, "r1").await;

    for text in ["one", "two"] {
        alice
            .send(encode(&ClientEvent::Chat {
                room: "r1".into(),
                message: text.into(),
            }))
            .await
            .unwrap();
    }

    let first = match recv_event(&mut alice).await {
        ServerEvent::Chat { id, .. } => id,
        other => panic!("expected Chat, got {other:?}"),
    };
    let second = match recv_event(&mut alice).await {
        ServerEvent::Chat { id, .. } => id,
        other => panic!("expected Chat, got {other:?}"),
    };
    assert_ne!(first, second);
}

// =========================================================================
// Listing
// =========================================================================

#[tokio::test]
async fn test_room_listing_shows_open_public_rooms_only() {
    let addr = start_server().await;
    let _alice = join_drained(&addr, "Alice", "open1", Symbol::X).await;

    // A private room should not appear.
    let mut cara = connect(&addr).await;
    hello(&mut cara, "Cara").await;
    send_join(&mut cara, "hidden", "Cara", Symbol::X, true).await;
    let _ = recv_event(&mut cara).await; // JoinSuccess
    let _ = recv_event(&mut cara).await; // RoomUpdate

    let mut observer = connect(&addr).await;
    hello(&mut observer, "Obs").await;
    observer.send(encode(&ClientEvent::ListRooms)).await.unwrap();

    match recv_event(&mut observer).await {
        ServerEvent::RoomList { rooms } => {
            assert_eq!(rooms.len(), 1);
            assert_eq!(rooms[0].id, "open1".into());
            assert_eq!(rooms[0].player_count, 1);
            assert_eq!(rooms[0].max_players, 2);
            assert!(rooms[0].created_ms > 0);
        }
        other => panic!("expected RoomList, got {other:?}"),
    }
}

// =========================================================================
// Robustness
// =========================================================================

#[tokio::test]
async fn test_undecodable_frames_are_skipped() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, "Alice").await;

    ws.send(Message::Text("not json".into())).await.unwrap();
    ws.send(Message::Text("{\"type\":\"NoSuchEvent\"}".into()))
        .await
        .unwrap();

    // The session is still alive and working.
    send_join(&mut ws, "r1", "Alice", Symbol::X, false).await;
    assert!(matches!(
        recv_event(&mut ws).await,
        ServerEvent::JoinSuccess { .. }
    ));
}
