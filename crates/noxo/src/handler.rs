//! Per-connection session handler: identification and event routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `Hello` → resolve identity → send `Welcome`
//!   2. Loop: inbound client events interleaved with room broadcasts
//!   3. On close or error, release the seat (drop guard)
//!
//! The session is a two-state machine — unjoined and joined — tracked by
//! whether [`Session::room`] is set. Every rejection is answered to this
//! connection only; broadcasts come from the room actor through the
//! outbox channel.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use noxo_identity::{Identity, IdentityProvider};
use noxo_protocol::{ClientEvent, Codec, ProtocolError, RoomId, ServerEvent};
use noxo_room::{MemberSender, Player, RoomError};
use noxo_transport::{Connection, ConnectionId, WebSocketConnection};
use rand::Rng;
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::NoxoError;

/// How long a fresh connection has to send its `Hello`.
const HELLO_DEADLINE: Duration = Duration::from_secs(5);

/// One connection's session: identity plus at most one room membership.
struct Session {
    conn_id: ConnectionId,
    identity: Identity,
    /// The room this connection is seated in, if any.
    room: Option<RoomId>,
    /// Sender half of the outbox; handed to rooms on join so their
    /// broadcasts reach this connection.
    outbox: MemberSender,
}

/// Drop guard that releases the connection's seat when the handler exits.
///
/// Cleanup must happen even if the handler task dies unexpectedly. `Drop`
/// is synchronous, so the async registry call runs on a spawned task.
struct SeatGuard<I: IdentityProvider, C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<I, C>>,
}

impl<I: IdentityProvider, C: Codec> Drop for SeatGuard<I, C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let _ = state.registry.lock().await.leave(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<I, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<I, C>>,
) -> Result<(), NoxoError>
where
    I: IdentityProvider,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    // --- Step 1: identification ---
    let identity = perform_hello(&conn, &state).await?;
    tracing::info!(
        %conn_id,
        external_id = %identity.external_id,
        "connection identified"
    );

    let _guard = SeatGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel();
    let mut session = Session {
        conn_id,
        identity,
        room: None,
        outbox: outbox_tx,
    };

    // --- Step 2: event loop ---
    // Inbound frames and room broadcasts interleave here; both paths
    // write to the socket from this one task, so replies and fan-out
    // never interleave mid-frame.
    loop {
        tokio::select! {
            inbound = conn.recv() => match inbound {
                Ok(Some(data)) => {
                    let event: ClientEvent = match state.codec.decode(&data) {
                        Ok(event) => event,
                        Err(e) => {
                            tracing::debug!(%conn_id, error = %e, "failed to decode event");
                            continue;
                        }
                    };
                    dispatch(&conn, &state, &mut session, event).await?;
                }
                Ok(None) => {
                    tracing::info!(%conn_id, "connection closed");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    break;
                }
            },
            Some(event) = outbox_rx.recv() => {
                send_event(&conn, &state.codec, &event).await?;
            }
        }
    }

    // _guard drops here → the seat is released and the room notified.
    Ok(())
}

/// Performs identification: receive `Hello`, resolve the token, send
/// `Welcome`.
async fn perform_hello<I, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<I, C>>,
) -> Result<Identity, NoxoError>
where
    I: IdentityProvider,
    C: Codec,
{
    let data = match tokio::time::timeout(HELLO_DEADLINE, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(NoxoError::Protocol(ProtocolError::InvalidEvent(
                "connection closed before hello".into(),
            )));
        }
        Ok(Err(e)) => return Err(NoxoError::Transport(e)),
        Err(_) => {
            return Err(NoxoError::Protocol(ProtocolError::InvalidEvent(
                "hello timed out".into(),
            )));
        }
    };

    let event: ClientEvent = state.codec.decode(&data)?;
    let token = match event {
        ClientEvent::Hello { token } => token,
        _ => {
            send_error(conn, &state.codec, "expected Hello").await?;
            return Err(NoxoError::Protocol(ProtocolError::InvalidEvent(
                "first event must be Hello".into(),
            )));
        }
    };

    let identity = match state.identity.resolve(&token).await {
        Ok(identity) => identity,
        Err(e) => {
            send_error(conn, &state.codec, "identity rejected").await?;
            return Err(NoxoError::Identity(e));
        }
    };

    send_event(
        conn,
        &state.codec,
        &ServerEvent::Welcome {
            connection_id: conn.id().into_inner(),
        },
    )
    .await?;

    Ok(identity)
}

/// Routes one client event. Rejections are answered to this connection
/// only; the room actor produces all broadcasts.
async fn dispatch<I, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<I, C>>,
    session: &mut Session,
    event: ClientEvent,
) -> Result<(), NoxoError>
where
    I: IdentityProvider,
    C: Codec,
{
    match event {
        ClientEvent::Hello { .. } => {
            send_error(conn, &state.codec, "already identified").await
        }

        ClientEvent::JoinRoom {
            room,
            name,
            symbol,
            avatar,
            private,
        } => handle_join(conn, state, session, room, name, symbol, avatar, private).await,

        ClientEvent::MakeMove {
            room,
            index,
            symbol,
        } => {
            // Lock only for the registry call; socket writes happen after.
            let result = state
                .registry
                .lock()
                .await
                .place_mark(session.conn_id, &room, index, symbol)
                .await;
            reply_on_error(conn, &state.codec, result).await
        }

        ClientEvent::ResetGame { room } => {
            let result = state
                .registry
                .lock()
                .await
                .reset(session.conn_id, &room)
                .await;
            reply_on_error(conn, &state.codec, result).await
        }

        ClientEvent::PlayerReady { room } => {
            let result = state
                .registry
                .lock()
                .await
                .toggle_ready(session.conn_id, &room)
                .await;
            reply_on_error(conn, &state.codec, result).await
        }

        ClientEvent::Chat { room, message } => {
            handle_chat(conn, state, session, room, message).await
        }

        ClientEvent::ListRooms => {
            let rooms = state.registry.lock().await.list_public().await;
            send_event(conn, &state.codec, &ServerEvent::RoomList { rooms }).await
        }

        ClientEvent::Leave { room } => {
            if session.room.as_ref() == Some(&room) {
                let _ = state.registry.lock().await.leave(session.conn_id).await;
                session.room = None;
            } else {
                tracing::debug!(
                    conn_id = %session.conn_id,
                    %room,
                    "leave for a room this connection is not in, ignoring"
                );
            }
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_join<I, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<I, C>>,
    session: &mut Session,
    room: RoomId,
    name: String,
    symbol: noxo_engine::Symbol,
    avatar: Option<String>,
    private: bool,
) -> Result<(), NoxoError>
where
    I: IdentityProvider,
    C: Codec,
{
    // Field validation happens before any state is touched.
    let name = name.trim().to_string();
    if name.is_empty() || name.chars().count() > state.config.max_name_len {
        return send_error(
            conn,
            &state.codec,
            &format!(
                "name must be 1-{} characters",
                state.config.max_name_len
            ),
        )
        .await;
    }
    if room.0.trim().is_empty() || room.len_chars() > state.config.max_room_id_len {
        return send_error(
            conn,
            &state.codec,
            &format!(
                "room id must be 1-{} characters",
                state.config.max_room_id_len
            ),
        )
        .await;
    }

    let player = Player::new(
        session.conn_id,
        session.identity.external_id.clone(),
        name,
        avatar.or_else(|| session.identity.avatar_url.clone()),
        symbol,
    );

    let result = state
        .registry
        .lock()
        .await
        .join_or_create(room.clone(), player, session.outbox.clone(), private)
        .await;

    match result {
        Ok(snapshot) => {
            session.room = Some(room);
            send_event(
                conn,
                &state.codec,
                &ServerEvent::JoinSuccess { symbol, snapshot },
            )
            .await
        }
        Err(e) => {
            // join_or_create released any previous seat before failing.
            session.room = None;
            reply_on_error(conn, &state.codec, Err(e)).await
        }
    }
}

async fn handle_chat<I, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<I, C>>,
    session: &Session,
    room: RoomId,
    message: String,
) -> Result<(), NoxoError>
where
    I: IdentityProvider,
    C: Codec,
{
    let text = message.trim();
    if text.is_empty() || text.chars().count() > state.config.max_chat_len {
        tracing::debug!(
            conn_id = %session.conn_id,
            chars = text.chars().count(),
            "chat message dropped"
        );
        return Ok(());
    }

    let result = state
        .registry
        .lock()
        .await
        .chat(
            session.conn_id,
            &room,
            new_message_id(),
            text.to_string(),
            unix_ms(),
        )
        .await;
    reply_on_error(conn, &state.codec, result).await
}

/// Answers a failed room operation to the caller. `RoomFull` and
/// `SymbolTaken` have dedicated events; everything else is a generic
/// error with the failure's message.
async fn reply_on_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    result: Result<(), RoomError>,
) -> Result<(), NoxoError> {
    match result {
        Ok(()) => Ok(()),
        Err(RoomError::RoomFull(room)) => {
            send_event(conn, codec, &ServerEvent::RoomFull { room }).await
        }
        Err(RoomError::SymbolTaken(room)) => {
            send_event(conn, codec, &ServerEvent::SymbolTaken { room }).await
        }
        Err(e) => send_error(conn, codec, &e.to_string()).await,
    }
}

/// Encodes and writes one event to the socket.
async fn send_event(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    event: &ServerEvent,
) -> Result<(), NoxoError> {
    let bytes = codec.encode(event)?;
    conn.send(&bytes).await.map_err(NoxoError::Transport)
}

async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    message: &str,
) -> Result<(), NoxoError> {
    send_event(
        conn,
        codec,
        &ServerEvent::Error {
            message: message.to_string(),
        },
    )
    .await
}

/// Generates a unique chat-message id: 8 random bytes as lowercase hex.
fn new_message_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 8] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Wall-clock now, unix milliseconds.
fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
