//! Room actor: an isolated Tokio task that owns one match.
//!
//! Each room runs in its own task and is reachable only through an mpsc
//! command channel. This is what linearizes the room: two connections
//! moving at the same instant are processed one after the other on the
//! room's task, and every broadcast is produced after its mutation
//! completed, so members never observe a half-applied move.
//!
//! The inactivity timer lives here too, as a `select!` arm next to the
//! command channel — the only asynchronous trigger that mutates room
//! state without a client request.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use noxo_engine::{MoveReport, Status, Symbol};
use noxo_protocol::{RoomId, RoomSnapshot, ServerEvent};
use noxo_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};

use crate::{Player, RoomConfig, RoomError};

/// Command channel depth per room. Two players on a turn-based game never
/// get close to this; it only bounds a misbehaving client.
const COMMAND_CHANNEL_SIZE: usize = 64;

/// Channel sender for delivering outbound events to one member's session.
pub type MemberSender = mpsc::UnboundedSender<ServerEvent>;

// ---------------------------------------------------------------------------
// Commands and replies
// ---------------------------------------------------------------------------

/// Commands sent to a room actor through its channel.
///
/// Variants with a `oneshot::Sender` are request/response: the caller
/// awaits the reply so scoped errors can be answered to it alone.
pub(crate) enum RoomCommand {
    /// Seat a player.
    Join {
        player: Player,
        sender: MemberSender,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },

    /// Remove a player (leave or disconnect).
    Leave {
        conn_id: ConnectionId,
        reply: oneshot::Sender<LeaveOutcome>,
    },

    /// Place a mark on the board.
    PlaceMark {
        conn_id: ConnectionId,
        index: usize,
        symbol: Symbol,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Wipe the board and start over.
    Reset {
        conn_id: ConnectionId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Flip the sender's ready flag.
    ToggleReady {
        conn_id: ConnectionId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Broadcast a chat line. Fire-and-forget — chat is never stored.
    Chat {
        conn_id: ConnectionId,
        id: String,
        message: String,
        timestamp_ms: u64,
    },

    /// Request listing/sweep metadata.
    Meta { reply: oneshot::Sender<RoomMeta> },

    /// Shut down the room.
    Shutdown,
}

/// What removing a player did.
#[derive(Debug, Clone, Copy)]
pub struct LeaveOutcome {
    /// Whether the connection actually held a seat.
    pub removed: bool,
    /// Whether an active game was force-finished by the departure.
    pub abandoned: bool,
    /// Whether the room is now empty (and should be deleted).
    pub now_empty: bool,
}

/// A snapshot of room metadata for listings and the stale sweep — not the
/// game state itself.
#[derive(Debug, Clone)]
pub struct RoomMeta {
    pub id: RoomId,
    pub player_count: usize,
    pub max_players: usize,
    /// Creation time, unix milliseconds (wire listings).
    pub created_ms: u64,
    /// Time since creation (staleness checks).
    pub age: Duration,
    pub private: bool,
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Handle to a running room actor. Cheap to clone — just an `mpsc::Sender`.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's id.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }

    /// Seats a player; replies with the post-join snapshot.
    pub async fn join(
        &self,
        player: Player,
        sender: MemberSender,
    ) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                player,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes a player.
    pub async fn leave(
        &self,
        conn_id: ConnectionId,
    ) -> Result<LeaveOutcome, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave {
                conn_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Places a mark for `conn_id`.
    pub async fn place_mark(
        &self,
        conn_id: ConnectionId,
        index: usize,
        symbol: Symbol,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::PlaceMark {
                conn_id,
                index,
                symbol,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Resets the room.
    pub async fn reset(&self, conn_id: ConnectionId) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Reset {
                conn_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Flips `conn_id`'s ready flag.
    pub async fn toggle_ready(&self, conn_id: ConnectionId) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::ToggleReady {
                conn_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Broadcasts a chat line (fire-and-forget).
    pub async fn chat(
        &self,
        conn_id: ConnectionId,
        id: String,
        message: String,
        timestamp_ms: u64,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Chat {
                conn_id,
                id,
                message,
                timestamp_ms,
            })
            .await
            .map_err(|_| self.unavailable())
    }

    /// Requests listing/sweep metadata.
    pub async fn meta(&self) -> Result<RoomMeta, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Meta { reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| self.unavailable())
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

/// The internal room state. Runs inside a Tokio task.
struct RoomActor {
    id: RoomId,
    private: bool,
    config: RoomConfig,
    /// Seated players, insertion order. At most `config.max_players`,
    /// symbols distinct.
    players: Vec<Player>,
    /// Per-member outbound channels.
    senders: HashMap<ConnectionId, MemberSender>,
    game: noxo_engine::GameState,
    created: Instant,
    created_ms: u64,
    /// Armed inactivity deadline, if any. `None` means no timer.
    idle_deadline: Option<Instant>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop: commands interleaved with the optional
    /// inactivity deadline, until shutdown or all handles dropped.
    async fn run(mut self) {
        tracing::info!(room_id = %self.id, "room actor started");

        loop {
            let cmd = match self.idle_deadline {
                Some(deadline) => {
                    tokio::select! {
                        cmd = self.receiver.recv() => match cmd {
                            Some(cmd) => cmd,
                            None => break,
                        },
                        _ = time::sleep_until(deadline) => {
                            self.handle_idle_timeout();
                            continue;
                        }
                    }
                }
                None => match self.receiver.recv().await {
                    Some(cmd) => cmd,
                    None => break,
                },
            };

            match cmd {
                RoomCommand::Join {
                    player,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join(player, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Leave { conn_id, reply } => {
                    let outcome = self.handle_leave(conn_id);
                    let _ = reply.send(outcome);
                }
                RoomCommand::PlaceMark {
                    conn_id,
                    index,
                    symbol,
                    reply,
                } => {
                    let result = self.handle_place_mark(conn_id, index, symbol);
                    let _ = reply.send(result);
                }
                RoomCommand::Reset { conn_id, reply } => {
                    let result = self.handle_reset(conn_id);
                    let _ = reply.send(result);
                }
                RoomCommand::ToggleReady { conn_id, reply } => {
                    let result = self.handle_toggle_ready(conn_id);
                    let _ = reply.send(result);
                }
                RoomCommand::Chat {
                    conn_id,
                    id,
                    message,
                    timestamp_ms,
                } => {
                    self.handle_chat(conn_id, id, message, timestamp_ms);
                }
                RoomCommand::Meta { reply } => {
                    let _ = reply.send(self.meta());
                }
                RoomCommand::Shutdown => {
                    tracing::info!(room_id = %self.id, "room shutting down");
                    break;
                }
            }
        }

        tracing::info!(room_id = %self.id, "room actor stopped");
    }

    fn handle_join(
        &mut self,
        player: Player,
        sender: MemberSender,
    ) -> Result<RoomSnapshot, RoomError> {
        if self.players.len() >= self.config.max_players {
            return Err(RoomError::RoomFull(self.id.clone()));
        }
        if self.players.iter().any(|p| p.symbol == player.symbol) {
            return Err(RoomError::SymbolTaken(self.id.clone()));
        }

        tracing::info!(
            room_id = %self.id,
            conn_id = %player.conn_id,
            symbol = %player.symbol,
            players = self.players.len() + 1,
            "player joined"
        );
        self.senders.insert(player.conn_id, sender);
        self.players.push(player);

        let started = self.players.len() == self.config.max_players;
        if started {
            // Every game starts from a clean slate — a previous finished
            // or abandoned board never carries over.
            self.game.clear();
            self.game.begin();
            self.arm_idle_timer();
        }

        let snapshot = self.snapshot();
        self.broadcast(ServerEvent::RoomUpdate {
            snapshot: snapshot.clone(),
        });
        if started {
            tracing::info!(room_id = %self.id, "game started");
            self.broadcast(ServerEvent::GameStart {
                snapshot: snapshot.clone(),
            });
        }

        Ok(snapshot)
    }

    fn handle_leave(&mut self, conn_id: ConnectionId) -> LeaveOutcome {
        let Some(pos) = self.players.iter().position(|p| p.conn_id == conn_id) else {
            return LeaveOutcome {
                removed: false,
                abandoned: false,
                now_empty: self.players.is_empty(),
            };
        };

        let player = self.players.remove(pos);
        self.senders.remove(&conn_id);
        tracing::info!(
            room_id = %self.id,
            %conn_id,
            players = self.players.len(),
            seat_time = ?player.joined.elapsed(),
            "player left"
        );

        // A mid-game departure ends the game — it is never paused for a
        // possible return.
        let abandoned = self.game.status == Status::Active;
        if abandoned {
            self.game.abandon();
            self.idle_deadline = None;
            self.broadcast(ServerEvent::PlayerLeft {
                snapshot: self.snapshot(),
            });
        } else if !self.players.is_empty() {
            self.broadcast(ServerEvent::RoomUpdate {
                snapshot: self.snapshot(),
            });
        }

        LeaveOutcome {
            removed: true,
            abandoned,
            now_empty: self.players.is_empty(),
        }
    }

    fn handle_place_mark(
        &mut self,
        conn_id: ConnectionId,
        index: usize,
        symbol: Symbol,
    ) -> Result<(), RoomError> {
        let member = self
            .players
            .iter()
            .find(|p| p.conn_id == conn_id)
            .ok_or_else(|| RoomError::NotAMember(self.id.clone()))?;

        // Connection identity is the only identity: a mark that isn't the
        // sender's own counts as playing out of turn.
        if member.symbol != symbol {
            return Err(noxo_engine::MoveError::WrongTurn.into());
        }

        let report = self.game.apply_move(index, symbol)?;
        match report {
            MoveReport::Decided(outcome) => {
                self.idle_deadline = None;
                tracing::info!(room_id = %self.id, ?outcome, "game finished");
                self.broadcast(ServerEvent::GameEnd {
                    snapshot: self.snapshot(),
                });
            }
            MoveReport::InProgress => {
                self.broadcast(ServerEvent::MoveUpdate {
                    index,
                    symbol,
                    snapshot: self.snapshot(),
                });
            }
        }
        Ok(())
    }

    fn handle_reset(&mut self, conn_id: ConnectionId) -> Result<(), RoomError> {
        if !self.is_member(conn_id) {
            return Err(RoomError::NotAMember(self.id.clone()));
        }

        self.game.clear();
        self.idle_deadline = None;
        for player in &mut self.players {
            player.ready = false;
        }
        if self.players.len() == self.config.max_players {
            self.game.begin();
        }

        tracing::info!(room_id = %self.id, %conn_id, "room reset");
        self.broadcast(ServerEvent::GameReset {
            snapshot: self.snapshot(),
        });
        Ok(())
    }

    fn handle_toggle_ready(&mut self, conn_id: ConnectionId) -> Result<(), RoomError> {
        let member = self
            .players
            .iter_mut()
            .find(|p| p.conn_id == conn_id)
            .ok_or_else(|| RoomError::NotAMember(self.id.clone()))?;

        member.ready = !member.ready;
        self.broadcast(ServerEvent::PlayerReadyUpdate {
            snapshot: self.snapshot(),
        });
        Ok(())
    }

    fn handle_chat(
        &mut self,
        conn_id: ConnectionId,
        id: String,
        message: String,
        timestamp_ms: u64,
    ) {
        let Some(member) = self.players.iter().find(|p| p.conn_id == conn_id) else {
            tracing::debug!(room_id = %self.id, %conn_id, "chat from non-member, ignoring");
            return;
        };

        self.broadcast(ServerEvent::Chat {
            id,
            name: member.name.clone(),
            avatar: member.avatar.clone(),
            message,
            timestamp_ms,
        });
    }

    /// The armed inactivity timer fired before the game finished: force
    /// the room back to waiting, board wiped, players kept.
    fn handle_idle_timeout(&mut self) {
        self.idle_deadline = None;
        if self.game.status != Status::Active {
            return;
        }

        tracing::info!(room_id = %self.id, "active game timed out");
        self.game.clear();
        for player in &mut self.players {
            player.ready = false;
        }
        self.broadcast(ServerEvent::GameTimeout {
            snapshot: self.snapshot(),
        });
    }

    fn arm_idle_timer(&mut self) {
        self.idle_deadline = Some(Instant::now() + self.config.idle_timeout);
    }

    fn is_member(&self, conn_id: ConnectionId) -> bool {
        self.players.iter().any(|p| p.conn_id == conn_id)
    }

    /// A consistent view of the room after the current mutation.
    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room: self.id.clone(),
            players: self.players.iter().map(Player::info).collect(),
            game: self.game.clone(),
        }
    }

    /// Sends an event to every member. Senders whose session is gone are
    /// skipped silently — the disconnect path removes them shortly after.
    fn broadcast(&self, event: ServerEvent) {
        for sender in self.senders.values() {
            let _ = sender.send(event.clone());
        }
    }

    fn meta(&self) -> RoomMeta {
        RoomMeta {
            id: self.id.clone(),
            player_count: self.players.len(),
            max_players: self.config.max_players,
            created_ms: self.created_ms,
            age: self.created.elapsed(),
            private: self.private,
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
pub(crate) fn spawn_room(room_id: RoomId, private: bool, config: RoomConfig) -> RoomHandle {
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

    let created_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let actor = RoomActor {
        id: room_id.clone(),
        private,
        config,
        players: Vec::new(),
        senders: HashMap::new(),
        game: noxo_engine::GameState::new(),
        created: Instant::now(),
        created_ms,
        idle_deadline: None,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
