//! Room registry: room-id → room map plus connection memberships.
//!
//! Rooms are created lazily — joining an unknown id spawns the room — and
//! removed eagerly when the last member leaves. A periodic sweep deletes
//! stale empty rooms as a defensive backstop.
//!
//! The registry is an explicitly owned service object: the server wraps
//! one instance in a mutex and tests construct their own, isolated ones.

use std::collections::HashMap;
use std::time::Duration;

use noxo_engine::Symbol;
use noxo_protocol::{RoomId, RoomSnapshot, RoomSummary};
use noxo_transport::ConnectionId;

use crate::room::spawn_room;
use crate::{LeaveOutcome, MemberSender, Player, RoomConfig, RoomError, RoomHandle};

/// Tracks every live room and which room each connection is seated in.
pub struct RoomRegistry {
    /// Active rooms, keyed by their client-chosen id.
    rooms: HashMap<RoomId, RoomHandle>,

    /// Maps each connection to the room it is seated in.
    /// A connection holds at most ONE membership (key invariant).
    memberships: HashMap<ConnectionId, RoomId>,

    config: RoomConfig,
}

impl RoomRegistry {
    /// Creates an empty registry with the given configuration.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            memberships: HashMap::new(),
            config,
        }
    }

    /// The configuration rooms are spawned with.
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Seats `player` in `room_id`, spawning the room if the id is
    /// unknown. The first joiner's `private` flag fixes the room's
    /// visibility permanently; later joiners' flags are ignored.
    ///
    /// If the connection already holds a seat anywhere (including this
    /// room), that membership is released first.
    pub async fn join_or_create(
        &mut self,
        room_id: RoomId,
        player: Player,
        sender: MemberSender,
        private: bool,
    ) -> Result<RoomSnapshot, RoomError> {
        let conn_id = player.conn_id;

        if self.memberships.contains_key(&conn_id) {
            self.leave(conn_id).await;
        }

        let created = !self.rooms.contains_key(&room_id);
        if created {
            let handle = spawn_room(room_id.clone(), private, self.config.clone());
            self.rooms.insert(room_id.clone(), handle);
            tracing::info!(%room_id, private, "room created");
        }

        let handle = self
            .rooms
            .get(&room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        match handle.join(player, sender).await {
            Ok(snapshot) => {
                self.memberships.insert(conn_id, room_id);
                Ok(snapshot)
            }
            Err(e) => {
                // Don't leave an empty shell behind if the first join into
                // a freshly spawned room failed.
                if created {
                    if let Some(handle) = self.rooms.remove(&room_id) {
                        let _ = handle.shutdown().await;
                    }
                }
                Err(e)
            }
        }
    }

    /// Removes the connection's seat, deleting the room if it emptied.
    ///
    /// Returns `None` when the connection held no seat.
    pub async fn leave(&mut self, conn_id: ConnectionId) -> Option<LeaveOutcome> {
        let room_id = self.memberships.remove(&conn_id)?;
        let handle = self.rooms.get(&room_id)?.clone();

        let outcome = match handle.leave(conn_id).await {
            Ok(outcome) => outcome,
            Err(_) => {
                // Actor is gone; drop the dangling entry.
                self.rooms.remove(&room_id);
                return None;
            }
        };

        if outcome.now_empty {
            let _ = handle.shutdown().await;
            self.rooms.remove(&room_id);
            tracing::info!(%room_id, "empty room removed");
        }

        Some(outcome)
    }

    /// Resolves a member's handle, checking that `room` really is the
    /// room this connection is seated in.
    fn member_handle(
        &self,
        conn_id: ConnectionId,
        room: &RoomId,
    ) -> Result<&RoomHandle, RoomError> {
        match self.memberships.get(&conn_id) {
            Some(current) if current == room => self
                .rooms
                .get(room)
                .ok_or_else(|| RoomError::NotFound(room.clone())),
            _ => Err(RoomError::NotAMember(room.clone())),
        }
    }

    /// Routes a move to the sender's room.
    pub async fn place_mark(
        &self,
        conn_id: ConnectionId,
        room: &RoomId,
        index: usize,
        symbol: Symbol,
    ) -> Result<(), RoomError> {
        self.member_handle(conn_id, room)?
            .place_mark(conn_id, index, symbol)
            .await
    }

    /// Routes a reset to the sender's room.
    pub async fn reset(&self, conn_id: ConnectionId, room: &RoomId) -> Result<(), RoomError> {
        self.member_handle(conn_id, room)?.reset(conn_id).await
    }

    /// Routes a ready toggle to the sender's room.
    pub async fn toggle_ready(
        &self,
        conn_id: ConnectionId,
        room: &RoomId,
    ) -> Result<(), RoomError> {
        self.member_handle(conn_id, room)?.toggle_ready(conn_id).await
    }

    /// Routes a chat line to the sender's room.
    pub async fn chat(
        &self,
        conn_id: ConnectionId,
        room: &RoomId,
        id: String,
        message: String,
        timestamp_ms: u64,
    ) -> Result<(), RoomError> {
        self.member_handle(conn_id, room)?
            .chat(conn_id, id, message, timestamp_ms)
            .await
    }

    /// Lists rooms that are public and still have a free seat.
    /// Order is not guaranteed. Rooms that fail to answer (shutting down)
    /// are skipped.
    pub async fn list_public(&self) -> Vec<RoomSummary> {
        let mut rooms = Vec::with_capacity(self.rooms.len());
        for handle in self.rooms.values() {
            if let Ok(meta) = handle.meta().await {
                if !meta.private && meta.player_count < meta.max_players {
                    rooms.push(RoomSummary {
                        id: meta.id,
                        player_count: meta.player_count,
                        max_players: meta.max_players,
                        created_ms: meta.created_ms,
                    });
                }
            }
        }
        rooms
    }

    /// Deletes empty rooms older than `threshold`. Returns how many were
    /// removed. Only ever touches rooms with zero members, so it cannot
    /// race a live session.
    pub async fn sweep_stale(&mut self, threshold: Duration) -> usize {
        let mut stale = Vec::new();
        for (room_id, handle) in &self.rooms {
            match handle.meta().await {
                Ok(meta) if meta.player_count == 0 && meta.age > threshold => {
                    stale.push(room_id.clone());
                }
                Ok(_) => {}
                // Actor gone — collect it too.
                Err(_) => stale.push(room_id.clone()),
            }
        }

        for room_id in &stale {
            if let Some(handle) = self.rooms.remove(room_id) {
                let _ = handle.shutdown().await;
                tracing::info!(%room_id, "stale room swept");
            }
        }
        stale.len()
    }

    /// The room a connection is seated in, if any.
    pub fn room_of(&self, conn_id: ConnectionId) -> Option<&RoomId> {
        self.memberships.get(&conn_id)
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

// =========================================================================
// Tests
// =========================================================================
