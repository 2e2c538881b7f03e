//! The seated-player record.

use std::time::Instant;

use noxo_engine::Symbol;
use noxo_protocol::PlayerInfo;
use noxo_transport::ConnectionId;

/// One seated player. Owned exclusively by its room while a member and
/// dropped on leave or disconnect.
#[derive(Debug, Clone)]
pub struct Player {
    /// Transport-level identity — the only identity the server vouches for.
    pub conn_id: ConnectionId,
    /// Opaque id from the identity provider, passed through to rosters.
    pub external_id: String,
    /// Display name, validated (trimmed, length-capped) at the session edge.
    pub name: String,
    pub avatar: Option<String>,
    pub symbol: Symbol,
    /// UI feedback flag only — games start automatically at two players.
    pub ready: bool,
    /// When this player took their seat.
    pub joined: Instant,
}

impl Player {
    pub fn new(
        conn_id: ConnectionId,
        external_id: String,
        name: String,
        avatar: Option<String>,
        symbol: Symbol,
    ) -> Self {
        Self {
            conn_id,
            external_id,
            name,
            avatar,
            symbol,
            ready: false,
            joined: Instant::now(),
        }
    }

    /// The wire-facing roster record.
    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.conn_id.into_inner(),
            external_id: self.external_id.clone(),
            name: self.name.clone(),
            avatar: self.avatar.clone(),
            symbol: self.symbol,
            ready: self.ready,
        }
    }
}
