//! Room and registry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for rooms and the registry.
///
/// Supplied once at server construction and read-only afterwards. The
/// defaults match the reference deployment; tests shrink the durations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Seats per room. Tic-tac-toe is strictly two.
    pub max_players: usize,

    /// How long an active game may sit idle before it is forced back to
    /// waiting. Armed when the second player is seated; cancelled when
    /// the game finishes or is reset.
    pub idle_timeout: Duration,

    /// How often the registry sweeps for stale empty rooms.
    pub sweep_interval: Duration,

    /// Age past which an empty room is deleted by the sweep. Normally
    /// redundant — rooms are removed eagerly when the last player leaves.
    pub sweep_threshold: Duration,

    /// Maximum display-name length (characters, after trimming).
    pub max_name_len: usize,

    /// Maximum room-id length (characters).
    pub max_room_id_len: usize,

    /// Maximum chat-message length (characters, after trimming).
    pub max_chat_len: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 2,
            idle_timeout: Duration::from_secs(10 * 60),
            sweep_interval: Duration::from_secs(30 * 60),
            sweep_threshold: Duration::from_secs(30 * 60),
            max_name_len: 20,
            max_room_id_len: 10,
            max_chat_len: 100,
        }
    }
}
