//! Error types for the room layer.

use noxo_engine::MoveError;
use noxo_protocol::RoomId;

/// Errors that can occur during room operations.
///
/// Every one of these is answered to the requesting connection only and
/// leaves room state untouched.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// Both seats are taken.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The requested mark is already claimed by a seated player.
    #[error("symbol already taken in room {0}")]
    SymbolTaken(RoomId),

    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The connection is not a member of the room it addressed.
    #[error("not a member of room {0}")]
    NotAMember(RoomId),

    /// The room's command channel is closed — the actor is gone.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),

    /// The engine rejected a move.
    #[error(transparent)]
    Move(#[from] MoveError),
}
